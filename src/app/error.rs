use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum RssliteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("{url} has unsupported content type: {content_type}")]
    UnsupportedContentType { url: String, content_type: String },

    #[error("Extraction error: {0}")]
    Extract(String),

    #[error("No items found for {0}")]
    NoItems(String),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RssliteError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(slug: &str) -> Result<()> {
        if slug.is_empty() {
            return Err(ConfigError::Invalid("empty slug".into()).into());
        }
        Ok(())
    }

    #[test]
    fn test_config_errors_convert_transparently() {
        let err = validate("").unwrap_err();
        assert!(matches!(err, RssliteError::Config(ConfigError::Invalid(_))));
        assert_eq!(err.to_string(), "Invalid configuration: empty slug");
        assert!(validate("news").is_ok());
    }

    #[test]
    fn test_status_error_names_url() {
        let err = RssliteError::Status {
            url: "https://a.com/list".into(),
            status: 503,
        };
        assert_eq!(err.to_string(), "https://a.com/list responded with status 503");
    }
}
