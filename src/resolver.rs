//! Resolution of "next page" and item link references.
//!
//! The rules are intentionally simpler than RFC 3986 joining: a relative
//! reference is appended to the full base URL, and no `.`/`..` segment
//! normalization or percent-decoding takes place.

use url::Url;

/// Resolve `reference` against the page URL it was found on.
pub fn resolve(base: &str, reference: &str) -> String {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return reference.to_string();
    }

    if reference.starts_with("//") {
        return match Url::parse(base) {
            Ok(url) => format!("{}:{}", url.scheme(), reference),
            Err(_) => reference.to_string(),
        };
    }

    if reference.starts_with('/') {
        return match Url::parse(base).ok().and_then(|url| origin(&url)) {
            Some(origin) => format!("{}{}", origin, reference),
            None => reference.to_string(),
        };
    }

    if base.ends_with('/') {
        format!("{}{}", base, reference)
    } else {
        format!("{}/{}", base, reference)
    }
}

/// `scheme://host[:port]` of a parsed URL, or `None` for host-less URLs.
fn origin(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}
