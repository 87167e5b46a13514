//! Selector-driven item extraction.
//!
//! A fetched page is either HTML or JSON, decided by its content type. Both
//! variants share one contract: produce at most `limit` complete items in
//! document order, plus the reference to the next page when the source
//! paginates and the limit has not been reached.
//!
//! ```text
//! Page → ContentKind → html::extract | json::extract → Extraction
//! ```

pub mod html;
pub mod json;
pub mod json_path;

use crate::app::Result;
use crate::config::Source;
use crate::domain::Item;
use crate::resolver::resolve;

/// Page formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Json,
}

impl ContentKind {
    /// Classify a `Content-Type` header value, ignoring its parameters.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "text/html" | "application/xhtml+xml" => Some(Self::Html),
            "application/json" => Some(Self::Json),
            m if m.starts_with("application/") && m.ends_with("+json") => Some(Self::Json),
            _ => None,
        }
    }
}

/// Items found on one page and where to go next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub items: Vec<Item>,
    /// Unresolved next-page reference as found on the page.
    pub next_page: Option<String>,
}

/// Extract up to `limit` items from `body`, fetched from `page_url`.
pub fn extract(
    kind: ContentKind,
    page_url: &str,
    body: &str,
    source: &Source,
    limit: usize,
) -> Result<Extraction> {
    match kind {
        ContentKind::Html => html::extract(page_url, body, source, limit),
        ContentKind::Json => json::extract(page_url, body, source, limit),
    }
}

/// Build an item from raw field values, keeping it only when complete.
fn build_item(page_url: &str, title: String, link: &str, description: String) -> Option<Item> {
    let link = if link.is_empty() {
        String::new()
    } else {
        resolve(page_url, link)
    };

    let item = Item::new(title, link).with_description(description);
    item.is_complete().then_some(item)
}
