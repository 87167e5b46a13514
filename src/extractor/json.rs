use serde_json::Value;

use super::json_path::{lookup, text};
use super::{build_item, Extraction};
use crate::app::{Result, RssliteError};
use crate::config::Source;

/// Extract items from a JSON document using dotted paths.
///
/// The item path must select an array (or an object, whose values are used
/// in document order); field paths are evaluated relative to each element. The
/// next-page path is evaluated against the whole document.
pub fn extract(page_url: &str, body: &str, source: &Source, limit: usize) -> Result<Extraction> {
    let document: Value = serde_json::from_str(body)
        .map_err(|e| RssliteError::Extract(format!("malformed JSON from {}: {}", page_url, e)))?;

    let mut items = Vec::new();
    if let Some(selected) = lookup(&document, &source.item_selector) {
        let elements: Box<dyn Iterator<Item = &Value>> = match selected.as_ref() {
            Value::Array(elements) => Box::new(elements.iter()),
            Value::Object(map) => Box::new(map.values()),
            _ => Box::new(std::iter::empty()),
        };

        for element in elements {
            if items.len() >= limit {
                break;
            }

            let title = field(element, &source.title_selector);
            let link = field(element, &source.link_selector);
            let description = field(element, &source.description_selector);

            if let Some(item) = build_item(page_url, title, &link, description) {
                items.push(item);
            }
        }
    }

    let next_page = if items.len() < limit && source.has_pagination() {
        lookup(&document, &source.next_page_match)
            .map(|value| text(&value))
            .filter(|reference| !reference.is_empty())
    } else {
        None
    };

    Ok(Extraction { items, next_page })
}

fn field(element: &Value, path: &str) -> String {
    lookup(element, path)
        .map(|value| text(&value))
        .unwrap_or_default()
}
