use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{build_item, Extraction};
use crate::app::{Result, RssliteError};
use crate::config::Source;

/// Extract items from an HTML page using CSS selectors.
///
/// For each node matching the item selector, the first descendant matching
/// each field selector supplies the field: text for title and description,
/// the `href` attribute for the link. The next-page regex runs against the
/// re-serialized document and its first capture group is the reference.
pub fn extract(page_url: &str, body: &str, source: &Source, limit: usize) -> Result<Extraction> {
    let document = Html::parse_document(body);

    let item_selector = parse_selector(&source.item_selector)?;
    let title_selector = optional_selector(&source.title_selector)?;
    let link_selector = optional_selector(&source.link_selector)?;
    let description_selector = optional_selector(&source.description_selector)?;

    let mut items = Vec::new();
    for node in document.select(&item_selector) {
        if items.len() >= limit {
            break;
        }

        let title = title_selector
            .as_ref()
            .and_then(|s| first_descendant(node, s))
            .map(text_of)
            .unwrap_or_default();

        let link = link_selector
            .as_ref()
            .and_then(|s| first_descendant(node, s))
            .and_then(|el| el.value().attr("href"))
            .unwrap_or_default();

        let description = description_selector
            .as_ref()
            .and_then(|s| first_descendant(node, s))
            .map(text_of)
            .unwrap_or_default();

        if let Some(item) = build_item(page_url, title, link, description) {
            items.push(item);
        }
    }

    let next_page = if items.len() < limit && source.has_pagination() {
        next_page_reference(&document, &source.next_page_match)?
    } else {
        None
    };

    Ok(Extraction { items, next_page })
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| RssliteError::Extract(format!("invalid selector '{}': {}", selector, e)))
}

fn optional_selector(selector: &str) -> Result<Option<Selector>> {
    if selector.is_empty() {
        Ok(None)
    } else {
        parse_selector(selector).map(Some)
    }
}

/// First match strictly below `node`; the node itself never counts.
fn first_descendant<'a>(node: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    node.select(selector).find(|el| el.id() != node.id())
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn next_page_reference(document: &Html, pattern: &str) -> Result<Option<String>> {
    let regex = Regex::new(pattern).map_err(|e| {
        RssliteError::Extract(format!("invalid next page pattern '{}': {}", pattern, e))
    })?;

    let markup = document.html();
    Ok(regex
        .captures(&markup)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|reference| !reference.is_empty()))
}
