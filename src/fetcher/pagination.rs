use std::collections::HashSet;

use tracing::{debug, warn};

use crate::app::{Result, RssliteError};
use crate::config::{EmptyPolicy, FetchLimits, Source};
use crate::domain::Item;
use crate::extractor::{extract, ContentKind};
use crate::fetcher::Fetcher;
use crate::resolver::resolve;

/// Fetch a source and follow its pagination chain.
///
/// Pages are fetched until `limits.max_items` items are collected, a page
/// has no next-page reference, `limits.max_pages` pages were fetched, or the
/// next reference points back to a page already visited in this cycle. Any
/// failing page aborts the whole cycle.
pub async fn fetch_items(
    fetcher: &dyn Fetcher,
    source: &Source,
    limits: FetchLimits,
) -> Result<Vec<Item>> {
    let mut items: Vec<Item> = Vec::new();
    let mut visited = HashSet::new();
    let mut target = source.url.clone();

    loop {
        visited.insert(target.clone());

        let page = fetcher.fetch(&target).await?;
        if page.status != 200 {
            return Err(RssliteError::Status {
                url: target,
                status: page.status,
            });
        }

        let kind = ContentKind::from_content_type(&page.content_type).ok_or_else(|| {
            RssliteError::UnsupportedContentType {
                url: target.clone(),
                content_type: page.content_type.clone(),
            }
        })?;

        let remaining = limits.max_items.saturating_sub(items.len());
        let extraction = extract(kind, &target, &page.body, source, remaining)?;
        debug!(
            slug = %source.slug,
            url = %target,
            found = extraction.items.len(),
            "Extracted page"
        );
        items.extend(extraction.items);

        let Some(reference) = extraction.next_page else {
            break;
        };

        let next = resolve(&target, &reference);
        if visited.contains(&next) {
            warn!(slug = %source.slug, url = %next, "Pagination loops back, stopping");
            break;
        }
        if visited.len() >= limits.max_pages {
            warn!(
                slug = %source.slug,
                pages = visited.len(),
                "Page limit reached, stopping"
            );
            break;
        }
        target = next;
    }

    if items.is_empty() && limits.empty_policy == EmptyPolicy::Reject {
        return Err(RssliteError::NoItems(source.slug.clone()));
    }

    Ok(items)
}
