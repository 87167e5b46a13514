//! RSS 2.0 serialization of feeds.

use rss::{ChannelBuilder, GuidBuilder, ItemBuilder};

use crate::app::{Result, RssliteError};
use crate::domain::Feed;

pub const CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

/// Serialize `feed` as an RSS 2.0 document.
///
/// Output depends only on the feed's contents, so equal feeds always
/// render to identical bytes.
pub fn to_rss(feed: &Feed) -> Result<Vec<u8>> {
    let items: Vec<rss::Item> = feed
        .items
        .iter()
        .map(|item| {
            let guid = GuidBuilder::default()
                .value(item.link.clone())
                .permalink(true)
                .build();

            ItemBuilder::default()
                .title(item.title.clone())
                .link(item.link.clone())
                .description(item.description.clone())
                .guid(guid)
                .build()
        })
        .collect();

    let channel = ChannelBuilder::default()
        .title(feed.title.clone())
        .link(feed.link.clone())
        .description(feed.title.clone())
        .generator("rsslite".to_string())
        .items(items)
        .build();

    channel
        .write_to(Vec::new())
        .map_err(|e| RssliteError::Render(e.to_string()))
}
