pub mod snapshot;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Mutex;

use crate::app::{Result, RssliteError};
use crate::domain::{Feed, Item};
use crate::render;

/// Slug to feed mapping, ordered so snapshots are stable.
pub type FeedTable = BTreeMap<String, Feed>;

/// The shared feed table and its on-disk snapshot.
///
/// Every read and write of the table goes through one reader/writer lock.
/// Item lists are swapped whole, so readers observe either the old or the
/// new list, never a mix.
pub struct FeedStore {
    feeds: RwLock<FeedTable>,
    cache_path: PathBuf,
    persist_lock: Mutex<()>,
}

impl FeedStore {
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self::with_table(cache_path, FeedTable::new())
    }

    /// Seed the table from the snapshot at `cache_path`, if any.
    pub fn load(cache_path: impl Into<PathBuf>) -> Self {
        let cache_path = cache_path.into();
        let table = snapshot::load(&cache_path);
        Self::with_table(cache_path, table)
    }

    fn with_table(cache_path: impl Into<PathBuf>, table: FeedTable) -> Self {
        Self {
            feeds: RwLock::new(table),
            cache_path: cache_path.into(),
            persist_lock: Mutex::new(()),
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Create an empty feed for `slug` unless one exists. Returns whether a
    /// feed was created.
    pub fn ensure_feed(&self, slug: &str, title: &str, link: &str) -> bool {
        let mut feeds = self.write();
        if feeds.contains_key(slug) {
            return false;
        }
        feeds.insert(slug.to_string(), Feed::new(title, link));
        true
    }

    /// Swap the item list of `slug`.
    pub fn replace_items(&self, slug: &str, items: Vec<Item>) -> Result<()> {
        let mut feeds = self.write();
        let feed = feeds
            .get_mut(slug)
            .ok_or_else(|| RssliteError::FeedNotFound(slug.to_string()))?;
        feed.items = items;
        Ok(())
    }

    pub fn feed(&self, slug: &str) -> Option<Feed> {
        self.read().get(slug).cloned()
    }

    pub fn slugs(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Render `slug` as RSS. Unknown slugs are `Ok(None)`.
    pub fn render_slug(&self, slug: &str) -> Result<Option<Vec<u8>>> {
        let feeds = self.read();
        feeds.get(slug).map(render::to_rss).transpose()
    }

    /// Write the whole table to the cache file.
    ///
    /// Persists are serialized, and each one snapshots the table only after
    /// acquiring its turn, so the file always ends up with the newest state.
    pub async fn persist(&self) -> Result<()> {
        let _turn = self.persist_lock.lock().await;

        let bytes = {
            let feeds = self.read();
            snapshot::encode(&feeds)?
        };
        let path = self.cache_path.clone();

        tokio::task::spawn_blocking(move || snapshot::write_atomic(&path, &bytes))
            .await
            .map_err(|e| RssliteError::Other(format!("persist task failed: {}", e)))?
    }

    /// Poisoning is ignored: writers only ever swap whole values, so the
    /// table is consistent even if a writer panicked.
    fn read(&self) -> RwLockReadGuard<'_, FeedTable> {
        self.feeds.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FeedTable> {
        self.feeds.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hold the table exclusively, as a writer mid-update would.
    #[cfg(test)]
    pub(crate) fn hold_write(&self) -> RwLockWriteGuard<'_, FeedTable> {
        self.write()
    }
}
