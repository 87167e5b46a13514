//! Refresh cycles: fetch a source, publish its items, persist the table.
//!
//! ```text
//! scheduler tick → Coordinator::refresh → fetch_items → FeedStore::replace_items → persist
//! ```

pub mod scheduler;

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::app::RssliteError;
use crate::config::{Config, Source};
use crate::fetcher::{fetch_items, Fetcher};
use crate::store::FeedStore;

pub use scheduler::spawn_schedules;

/// Per-source health, exposed for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceStatus {
    pub slug: String,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    /// Items published by the last successful refresh.
    pub item_count: usize,
    pub consecutive_failures: u32,
    /// Snapshot writes that failed after a successful refresh.
    pub persist_failures: u64,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub enum RefreshOutcome {
    /// Items were replaced; `persisted` is false when the snapshot write failed.
    Updated { items: usize, persisted: bool },
    /// Fetching or extraction failed and the previous items stay in place.
    Failed(RssliteError),
    /// Another refresh of the same source was still running.
    Skipped,
}

pub struct Coordinator {
    config: Arc<Config>,
    store: Arc<FeedStore>,
    fetcher: Arc<dyn Fetcher>,
    in_flight: Mutex<HashSet<String>>,
    status: Mutex<BTreeMap<String, SourceStatus>>,
}

impl Coordinator {
    /// Build a coordinator and make sure every configured source has a feed
    /// in the store.
    pub fn new(config: Arc<Config>, store: Arc<FeedStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        let mut status = BTreeMap::new();
        for source in &config.sources {
            if store.ensure_feed(&source.slug, &source.name, &source.url) {
                debug!(slug = %source.slug, "Created empty feed");
            }
            status.insert(
                source.slug.clone(),
                SourceStatus {
                    slug: source.slug.clone(),
                    ..Default::default()
                },
            );
        }

        Self {
            config,
            store,
            fetcher,
            in_flight: Mutex::new(HashSet::new()),
            status: Mutex::new(status),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<FeedStore> {
        &self.store
    }

    /// Run one refresh cycle for `source`.
    ///
    /// Failures never touch the store, so the last good items keep being
    /// served. A failed snapshot write is recorded but the new items stay
    /// published.
    pub async fn refresh(&self, source: &Source) -> RefreshOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight, &source.slug) else {
            debug!(slug = %source.slug, "Refresh already running, skipping");
            return RefreshOutcome::Skipped;
        };

        let started = Utc::now();
        let limits = self.config.limits_for(source);

        let items = match fetch_items(self.fetcher.as_ref(), source, limits).await {
            Ok(items) => items,
            Err(e) => {
                error!(slug = %source.slug, name = %source.name, error = %e, "Refresh failed");
                self.record(&source.slug, |status| {
                    status.last_attempt_at = Some(started);
                    status.consecutive_failures += 1;
                    status.last_error = Some(e.to_string());
                });
                return RefreshOutcome::Failed(e);
            }
        };

        let count = items.len();
        if let Err(e) = self.store.replace_items(&source.slug, items) {
            error!(slug = %source.slug, error = %e, "Refresh failed");
            self.record(&source.slug, |status| {
                status.last_attempt_at = Some(started);
                status.consecutive_failures += 1;
                status.last_error = Some(e.to_string());
            });
            return RefreshOutcome::Failed(e);
        }

        let persist_error = self.store.persist().await.err();
        if let Some(ref e) = persist_error {
            error!(
                slug = %source.slug,
                path = %self.store.cache_path().display(),
                error = %e,
                "Failed to persist feed cache"
            );
        }

        let elapsed = Utc::now().signed_duration_since(started);
        info!(
            slug = %source.slug,
            items = count,
            elapsed_ms = elapsed.num_milliseconds(),
            "Refreshed feed"
        );

        self.record(&source.slug, |status| {
            status.last_attempt_at = Some(started);
            status.last_success_at = Some(started);
            status.item_count = count;
            status.consecutive_failures = 0;
            match &persist_error {
                Some(e) => {
                    status.persist_failures += 1;
                    status.last_error = Some(format!("persist: {}", e));
                }
                None => status.last_error = None,
            }
        });

        RefreshOutcome::Updated {
            items: count,
            persisted: persist_error.is_none(),
        }
    }

    /// Refresh the configured source named `slug`.
    pub async fn refresh_slug(&self, slug: &str) -> Option<RefreshOutcome> {
        let source = self.config.source(slug)?.clone();
        Some(self.refresh(&source).await)
    }

    pub fn status(&self) -> Vec<SourceStatus> {
        self.lock_status().values().cloned().collect()
    }

    fn record(&self, slug: &str, update: impl FnOnce(&mut SourceStatus)) {
        let mut statuses = self.lock_status();
        let status = statuses
            .entry(slug.to_string())
            .or_insert_with(|| SourceStatus {
                slug: slug.to_string(),
                ..Default::default()
            });
        update(status);
    }

    fn lock_status(&self) -> MutexGuard<'_, BTreeMap<String, SourceStatus>> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks a slug as refreshing until dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    slug: String,
}

impl<'a> InFlight<'a> {
    fn acquire(set: &'a Mutex<HashSet<String>>, slug: &str) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slug.to_string());

        inserted.then(|| Self {
            set,
            slug: slug.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.slug);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::tests::source;
    use crate::fetcher::stub::StubFetcher;

    const HTML: &str = "text/html";

    fn page(titles: &[&str]) -> String {
        titles
            .iter()
            .map(|t| format!(r#"<li><a href="https://example.com/{0}">{0}</a></li>"#, t))
            .collect()
    }

    fn sources() -> Vec<Source> {
        ["x", "y"]
            .iter()
            .map(|slug| {
                let mut source = source("li", "a", "a", "");
                source.slug = slug.to_string();
                source.name = slug.to_uppercase();
                source.url = format!("https://{}.example.com/", slug);
                source
            })
            .collect()
    }

    fn setup(cache: &std::path::Path) -> (Coordinator, Arc<StubFetcher>) {
        let config = Config {
            sources: sources(),
            cache_path: cache.to_path_buf(),
            ..Default::default()
        };
        let fetcher = Arc::new(StubFetcher::new());
        let store = Arc::new(FeedStore::new(cache));
        let coordinator = Coordinator::new(Arc::new(config), store, fetcher.clone());
        (coordinator, fetcher)
    }

    fn titles(coordinator: &Coordinator, slug: &str) -> Vec<String> {
        coordinator
            .store()
            .feed(slug)
            .unwrap()
            .items
            .into_iter()
            .map(|item| item.title)
            .collect()
    }

    #[tokio::test]
    async fn test_new_creates_feed_shells() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, _) = setup(&dir.path().join("cache.json"));

        let feed = coordinator.store().feed("x").unwrap();
        assert_eq!(feed.title, "X");
        assert_eq!(feed.link, "https://x.example.com/");
        assert!(feed.items.is_empty());
        assert_eq!(coordinator.status().len(), 2);
    }

    #[tokio::test]
    async fn test_successful_refresh_publishes_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache.json");
        let (coordinator, fetcher) = setup(&cache);
        fetcher.set_page("https://x.example.com/", HTML, &page(&["a", "b"]));

        let outcome = coordinator.refresh_slug("x").await.unwrap();
        assert!(matches!(outcome, RefreshOutcome::Updated { items: 2, persisted: true }));
        assert_eq!(titles(&coordinator, "x"), ["a", "b"]);

        let on_disk = FeedStore::load(&cache);
        assert_eq!(on_disk.feed("x"), coordinator.store().feed("x"));

        let status = &coordinator.status()[0];
        assert_eq!(status.slug, "x");
        assert_eq!(status.item_count, 2);
        assert!(status.last_success_at.is_some());
        assert_eq!(status.last_error, None);
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, fetcher) = setup(&dir.path().join("cache.json"));
        fetcher.set_page("https://x.example.com/", HTML, &page(&["a", "b"]));

        coordinator.refresh_slug("x").await.unwrap();
        let first = coordinator.store().feed("x").unwrap().items;
        coordinator.refresh_slug("x").await.unwrap();
        let second = coordinator.store().feed("x").unwrap().items;

        assert_eq!(first, second);
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_items_and_isolates_sources() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, fetcher) = setup(&dir.path().join("cache.json"));
        fetcher.set_page("https://x.example.com/", HTML, &page(&["old"]));
        fetcher.set_page("https://y.example.com/", HTML, &page(&["why"]));
        coordinator.refresh_slug("x").await.unwrap();
        coordinator.refresh_slug("y").await.unwrap();

        fetcher.set_unreachable("https://x.example.com/");
        let outcome = coordinator.refresh_slug("x").await.unwrap();

        assert!(matches!(outcome, RefreshOutcome::Failed(_)));
        assert_eq!(titles(&coordinator, "x"), ["old"]);
        assert_eq!(titles(&coordinator, "y"), ["why"]);

        let status = coordinator.status();
        assert_eq!(status[0].consecutive_failures, 1);
        assert_eq!(status[0].item_count, 1);
        assert!(status[0].last_error.as_deref().unwrap().contains("connection refused"));
        assert_eq!(status[1].consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_empty_result_rejected_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, fetcher) = setup(&dir.path().join("cache.json"));
        fetcher.set_page("https://x.example.com/", HTML, &page(&["a"]));
        coordinator.refresh_slug("x").await.unwrap();

        fetcher.set_page("https://x.example.com/", HTML, "<p>nothing here</p>");
        let outcome = coordinator.refresh_slug("x").await.unwrap();

        assert!(matches!(outcome, RefreshOutcome::Failed(RssliteError::NoItems(_))));
        assert_eq!(titles(&coordinator, "x"), ["a"]);
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_new_items() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();
        let (coordinator, fetcher) = setup(&blocker.join("cache.json"));
        fetcher.set_page("https://x.example.com/", HTML, &page(&["a"]));

        let outcome = coordinator.refresh_slug("x").await.unwrap();

        assert!(matches!(outcome, RefreshOutcome::Updated { items: 1, persisted: false }));
        assert_eq!(titles(&coordinator, "x"), ["a"]);
        let status = &coordinator.status()[0];
        assert_eq!(status.persist_failures, 1);
        assert_eq!(status.consecutive_failures, 0);
        assert!(status.last_error.as_deref().unwrap().starts_with("persist:"));
    }

    #[tokio::test]
    async fn test_overlapping_refresh_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, _) = setup(&dir.path().join("cache.json"));
        let source = coordinator.config().source("x").unwrap().clone();

        let held = InFlight::acquire(&coordinator.in_flight, "x");
        assert!(held.is_some());
        assert!(matches!(coordinator.refresh(&source).await, RefreshOutcome::Skipped));

        drop(held);
        assert!(matches!(coordinator.refresh(&source).await, RefreshOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_unknown_slug() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, _) = setup(&dir.path().join("cache.json"));
        assert!(coordinator.refresh_slug("ghost").await.is_none());
    }
}
