//! Feed rendering with single-flight request coalescing.
//!
//! Concurrent requests for the same slug share one render: the first caller
//! starts it and later callers await the same shared future. The entry is
//! dropped once the render completes, so later requests see fresh state, or
//! once every waiting caller has gone away.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::app::{Result, RssliteError};
use crate::store::FeedStore;

/// Rendered feed bytes, or `None` for an unknown slug.
pub type Rendered = Option<Arc<Vec<u8>>>;

type Flight = Shared<BoxFuture<'static, std::result::Result<Rendered, String>>>;

struct Entry {
    flight: Flight,
    /// Callers currently awaiting `flight`.
    waiters: usize,
}

pub struct RenderGateway {
    store: Arc<FeedStore>,
    in_flight: Mutex<HashMap<String, Entry>>,
    renders: AtomicU64,
}

impl RenderGateway {
    pub fn new(store: Arc<FeedStore>) -> Self {
        Self {
            store,
            in_flight: Mutex::new(HashMap::new()),
            renders: AtomicU64::new(0),
        }
    }

    /// Render `slug` as RSS, joining an identical render already in flight.
    pub async fn render(&self, slug: &str) -> Result<Rendered> {
        let flight = {
            let mut in_flight = self.lock();
            match in_flight.get_mut(slug) {
                Some(entry) => {
                    entry.waiters += 1;
                    entry.flight.clone()
                }
                None => {
                    let flight = self.start(slug);
                    in_flight.insert(
                        slug.to_string(),
                        Entry {
                            flight: flight.clone(),
                            waiters: 1,
                        },
                    );
                    flight
                }
            }
        };

        let mut landing = Landing {
            gateway: self,
            slug,
            flight: flight.clone(),
            landed: false,
        };

        let rendered = flight.await;
        landing.landed = true;
        rendered.map_err(RssliteError::Render)
    }

    /// Renders actually performed, as opposed to requests served.
    pub fn renders_started(&self) -> u64 {
        self.renders.load(Ordering::Relaxed)
    }

    fn start(&self, slug: &str) -> Flight {
        self.renders.fetch_add(1, Ordering::Relaxed);

        let store = self.store.clone();
        let slug = slug.to_string();
        async move {
            match tokio::task::spawn_blocking(move || store.render_slug(&slug)).await {
                Ok(Ok(rendered)) => Ok(rendered.map(Arc::new)),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(format!("render task failed: {}", e)),
            }
        }
        .boxed()
        .shared()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases one caller's hold on a flight. The entry is removed when the
/// flight has resolved or its last waiter is cancelled, unless it was
/// already replaced by a newer one.
struct Landing<'a> {
    gateway: &'a RenderGateway,
    slug: &'a str,
    flight: Flight,
    landed: bool,
}

impl Drop for Landing<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.gateway.lock();
        let Some(entry) = in_flight.get_mut(self.slug) else {
            return;
        };
        if !entry.flight.ptr_eq(&self.flight) {
            return;
        }

        entry.waiters = entry.waiters.saturating_sub(1);
        if self.landed || entry.waiters == 0 {
            in_flight.remove(self.slug);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Item;
    use futures::future::join_all;

    fn store() -> Arc<FeedStore> {
        let store = Arc::new(FeedStore::new("unused.json"));
        store.ensure_feed("news", "News", "https://news.example.com/");
        store.ensure_feed("blog", "Blog", "https://blog.example.com/");
        store
            .replace_items("news", vec![Item::new("Old", "https://news.example.com/old")])
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_render_known_and_unknown_slugs() {
        let gateway = RenderGateway::new(store());

        let bytes = gateway.render("news").await.unwrap().unwrap();
        let channel = rss::Channel::read_from(bytes.as_slice()).unwrap();
        assert_eq!(channel.title(), "News");
        assert_eq!(channel.items().len(), 1);

        assert!(gateway.render("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sequential_renders_see_new_state() {
        let store = store();
        let gateway = RenderGateway::new(store.clone());

        let before = gateway.render("news").await.unwrap().unwrap();
        store
            .replace_items("news", vec![Item::new("New", "https://news.example.com/new")])
            .unwrap();
        let after = gateway.render("news").await.unwrap().unwrap();

        assert_ne!(before, after);
        assert_eq!(gateway.renders_started(), 2);
        assert!(gateway.lock().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_renders_are_coalesced_and_consistent() {
        let store = store();
        let gateway = RenderGateway::new(store.clone());

        // Hold the table as a refresh would, so the render cannot finish.
        let mut table = store.hold_write();

        let mut news: Vec<_> = (0..4).map(|_| Box::pin(gateway.render("news"))).collect();
        let mut blog = Box::pin(gateway.render("blog"));
        for render in &mut news {
            assert!(futures::poll!(render.as_mut()).is_pending());
        }
        assert!(futures::poll!(blog.as_mut()).is_pending());
        assert_eq!(gateway.renders_started(), 2);

        table.get_mut("news").unwrap().items =
            vec![Item::new("New", "https://news.example.com/new")];
        drop(table);

        let results: Vec<_> = join_all(news).await.into_iter().map(|r| r.unwrap()).collect();
        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));

        let channel = rss::Channel::read_from(results[0].as_ref().unwrap().as_slice()).unwrap();
        let titles: Vec<_> = channel.items().iter().filter_map(|i| i.title()).collect();
        assert_eq!(titles, ["New"]);

        assert!(blog.await.unwrap().is_some());
        assert_eq!(gateway.renders_started(), 2);
        assert!(gateway.lock().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_caller_does_not_leave_stale_entry() {
        let store = store();
        let gateway = RenderGateway::new(store.clone());

        let table = store.hold_write();
        let mut first = tokio_test::task::spawn(gateway.render("news"));
        tokio_test::assert_pending!(first.poll());
        drop(first);
        assert!(gateway.lock().is_empty());
        drop(table);

        assert!(gateway.render("news").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_does_not_split_flight() {
        let store = store();
        let gateway = RenderGateway::new(store.clone());

        let table = store.hold_write();
        let mut first = Box::pin(gateway.render("news"));
        let mut second = Box::pin(gateway.render("news"));
        assert!(futures::poll!(first.as_mut()).is_pending());
        assert!(futures::poll!(second.as_mut()).is_pending());
        drop(second);

        let mut third = Box::pin(gateway.render("news"));
        assert!(futures::poll!(third.as_mut()).is_pending());
        assert_eq!(gateway.renders_started(), 1);
        drop(table);

        let third = third.await.unwrap().unwrap();
        assert_eq!(first.await.unwrap().unwrap(), third);
        assert_eq!(gateway.renders_started(), 1);
        assert!(gateway.lock().is_empty());
    }
}
