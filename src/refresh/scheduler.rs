//! Periodic refresh triggers, one timer task per source.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use super::Coordinator;
use crate::config::{format_interval, Source};

/// Start one timer per configured source.
///
/// Each timer's first tick fires immediately, so every source is refreshed
/// once at startup. Refreshes are spawned rather than awaited so a slow
/// cycle does not shift its source's schedule; overlapping cycles of the
/// same source are skipped by the coordinator.
pub fn spawn_schedules(coordinator: Arc<Coordinator>) -> Vec<JoinHandle<()>> {
    coordinator
        .config()
        .sources
        .iter()
        .cloned()
        .map(|source| tokio::spawn(run_schedule(coordinator.clone(), source)))
        .collect()
}

async fn run_schedule(coordinator: Arc<Coordinator>, source: Source) {
    info!(
        slug = %source.slug,
        interval = %format_interval(source.interval),
        "Scheduled source"
    );

    let source = Arc::new(source);
    let mut timer = interval(source.interval());
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        timer.tick().await;

        let coordinator = coordinator.clone();
        let source = source.clone();
        tokio::spawn(async move {
            coordinator.refresh(&source).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::Config;
    use crate::extractor::tests::source;
    use crate::fetcher::stub::StubFetcher;
    use crate::store::FeedStore;

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_at_startup_and_every_interval() {
        let mut fast = source("li", "a", "a", "");
        fast.slug = "fast".into();
        fast.url = "https://fast.example.com/".into();
        fast.interval = 60;

        let mut slow = fast.clone();
        slow.slug = "slow".into();
        slow.url = "https://slow.example.com/".into();
        slow.interval = 3600;

        let config = Config {
            sources: vec![fast, slow],
            ..Default::default()
        };
        let fetcher = Arc::new(StubFetcher::new());
        let coordinator = Arc::new(Coordinator::new(
            Arc::new(config),
            Arc::new(FeedStore::new("unused.json")),
            fetcher.clone(),
        ));

        let handles = spawn_schedules(coordinator);
        tokio::time::sleep(Duration::from_secs(150)).await;

        let hits = fetcher.hits();
        let count = |url: &str| hits.iter().filter(|hit| *hit == url).count();
        assert_eq!(count("https://fast.example.com/"), 3);
        assert_eq!(count("https://slow.example.com/"), 1);

        for handle in handles {
            handle.abort();
        }
    }
}
