use std::sync::Arc;

use crate::app::Result;
use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::gateway::RenderGateway;
use crate::refresh::Coordinator;
use crate::store::FeedStore;

/// Wires the store, coordinator and gateway around one shared feed table.
pub struct AppContext {
    pub config: Arc<Config>,
    pub store: Arc<FeedStore>,
    pub coordinator: Arc<Coordinator>,
    pub gateway: Arc<RenderGateway>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::from_config(&config)?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Build the context around `fetcher`, seeding the table from the cache.
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher>) -> Self {
        let config = Arc::new(config);
        let store = Arc::new(FeedStore::load(&config.cache_path));
        let coordinator = Arc::new(Coordinator::new(config.clone(), store.clone(), fetcher));
        let gateway = Arc::new(RenderGateway::new(store.clone()));

        Self {
            config,
            store,
            coordinator,
            gateway,
        }
    }
}
