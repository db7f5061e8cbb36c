use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::notify::{Notifier, mailer::Mailer};
use crate::store::Store;
use crate::workflow::{CatalogCache, Workflow};

/// Shared application data handed to every handler.
pub struct AppState<S> {
    pub store: S,
    pub catalog: CatalogCache,
    pub notifier: Notifier,
    pub config: Config,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            catalog: CatalogCache::new(Duration::from_secs(config.catalog_cache_ttl_secs)),
            notifier: Notifier::new(mailer, config.api_prefix.clone()),
            config,
        }
    }

    pub fn workflow(&self) -> Workflow<'_, S> {
        Workflow::new(&self.store, &self.catalog, &self.notifier)
    }
}
