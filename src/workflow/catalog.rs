use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::model::leave_type::LeaveType;
use crate::store::{CatalogStore, StoreResult};

/// In-process cache of the active leave catalog.
///
/// Reconciliation reads the catalog on every dashboard load; writes to the
/// catalog must call [`CatalogCache::invalidate`].
pub struct CatalogCache {
    cache: Cache<(), Arc<Vec<LeaveType>>>,
}

impl CatalogCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    pub async fn active<S: CatalogStore>(&self, store: &S) -> StoreResult<Arc<Vec<LeaveType>>> {
        if let Some(types) = self.cache.get(&()).await {
            return Ok(types);
        }

        let types: Vec<LeaveType> = store
            .list_leave_types()
            .await?
            .into_iter()
            .filter(|t| t.is_active)
            .collect();
        debug!(count = types.len(), "Active leave catalog loaded");

        let types = Arc::new(types);
        self.cache.insert((), Arc::clone(&types)).await;
        Ok(types)
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }
}
