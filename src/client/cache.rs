//! Client-side query cache for fetched task lists

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::domain::identity::IdentityId;
use crate::domain::task::Task;

#[derive(Debug, Clone)]
pub struct QueryCacheConfig {
    /// Maximum number of identities with a cached list
    pub max_capacity: u64,
    /// How long a fetched list may be served before it must be refetched
    pub time_to_live: Duration,
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 64,
            time_to_live: Duration::from_secs(300),
        }
    }
}

/// Last fetched task list per identity
///
/// Entries are keyed by identity so one user's list can never be served to
/// another; sign-out clears everything.
#[derive(Debug, Clone)]
pub struct QueryCache {
    lists: MokaCache<IdentityId, Arc<Vec<Task>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_config(QueryCacheConfig::default())
    }

    pub fn with_config(config: QueryCacheConfig) -> Self {
        Self {
            lists: MokaCache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(config.time_to_live)
                .build(),
        }
    }

    pub async fn get(&self, identity: &IdentityId) -> Option<Arc<Vec<Task>>> {
        self.lists.get(identity).await
    }

    pub async fn insert(&self, identity: &IdentityId, tasks: Vec<Task>) {
        self.lists.insert(identity.clone(), Arc::new(tasks)).await;
    }

    pub async fn invalidate(&self, identity: &IdentityId) {
        self.lists.invalidate(identity).await;
    }

    /// Drop every cached list
    pub fn clear(&self) {
        self.lists.invalidate_all();
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}
