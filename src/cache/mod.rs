//! Process-wide cache of remote cluster connections
//!
//! Keyed by the local namespace of a RemoteCluster. The RemoteCluster
//! controller is the only writer: it sets an entry after a successful
//! connection build and frees it while handling deletion. RemoteObject
//! reconciles for the same namespace only read.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::client::{DiscoveryClient, RemoteClient, RemoteConnection};

/// Keyed store of remote connections
pub trait ConnectionCache: Send + Sync {
    /// Store a connection, replacing any previous entry for `id`.
    fn set(
        &self,
        id: &str,
        host: String,
        client: Arc<dyn RemoteClient>,
        discovery: Arc<dyn DiscoveryClient>,
    );

    fn get(&self, id: &str) -> Option<RemoteConnection>;

    /// Drop the entry for `id`; no-op if absent.
    fn free(&self, id: &str);
}

/// [`ConnectionCache`] backed by a map behind a single reader/writer lock
#[derive(Default)]
pub struct InMemoryConnectionCache {
    entries: RwLock<HashMap<String, RemoteConnection>>,
}

impl InMemoryConnectionCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConnectionCache for InMemoryConnectionCache {
    fn set(
        &self,
        id: &str,
        host: String,
        client: Arc<dyn RemoteClient>,
        discovery: Arc<dyn DiscoveryClient>,
    ) {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id.to_string(),
                RemoteConnection {
                    host,
                    client,
                    discovery,
                },
            );
    }

    fn get(&self, id: &str) -> Option<RemoteConnection> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn free(&self, id: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockDiscoveryClient, MockRemoteClient};

    fn set(cache: &InMemoryConnectionCache, id: &str, host: &str) {
        cache.set(
            id,
            host.to_string(),
            Arc::new(MockRemoteClient::new()),
            Arc::new(MockDiscoveryClient::new()),
        );
    }

    #[test]
    fn get_returns_shared_clients() {
        let cache = InMemoryConnectionCache::new();
        set(&cache, "cluster-east", "https://east:6443");

        let first = cache.get("cluster-east").unwrap();
        let second = cache.get("cluster-east").unwrap();
        assert_eq!(first.host, "https://east:6443");
        assert!(Arc::ptr_eq(&first.client, &second.client));
    }

    #[test]
    fn free_removes_only_the_given_entry() {
        let cache = InMemoryConnectionCache::new();
        set(&cache, "cluster-east", "https://east:6443");
        set(&cache, "cluster-west", "https://west:6443");

        cache.free("cluster-east");
        cache.free("cluster-missing");

        assert!(cache.get("cluster-east").is_none());
        assert_eq!(cache.get("cluster-west").unwrap().host, "https://west:6443");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let cache = InMemoryConnectionCache::new();
        set(&cache, "cluster-east", "https://east:6443");

        let poisoner = cache.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(cache.entries.is_poisoned());
        assert!(cache.get("cluster-east").is_some());
        cache.free("cluster-east");
        assert!(cache.is_empty());
    }
}
