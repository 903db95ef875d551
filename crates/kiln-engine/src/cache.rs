//! Dev-server response cache keyed by `method|url`.

use crate::config::CacheStrategy;
use crate::http::Response;
use dashmap::DashMap;

/// In-memory response cache. Never persisted; dropped with the server.
///
/// Writes are last-writer-wins: an entry is only ever produced by a
/// successful resolution of its key, so concurrent writers store equivalent
/// responses.
#[derive(Debug, Default)]
pub struct ResponseCache {
    strategy: CacheStrategy,
    entries: DashMap<String, Response>,
}

impl ResponseCache {
    pub fn new(strategy: CacheStrategy) -> Self {
        Self {
            strategy,
            entries: DashMap::new(),
        }
    }

    pub fn strategy(&self) -> CacheStrategy {
        self.strategy
    }

    /// Cached response for `key`, if lookups are enabled.
    pub fn get(&self, key: &str) -> Option<Response> {
        match self.strategy {
            CacheStrategy::Disabled => None,
            CacheStrategy::InMemory => self.entries.get(key).map(|entry| entry.value().clone()),
        }
    }

    /// Record a successful response.
    pub fn put(&self, key: String, response: Response) {
        self.entries.insert(key, response);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry, e.g. after the host saw a file change.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
