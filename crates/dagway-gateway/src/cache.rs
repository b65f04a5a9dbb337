use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

/// A materialized response kept for repeat requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    pub status: u16,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub body: Bytes,
}

impl CacheEntry {
    /// A 200 entry for a fully read file.
    pub fn ok(body: Bytes, content_type: Option<String>, etag: Option<String>) -> Self {
        Self {
            status: 200,
            content_type,
            etag,
            body,
        }
    }
}

/// Key-value store behind the cache layer, scoped to one generation.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Name of the generation this store serves.
    fn generation(&self) -> &str;

    async fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Insert or overwrite. Concurrent writers to one key: last write wins.
    async fn put(&self, key: String, entry: CacheEntry);

    async fn len(&self) -> usize;

    async fn clear(&self);
}

/// `HashMap`-backed response cache.
#[derive(Debug)]
pub struct InMemoryResponseCache {
    generation: String,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryResponseCache {
    pub fn new(generation: impl Into<String>) -> Self {
        Self {
            generation: generation.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    fn generation(&self) -> &str {
        &self.generation
    }

    async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().expect("lock poisoned").get(key).cloned()
    }

    async fn put(&self, key: String, entry: CacheEntry) {
        self.entries.write().expect("lock poisoned").insert(key, entry);
    }

    async fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    async fn clear(&self) {
        self.entries.write().expect("lock poisoned").clear();
    }
}

/// Request-path keyed response cache consulted before resolution.
///
/// Keys are exact request paths. Every path starts with an immutable content
/// identifier, so an entry can never go stale within a generation; there is
/// no eviction.
#[derive(Clone)]
pub struct CacheLayer {
    store: Arc<dyn ResponseCache>,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn ResponseCache>) -> Self {
        Self { store }
    }

    /// A layer over a fresh in-memory store.
    pub fn in_memory(generation: impl Into<String>) -> Self {
        Self::new(Arc::new(InMemoryResponseCache::new(generation)))
    }

    pub fn generation(&self) -> &str {
        self.store.generation()
    }

    pub async fn lookup(&self, key: &str) -> Option<CacheEntry> {
        self.store.get(key).await
    }

    pub async fn store(&self, key: impl Into<String>, entry: CacheEntry) {
        self.store.put(key.into(), entry).await;
    }

    pub async fn len(&self) -> usize {
        self.store.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every entry of the current generation.
    pub async fn clear(&self) {
        self.store.clear().await;
    }
}

impl std::fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer")
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(body: &'static str) -> CacheEntry {
        CacheEntry::ok(Bytes::from_static(body.as_bytes()), Some("text/plain".into()), None)
    }

    #[tokio::test]
    async fn store_then_lookup() {
        let cache = CacheLayer::in_memory("test-v1");
        cache.store("/ipfs/fabc/a.txt", entry("a")).await;
        assert_eq!(cache.lookup("/ipfs/fabc/a.txt").await, Some(entry("a")));
    }

    #[tokio::test]
    async fn lookup_unknown_is_absent() {
        let cache = CacheLayer::in_memory("test-v1");
        assert!(cache.lookup("/ipfs/fabc/missing").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn keys_are_exact() {
        let cache = CacheLayer::in_memory("test-v1");
        cache.store("/ipfs/fabc/a.txt", entry("a")).await;
        assert!(cache.lookup("/ipfs/fabc/a.txt/").await.is_none());
    }

    #[tokio::test]
    async fn last_write_wins() {
        let cache = CacheLayer::in_memory("test-v1");
        cache.store("k", entry("first")).await;
        cache.store("k", entry("second")).await;
        assert_eq!(cache.lookup("k").await.unwrap().body, "second");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn clear_and_generation() {
        let cache = CacheLayer::in_memory("site-v2");
        assert_eq!(cache.generation(), "site-v2");
        cache.store("k", entry("v")).await;
        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
