//! Concurrent embedding cache.
//!
//! Keyed by `(entity_id, content_hash)`: when an entity's canonical text
//! changes, its key changes and the stale vector simply ages out. The cache
//! is the engine's only shared mutable state; a cache-miss race recomputes
//! the same vector twice with last-writer-wins, which is wasteful but never
//! incorrect.

use std::sync::Arc;

use moka::sync::Cache;
use sha2::{Digest, Sha256};

pub type ContentHash = [u8; 32];

/// SHA-256 of the canonical text that produced (or will produce) a vector.
pub fn content_hash(text: &str) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.finalize().into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub entity_id: i64,
    pub content_hash: ContentHash,
}

impl CacheKey {
    pub fn new(entity_id: i64, text: &str) -> Self {
        Self {
            entity_id,
            content_hash: content_hash(text),
        }
    }
}

/// LRU cache of embedding vectors shared across requests.
pub struct EmbeddingCache {
    entries: Cache<CacheKey, Arc<Vec<f32>>>,
}

impl EmbeddingCache {
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(capacity).build(),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Vec<f32>>> {
        self.entries.get(key)
    }

    pub fn insert(&self, key: CacheKey, vector: Arc<Vec<f32>>) {
        self.entries.insert(key, vector);
    }

    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_tracks_text() {
        let a = content_hash("Requires skills: python.");
        let b = content_hash("Requires skills: python.");
        let c = content_hash("Requires skills: python, sql.");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn round_trips_vectors() {
        let cache = EmbeddingCache::with_capacity(16);
        let key = CacheKey::new(42, "some text");
        assert!(cache.get(&key).is_none());

        cache.insert(key, Arc::new(vec![0.1, 0.2]));
        let hit = cache.get(&key).expect("inserted entry");
        assert_eq!(hit.as_slice(), &[0.1, 0.2]);
    }

    #[test]
    fn changed_text_misses_under_same_entity_id() {
        let cache = EmbeddingCache::with_capacity(16);
        cache.insert(CacheKey::new(42, "before"), Arc::new(vec![1.0]));
        assert!(cache.get(&CacheKey::new(42, "after")).is_none());
    }

    #[test]
    fn same_text_different_entities_do_not_collide() {
        let cache = EmbeddingCache::with_capacity(16);
        cache.insert(CacheKey::new(1, "text"), Arc::new(vec![1.0]));
        assert!(cache.get(&CacheKey::new(2, "text")).is_none());
    }
}
