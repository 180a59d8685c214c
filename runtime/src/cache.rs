//! In-process implementation of [`QueryCache`].

use crate::metrics::CacheMetrics;
use kitroom_core::cache::{CacheKey, QueryCache};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Snapshot cache shared by every service of one session.
///
/// Cloning is cheap and clones share the same entries.
///
/// # Example
///
/// ```
/// use kitroom_core::cache::{CacheKey, QueryCache};
/// use kitroom_runtime::InMemoryQueryCache;
/// use serde_json::json;
///
/// let cache = InMemoryQueryCache::new();
/// cache.put(CacheKey::WarehouseItems, json!([]));
/// assert!(cache.get(CacheKey::WarehouseItems).is_some());
///
/// cache.invalidate(CacheKey::WarehouseItems);
/// assert!(cache.get(CacheKey::WarehouseItems).is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryQueryCache {
    entries: Arc<RwLock<HashMap<CacheKey, Value>>>,
}

impl InMemoryQueryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a snapshot is currently held for `key`.
    #[must_use]
    pub fn contains(&self, key: CacheKey) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&key)
    }

    /// Drop every snapshot.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl QueryCache for InMemoryQueryCache {
    fn get(&self, key: CacheKey) -> Option<Value> {
        let hit = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();

        if hit.is_some() {
            tracing::debug!(resource = %key, "Cache hit");
            CacheMetrics::record_hit(key);
        } else {
            tracing::debug!(resource = %key, "Cache miss");
            CacheMetrics::record_miss(key);
        }
        hit
    }

    fn put(&self, key: CacheKey, value: Value) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
    }

    fn invalidate(&self, key: CacheKey) {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);

        tracing::debug!(resource = %key, held = removed.is_some(), "Cache invalidated");
        CacheMetrics::record_invalidation(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_then_get_returns_snapshot() {
        let cache = InMemoryQueryCache::new();
        cache.put(CacheKey::InventoryMovements, json!([{"id": "m1"}]));

        assert_eq!(
            cache.get(CacheKey::InventoryMovements),
            Some(json!([{"id": "m1"}]))
        );
        assert!(cache.get(CacheKey::ItemAssignments).is_none());
    }

    #[test]
    fn invalidate_only_drops_one_key() {
        let cache = InMemoryQueryCache::new();
        cache.put(CacheKey::WarehouseItems, json!([]));
        cache.put(CacheKey::ItemAssignments, json!([]));

        cache.invalidate(CacheKey::WarehouseItems);

        assert!(!cache.contains(CacheKey::WarehouseItems));
        assert!(cache.contains(CacheKey::ItemAssignments));
    }

    #[test]
    fn clones_share_entries() {
        let cache = InMemoryQueryCache::new();
        let other = cache.clone();
        other.put(CacheKey::WarehouseItems, json!([1, 2]));

        assert!(cache.contains(CacheKey::WarehouseItems));
        cache.clear();
        assert!(!other.contains(CacheKey::WarehouseItems));
    }
}
