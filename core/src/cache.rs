//! Read cache with explicit invalidation.
//!
//! Reads of the big lists (items, movements, assignments) are served from a
//! [`QueryCache`] and refetched lazily after a mutation invalidates the key.
//! This is the only consistency mechanism in the system: last write wins and
//! nothing is locked.

use serde_json::Value;
use std::fmt;

/// Logical resources that can be cached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Base items with their embedded variants
    WarehouseItems,
    /// The movement ledger, newest first
    InventoryMovements,
    /// Player assignments
    ItemAssignments,
}

impl CacheKey {
    /// Stable resource name used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WarehouseItems => "warehouse-items",
            Self::InventoryMovements => "inventory-movements",
            Self::ItemAssignments => "item-assignments",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache of serialized read results keyed by resource.
///
/// Values are JSON snapshots so one cache can hold lists of different domain
/// types. Implementations must be cheap to call from async code (no awaiting).
pub trait QueryCache: Send + Sync {
    /// Cached snapshot for `key`, if fresh.
    fn get(&self, key: CacheKey) -> Option<Value>;

    /// Store a fresh snapshot for `key`.
    fn put(&self, key: CacheKey, value: Value);

    /// Drop the snapshot for `key` so the next read refetches.
    fn invalidate(&self, key: CacheKey);
}

/// Cache that never holds anything. Every read goes to the store.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCache;

impl QueryCache for NoCache {
    fn get(&self, _key: CacheKey) -> Option<Value> {
        None
    }

    fn put(&self, _key: CacheKey, _value: Value) {}

    fn invalidate(&self, _key: CacheKey) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_names() {
        assert_eq!(CacheKey::WarehouseItems.as_str(), "warehouse-items");
        assert_eq!(CacheKey::InventoryMovements.to_string(), "inventory-movements");
        assert_eq!(CacheKey::ItemAssignments.as_str(), "item-assignments");
    }

    #[test]
    fn no_cache_never_hits() {
        let cache = NoCache;
        cache.put(CacheKey::WarehouseItems, Value::Array(vec![]));
        assert!(cache.get(CacheKey::WarehouseItems).is_none());
    }
}
