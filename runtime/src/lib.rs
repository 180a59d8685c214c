//! # Kitroom Runtime
//!
//! Production implementations of the non-storage seams defined in
//! `kitroom-core`.
//!
//! - [`InMemoryQueryCache`]: per-session read cache with explicit invalidation
//! - [`TracingNotifier`]: user-facing messages routed into structured logs
//! - [`metrics`]: Prometheus counters for cache, stock and assignment activity
//!
//! ## Example
//!
//! ```
//! use kitroom_core::cache::QueryCache;
//! use kitroom_core::notify::Notifier;
//! use kitroom_runtime::{InMemoryQueryCache, TracingNotifier};
//! use std::sync::Arc;
//!
//! let cache: Arc<dyn QueryCache> = Arc::new(InMemoryQueryCache::new());
//! let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
//! # let _ = (cache, notifier);
//! ```

pub mod cache;
pub mod metrics;
pub mod notifier;

pub use cache::InMemoryQueryCache;
pub use notifier::TracingNotifier;
