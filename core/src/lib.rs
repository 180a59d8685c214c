//! # Kitroom Core
//!
//! Backend-agnostic seams for the kitroom warehouse.
//!
//! The warehouse services never reach for a global: every collaborator is a
//! trait object injected at construction time.
//!
//! ## Seams
//!
//! - [`environment::Clock`]: current time, fixed in tests
//! - [`persistence::PersistenceClient`]: generic select/insert/update/delete over
//!   flat rows
//! - [`cache::QueryCache`]: read cache invalidated after every mutation
//! - [`notify::Notifier`]: user-facing success/error messages
//!
//! ## Example
//!
//! ```ignore
//! use kitroom_core::environment::SystemClock;
//! use kitroom_core::cache::NoCache;
//! use std::sync::Arc;
//!
//! let gateway = InventoryGateway::new(Arc::new(client), Arc::new(NoCache), Arc::new(SystemClock));
//! ```

pub mod cache;
pub mod notify;
pub mod persistence;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

/// Environment module - injected time source
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use kitroom_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let earlier = clock.now();
    /// assert!(clock.now() >= earlier);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
