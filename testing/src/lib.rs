//! # Kitroom Testing
//!
//! Testing utilities and helpers for the kitroom warehouse.
//!
//! This crate provides:
//! - [`InMemoryPersistence`]: in-memory backing store with failure injection
//! - [`FixedClock`] / [`test_clock`]: deterministic time
//! - [`RecordingNotifier`]: captures user-facing notifications
//!
//! ## Example
//!
//! ```ignore
//! use kitroom_testing::{InMemoryPersistence, RecordingNotifier, test_clock};
//!
//! #[tokio::test]
//! async fn records_a_movement() {
//!     let store = InMemoryPersistence::new();
//!     let notifier = RecordingNotifier::new();
//!     let app = WarehouseApp::builder(Arc::new(store.clone()))
//!         .clock(Arc::new(test_clock()))
//!         .notifier(Arc::new(notifier.clone()))
//!         .build();
//!
//!     app.movements.record_movement(request).await.unwrap();
//!     assert_eq!(notifier.successes().len(), 1);
//! }
//! ```

mod persistence_mocks;

pub use persistence_mocks::{InMemoryPersistence, Operation};

/// Mock implementations of environment traits
pub mod mocks {
    use chrono::{DateTime, Duration, Utc};
    use kitroom_core::environment::Clock;
    use kitroom_core::notify::{NotificationLevel, Notifier};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time until explicitly advanced. Clones share the
    /// same time, so a test can keep a handle and move time forward under a
    /// service that owns another clone.
    ///
    /// # Example
    ///
    /// ```
    /// use kitroom_testing::mocks::FixedClock;
    /// use kitroom_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// assert_eq!(time1, clock.now()); // Always the same!
    ///
    /// clock.advance(Duration::days(1));
    /// assert_eq!(clock.now() - time1, Duration::days(1));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward by `by`.
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump the clock to `time`.
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = time;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Notifier that records every message for later assertions.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingNotifier {
        messages: Arc<Mutex<Vec<(NotificationLevel, String)>>>,
    }

    impl RecordingNotifier {
        /// Create an empty recorder.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Every notification so far, oldest first.
        #[must_use]
        pub fn messages(&self) -> Vec<(NotificationLevel, String)> {
            self.messages
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Messages delivered at [`NotificationLevel::Success`].
        #[must_use]
        pub fn successes(&self) -> Vec<String> {
            self.at_level(NotificationLevel::Success)
        }

        /// Messages delivered at [`NotificationLevel::Error`].
        #[must_use]
        pub fn errors(&self) -> Vec<String> {
            self.at_level(NotificationLevel::Error)
        }

        /// The most recent notification, if any.
        #[must_use]
        pub fn last(&self) -> Option<(NotificationLevel, String)> {
            self.messages
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .last()
                .cloned()
        }

        fn at_level(&self, level: NotificationLevel) -> Vec<String> {
            self.messages
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, message)| message.clone())
                .collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, level: NotificationLevel, message: &str) {
            self.messages
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((level, message.to_owned()));
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, RecordingNotifier, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use kitroom_core::environment::Clock;
    use kitroom_core::notify::{NotificationLevel, Notifier};

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn fixed_clock_clones_share_time() {
        let clock = test_clock();
        let handle = clock.clone();
        let start = clock.now();

        handle.advance(Duration::hours(3));
        assert_eq!(clock.now() - start, Duration::hours(3));
    }

    #[test]
    fn recording_notifier_splits_by_level() {
        let notifier = RecordingNotifier::new();
        notifier.notify(NotificationLevel::Success, "ok");
        notifier.notify(NotificationLevel::Error, "boom");

        assert_eq!(notifier.successes(), vec!["ok".to_string()]);
        assert_eq!(notifier.errors(), vec!["boom".to_string()]);
        assert_eq!(
            notifier.last(),
            Some((NotificationLevel::Error, "boom".to_string()))
        );
    }
}
