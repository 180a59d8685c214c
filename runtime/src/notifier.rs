//! Notifier that routes user-facing messages into the log.

use kitroom_core::notify::{NotificationLevel, Notifier};

/// Writes every notification as a structured `tracing` event.
///
/// Used by headless runs (the demo binary, batch jobs) where there is no toast
/// area to show messages in.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        match level {
            NotificationLevel::Success => tracing::info!(%level, message, "Notification"),
            NotificationLevel::Error => tracing::error!(%level, message, "Notification"),
        }
    }
}
