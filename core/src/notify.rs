//! Notification sink for user-facing outcomes (toast/banner).

use std::fmt;

/// Outcome class of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotificationLevel {
    /// The action completed
    Success,
    /// The action failed; the message carries the underlying error text
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Receives one human-readable message per completed user action.
pub trait Notifier: Send + Sync {
    /// Deliver `message` at `level`.
    fn notify(&self, level: NotificationLevel, message: &str);
}
