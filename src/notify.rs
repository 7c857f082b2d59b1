//! Transient user-facing notifications.
//!
//! Components never print directly; they hand a [`Notification`] to a
//! [`Notifier`] so the same flows can run against a terminal or a test.

use std::sync::Mutex;

use console::style;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }
}

/// Sink for notifications raised by the form and the table
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Prints notifications to stderr.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Success => eprintln!("{} {}", style("✓").green().bold(), notification.message),
            Level::Error => eprintln!("{} {}", style("✗").red().bold(), notification.message),
        }
    }
}

/// In-memory notifier
///
/// Useful for testing.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything notified so far, oldest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<Notification> {
        self.seen.lock().ok()?.last().cloned()
    }

    pub fn clear(&self) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.clear();
        }
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(notification);
        }
    }
}
