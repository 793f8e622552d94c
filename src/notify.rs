//! Notification sinks.
//!
//! The batch layer reports through a [`Notifier`] handed to it by the caller.
//! Sinks are infallible by signature: whatever they do with a message, they
//! cannot fail the conversion that produced it.

use std::error::Error as StdError;
use std::sync::Mutex;

pub trait Notifier {
    fn info(&self, title: &str, message: &str);
    fn error(&self, title: &str, message: &str);
    /// An unexpected failure, with the error that caused it.
    fn exception(&self, error: &dyn StdError, message: &str);
}

// ── TracingNotifier ──────────────────────────────────────────────────────────

/// Routes every notification to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn info(&self, title: &str, message: &str) {
        tracing::info!(title, "{message}");
    }

    fn error(&self, title: &str, message: &str) {
        tracing::error!(title, "{message}");
    }

    fn exception(&self, error: &dyn StdError, message: &str) {
        tracing::error!(error = %error, "{message}");
    }
}

// ── ConsoleNotifier ──────────────────────────────────────────────────────────

/// Plain stdout/stderr output for terminal use.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier {
    /// Suppress informational messages.
    pub quiet: bool,
}

impl Notifier for ConsoleNotifier {
    fn info(&self, _title: &str, message: &str) {
        if !self.quiet {
            println!("{message}");
        }
    }

    fn error(&self, _title: &str, message: &str) {
        eprintln!("{message}");
    }

    fn exception(&self, error: &dyn StdError, message: &str) {
        eprintln!("{message}");
        eprintln!("  caused by: {error}");
    }
}

// ── RecordingNotifier ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
    Exception,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level:   Level,
    /// Title for `info`/`error`; the rendered error for `exception`.
    pub title:   String,
    pub message: String,
}

/// Keeps every notification in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    /// Number of `error` and `exception` notifications.
    pub fn failure_count(&self) -> usize {
        self.lock().iter().filter(|n| n.level != Level::Info).count()
    }

    fn push(&self, level: Level, title: String, message: &str) {
        self.lock().push(Notification { level, title, message: message.to_owned() });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        // A poisoned lock still holds valid events.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Notifier for RecordingNotifier {
    fn info(&self, title: &str, message: &str) {
        self.push(Level::Info, title.to_owned(), message);
    }

    fn error(&self, title: &str, message: &str) {
        self.push(Level::Error, title.to_owned(), message);
    }

    fn exception(&self, error: &dyn StdError, message: &str) {
        self.push(Level::Exception, error.to_string(), message);
    }
}
