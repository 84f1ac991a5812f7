//! User-facing messages emitted by the login flow.

use std::sync::Mutex;

/// Sink for messages the user should see, separate from tracing output.
pub trait Notifier: Send + Sync {
    fn message(&self, text: &str);
    fn success(&self, text: &str);
    fn warning(&self, text: &str);
    fn error(&self, text: &str);
}

/// Message severity recorded by [`RecordingNotifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Message,
    Success,
    Warning,
    Error,
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    entries: Mutex<Vec<(Level, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// True if any message at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|(l, text)| *l == level && text.contains(needle))
    }

    fn push(&self, level: Level, text: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, text.to_string()));
        }
    }
}

impl Notifier for RecordingNotifier {
    fn message(&self, text: &str) {
        self.push(Level::Message, text);
    }

    fn success(&self, text: &str) {
        self.push(Level::Success, text);
    }

    fn warning(&self, text: &str) {
        self.push(Level::Warning, text);
    }

    fn error(&self, text: &str) {
        self.push(Level::Error, text);
    }
}
