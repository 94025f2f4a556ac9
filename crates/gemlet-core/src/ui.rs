//! Callbacks into the front end

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Where the browser reports to. Rendering is entirely the sink's business.
pub trait UiSink {
    /// A status-line message for the user.
    fn on_message(&self, severity: Severity, text: &str);

    /// The active tab now shows a different document, or a different tab
    /// became active.
    fn on_document_changed(&self);
}

/// Keeps every callback in memory. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    messages: Arc<Mutex<Vec<(Severity, String)>>>,
    changes: Arc<Mutex<usize>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages.lock().clone()
    }

    pub fn last_message(&self) -> Option<(Severity, String)> {
        self.messages.lock().last().cloned()
    }

    /// Number of `on_document_changed` calls so far.
    pub fn document_changes(&self) -> usize {
        *self.changes.lock()
    }
}

impl UiSink for RecordingSink {
    fn on_message(&self, severity: Severity, text: &str) {
        self.messages.lock().push((severity, text.to_string()));
    }

    fn on_document_changed(&self) {
        *self.changes.lock() += 1;
    }
}
