//! Session data structure

use chrono::{DateTime, Utc};
use gemlet_document::Document;
use gemlet_navigation::HistoryStack;
use uuid::Uuid;

/// One tab: an identity plus the history browsed in it.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique identifier
    pub id: String,
    /// When the session was opened
    pub created_at: DateTime<Utc>,
    /// Last time a document was committed or history moved
    pub updated_at: DateTime<Utc>,
    history: HistoryStack,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            history: HistoryStack::new(),
        }
    }

    /// The document shown in this tab, if anything was loaded yet.
    pub fn current(&self) -> Option<&Document> {
        self.history.current()
    }

    /// Commit a freshly fetched document as current.
    pub fn navigate(&mut self, doc: Document) {
        tracing::debug!(session_id = %self.id, url = %doc.url(), "Committing document");
        self.history.add(doc);
        self.updated_at = Utc::now();
    }

    /// Replace the current document with a re-fetched copy.
    pub fn reload(&mut self, doc: Document) {
        self.history.replace_current(doc);
        self.updated_at = Utc::now();
    }

    pub fn back(&mut self) -> Option<&Document> {
        self.updated_at = Utc::now();
        self.history.back()
    }

    pub fn forward(&mut self) -> Option<&Document> {
        self.updated_at = Utc::now();
        self.history.forward()
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    /// Title for the tab bar: the current document's, or a placeholder.
    pub fn display_title(&self) -> &str {
        self.current().map(Document::title).unwrap_or("New tab")
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
