//! Per-tab history

use gemlet_document::Document;
use url::Url;

/// Visited documents with a cursor at the current one.
///
/// Adding while the cursor is behind the tip drops the forward branch, the
/// way back/forward works in any browser.
#[derive(Debug, Default, Clone)]
pub struct HistoryStack {
    entries: Vec<Document>,
    cursor: usize,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit `doc` as the new current entry.
    pub fn add(&mut self, doc: Document) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(doc);
        self.cursor = self.entries.len() - 1;
    }

    /// Swap the current entry for a fresh copy of the same page.
    pub fn replace_current(&mut self, doc: Document) {
        match self.entries.get_mut(self.cursor) {
            Some(slot) => *slot = doc,
            None => self.add(doc),
        }
    }

    pub fn back(&mut self) -> Option<&Document> {
        if self.cursor == 0 || self.entries.is_empty() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    pub fn forward(&mut self) -> Option<&Document> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn current(&self) -> Option<&Document> {
        self.entries.get(self.cursor)
    }

    /// How many entries were fetched from `url`.
    pub fn contains(&self, url: &Url) -> usize {
        self.entries
            .iter()
            .filter(|doc| doc.url().as_str() == url.as_str())
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemlet_document::ResponseParser;

    fn page(path: &str) -> Document {
        let url = Url::parse(&format!("gemini://example.org/{path}")).unwrap();
        ResponseParser::parse_bytes(url, b"20 text/gemini\r\n# Page\r\n").unwrap()
    }

    fn paths(history: &HistoryStack) -> Vec<String> {
        history
            .iter()
            .map(|doc| doc.url().path().trim_start_matches('/').to_string())
            .collect()
    }

    #[test]
    fn test_add_advances_cursor() {
        let mut history = HistoryStack::new();
        assert!(history.current().is_none());

        history.add(page("a"));
        history.add(page("b"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), 1);
        assert_eq!(history.current().unwrap().url().path(), "/b");
    }

    #[test]
    fn test_branch_truncation() {
        let mut history = HistoryStack::new();
        history.add(page("A"));
        history.add(page("B"));
        history.add(page("C"));

        history.back();
        history.back();
        history.add(page("D"));

        assert_eq!(paths(&history), vec!["A", "D"]);
        assert_eq!(history.cursor(), 1);
        assert!(history.forward().is_none());
    }

    #[test]
    fn test_back_and_forward_stop_at_boundaries() {
        let mut history = HistoryStack::new();
        assert!(history.back().is_none());
        assert!(history.forward().is_none());

        history.add(page("a"));
        history.add(page("b"));

        assert_eq!(history.back().unwrap().url().path(), "/a");
        assert!(history.back().is_none());
        assert_eq!(history.cursor(), 0);

        assert_eq!(history.forward().unwrap().url().path(), "/b");
        assert!(history.forward().is_none());
        assert_eq!(history.cursor(), 1);
    }

    #[test]
    fn test_contains_counts_matching_urls() {
        let mut history = HistoryStack::new();
        history.add(page("a"));
        history.add(page("b"));
        history.add(page("a"));

        let a = Url::parse("gemini://example.org/a").unwrap();
        let z = Url::parse("gemini://example.org/z").unwrap();
        assert_eq!(history.contains(&a), 2);
        assert_eq!(history.contains(&z), 0);
    }

    #[test]
    fn test_replace_current_keeps_forward_entries() {
        let mut history = HistoryStack::new();
        history.add(page("a"));
        history.add(page("b"));
        history.back();

        history.replace_current(page("a"));

        assert_eq!(paths(&history), vec!["a", "b"]);
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn test_replace_current_on_empty_history_adds() {
        let mut history = HistoryStack::new();
        history.replace_current(page("a"));
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), 0);
    }
}
