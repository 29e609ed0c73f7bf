//! Ephemeral explanations shown as end-of-line hints.
//!
//! Nothing here touches document content. The store is read on every paint
//! request for the visible range.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::client::{ExplanationResult, NO_EXPLANATION};
use crate::document::{Document, DocumentId, LineRange};

/// Prepended to every hint label to separate it from the code.
pub const HINT_PADDING: &str = " 💡 ";

/// A virtual label drawn after the end of a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlayHint {
    pub line: usize,
    /// Character column of the end of the line
    pub column: usize,
    pub label: String,
    pub padding_left: bool,
}

/// Explanations per document, per line.
#[derive(Debug, Default)]
pub struct HintStore {
    docs: HashMap<DocumentId, BTreeMap<usize, String>>,
}

impl HintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all hints of a document with `results`.
    ///
    /// Hints attach to each unit's anchor line.
    pub fn replace_document(&mut self, doc: &DocumentId, results: &[ExplanationResult]) {
        let entries: BTreeMap<usize, String> = results
            .iter()
            .map(|r| {
                let text = r.outcome.text().split_whitespace().collect::<Vec<_>>().join(" ");
                let text = if text.is_empty() {
                    NO_EXPLANATION.to_string()
                } else {
                    text
                };
                (r.position.anchor_line(), text)
            })
            .collect();
        self.docs.insert(doc.clone(), entries);
    }

    /// Set the hint of a single line.
    pub fn set(&mut self, doc: &DocumentId, line: usize, text: impl Into<String>) {
        self.docs
            .entry(doc.clone())
            .or_default()
            .insert(line, text.into());
    }

    pub fn get(&self, doc: &DocumentId, line: usize) -> Option<&str> {
        self.docs.get(doc)?.get(&line).map(String::as_str)
    }

    /// Drop hints for edited lines. Returns how many were dropped.
    pub fn invalidate_lines(&mut self, doc: &DocumentId, lines: &BTreeSet<usize>) -> usize {
        let Some(entries) = self.docs.get_mut(doc) else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|line, _| !lines.contains(line));
        before - entries.len()
    }

    pub fn remove_document(&mut self, doc: &DocumentId) {
        self.docs.remove(doc);
    }

    pub fn clear(&mut self) {
        self.docs.clear();
    }

    /// Number of hints held for a document.
    pub fn len(&self, doc: &DocumentId) -> usize {
        self.docs.get(doc).map(BTreeMap::len).unwrap_or(0)
    }

    /// Hints for the lines of `range` that have an explanation.
    pub fn provide_hints(&self, doc: &Document, range: LineRange) -> Vec<InlayHint> {
        let Some(entries) = self.docs.get(&doc.id) else {
            return Vec::new();
        };
        // Fields are public, so a hand-built range may be reversed
        let range = LineRange::new(range.start, range.end);

        entries
            .range(range.start..=range.end)
            .filter_map(|(&line, text)| {
                let content = doc.line(line)?;
                Some(InlayHint {
                    line,
                    column: content.chars().count(),
                    label: format!("{}{}", HINT_PADDING, text),
                    padding_left: true,
                })
            })
            .collect()
    }
}
