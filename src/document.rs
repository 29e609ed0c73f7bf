//! Line-based document snapshots and edit transactions.
//!
//! A `Document` is the core's view of an open editor buffer: an identity,
//! the editor's language id and the text split into lines. Edits are line
//! splices grouped into an `EditTransaction` that is always applied from
//! the bottom of the document upwards, so the positions of edits that have
//! not been applied yet stay valid.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::language;

/// Identity of an open document (a path or an editor URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised when an edit does not fit the document.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EditError {
    #[error("edit at line {line} is outside the document ({len} lines)")]
    OutOfRange { line: usize, len: usize },
    #[error("edit at line {line} deletes {delete} lines but only {available} remain")]
    DeletePastEnd {
        line: usize,
        delete: usize,
        available: usize,
    },
}

/// An inclusive range of 0-based line indices (a selection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    /// Create a range; the bounds are swapped if given in reverse.
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn single(line: usize) -> Self {
        Self {
            start: line,
            end: line,
        }
    }

    pub fn contains(&self, line: usize) -> bool {
        line >= self.start && line <= self.end
    }
}

impl std::str::FromStr for LineRange {
    type Err = String;

    /// Parse a 1-based `A-B` or `A` range as typed by a user.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_line = |part: &str| -> Result<usize, String> {
            let n: usize = part
                .trim()
                .parse()
                .map_err(|_| format!("invalid line number: {:?}", part))?;
            if n == 0 {
                return Err("line numbers start at 1".to_string());
            }
            Ok(n - 1)
        };

        match s.split_once('-') {
            Some((a, b)) => Ok(LineRange::new(parse_line(a)?, parse_line(b)?)),
            None => Ok(LineRange::single(parse_line(s)?)),
        }
    }
}

/// Snapshot of an open document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    /// Editor language id, e.g. "javascript" or "python"
    pub language_id: String,
    lines: Vec<String>,
    /// Bumped on every applied transaction
    pub version: u64,
    trailing_newline: bool,
}

impl Document {
    /// Create a document from its full text.
    pub fn new(id: DocumentId, language_id: impl Into<String>, text: &str) -> Self {
        let trailing_newline = text.ends_with('\n');
        let lines = text.lines().map(str::to_string).collect();
        Self {
            id,
            language_id: language_id.into(),
            lines,
            version: 0,
            trailing_newline,
        }
    }

    /// Create a document for a file path, guessing the language id from the extension.
    pub fn from_path(path: &Path, text: &str) -> Self {
        let language_id = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(language::language_id_for_extension)
            .unwrap_or("plaintext");
        Self::new(
            DocumentId::new(path.to_string_lossy()),
            language_id,
            text,
        )
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// The full text, with the original trailing newline preserved.
    pub fn text(&self) -> String {
        let mut text = self.lines.join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            text.push('\n');
        }
        text
    }

    /// Apply a transaction. Either every edit applies or none does.
    pub fn apply(&mut self, tx: &EditTransaction) -> Result<(), EditError> {
        let mut lines = self.lines.clone();
        for edit in tx.ordered() {
            if edit.line > lines.len() {
                return Err(EditError::OutOfRange {
                    line: edit.line,
                    len: lines.len(),
                });
            }
            let available = lines.len() - edit.line;
            if edit.delete > available {
                return Err(EditError::DeletePastEnd {
                    line: edit.line,
                    delete: edit.delete,
                    available,
                });
            }
            lines.splice(edit.line..edit.line + edit.delete, edit.insert.iter().cloned());
        }
        self.lines = lines;
        self.version += 1;
        Ok(())
    }
}

/// Replace `delete` lines starting at `line` with `insert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEdit {
    pub line: usize,
    pub delete: usize,
    pub insert: Vec<String>,
}

impl LineEdit {
    pub fn insert(line: usize, lines: Vec<String>) -> Self {
        Self {
            line,
            delete: 0,
            insert: lines,
        }
    }

    pub fn replace(line: usize, delete: usize, lines: Vec<String>) -> Self {
        Self {
            line,
            delete,
            insert: lines,
        }
    }

    pub fn delete(line: usize, count: usize) -> Self {
        Self {
            line,
            delete: count,
            insert: Vec::new(),
        }
    }
}

/// A group of line edits applied as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditTransaction {
    edits: Vec<LineEdit>,
}

impl EditTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edit: LineEdit) {
        self.edits.push(edit);
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Edits in application order: strictly descending by line.
    /// Edits on the same line keep their insertion order.
    pub fn ordered(&self) -> Vec<&LineEdit> {
        let mut edits: Vec<&LineEdit> = self.edits.iter().collect();
        edits.sort_by(|a, b| b.line.cmp(&a.line));
        edits
    }
}
