//! The capabilities a session needs from the editor it runs in.

use std::fmt;

use crate::document::{Document, DocumentId, EditTransaction, LineEdit};

/// Severity of a transient notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Auto-interpret state, also shown as the status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disabled,
    AutoInterpreting,
}

impl SessionState {
    /// Status indicator text.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Disabled => "codegloss: off",
            SessionState::AutoInterpreting => "codegloss: auto",
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, SessionState::AutoInterpreting)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Editor services used by a [`Session`](super::Session).
///
/// Text buffers, notifications and the status indicator belong to the host;
/// the session only calls into them.
pub trait EditorHost {
    /// The document with focus, if any.
    fn active_document(&self) -> Option<Document>;

    /// Current snapshot of an open document.
    fn document(&self, id: &DocumentId) -> Option<Document>;

    /// Apply a transaction atomically.
    fn apply_edits(&mut self, id: &DocumentId, tx: &EditTransaction) -> anyhow::Result<()>;

    /// Show a transient notification.
    fn notify(&mut self, level: NoticeLevel, message: &str);

    /// Update the status indicator.
    fn set_status(&mut self, state: SessionState);

    /// Register (`true`) or dispose (`false`) the hint provider.
    fn set_hint_provider(&mut self, registered: bool);

    /// A request is in flight (`Some`) or finished (`None`).
    fn progress(&mut self, _message: Option<&str>) {}

    /// Make the host ask for hints again.
    ///
    /// Hosts only repaint hints when a document changes, so the default
    /// inserts an empty first line and removes it again. The text ends up
    /// unchanged. Hosts with a real repaint call should override this.
    fn request_repaint(&mut self, id: &DocumentId) -> anyhow::Result<()> {
        let mut insert = EditTransaction::new();
        insert.push(LineEdit::insert(0, vec![String::new()]));
        self.apply_edits(id, &insert)?;

        let mut delete = EditTransaction::new();
        delete.push(LineEdit::delete(0, 1));
        self.apply_edits(id, &delete)
    }
}
