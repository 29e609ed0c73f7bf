//! codegloss - natural-language explanations for source code.
//!
//! codegloss sends lines or blocks of a document to an explanation service
//! and renders the answers either as comments written into the document or
//! as hints drawn next to the code.
//!
//! # Architecture
//!
//! - `extract`: which lines and blocks are worth explaining
//! - `client`: batched requests, response cache and error normalization
//! - `render`: comment edits and end-of-line hints
//! - `session`: commands, editor events and the auto-interpret state machine
//! - `document`: line-based documents and edit transactions
//! - `language`: target languages and comment syntax tables
//! - `config`: YAML settings
//! - `terminal` and `cli`: the file-backed terminal front end
//!
//! # Embedding
//!
//! Implement `EditorHost` for your editor and drive a `Session` from its
//! commands and change notifications. Forwarding the edits of the default
//! repaint nudge is fine; the session recognizes and ignores them.

pub mod cli;
pub mod client;
pub mod config;
pub mod document;
pub mod extract;
pub mod language;
pub mod render;
pub mod session;
pub mod terminal;

pub use client::{
    ClientError, ExplanationCache, ExplanationClient, ExplanationResult, HttpTransport, Outcome,
    Transport, TransportError,
};
pub use config::Settings;
pub use document::{Document, DocumentId, EditTransaction, LineEdit, LineRange};
pub use extract::{CodeUnit, UnitPosition};
pub use language::TargetLanguage;
pub use render::{CommentLayout, HintStore, InlayHint};
pub use session::{Command, EditorHost, NoticeLevel, Report, Session, SessionOptions, SessionState};
