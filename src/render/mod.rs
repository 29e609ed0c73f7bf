//! Rendering explanations back into a document.
//!
//! - `comment`: persistent comment lines, planned as an edit transaction
//! - `hints`: ephemeral end-of-line hints kept outside the document

mod comment;
mod hints;

pub use comment::{
    clean_explanation, format_comment_lines, is_explanation_comment, plan_comment_edits,
    wrap_words, AnnotationTracker, CommentLayout, CONTINUATION_MARKER, DEFAULT_WRAP_WIDTH,
    EXPLANATION_MARKER,
};
pub use hints::{HintStore, InlayHint, HINT_PADDING};
