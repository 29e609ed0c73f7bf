//! Line-oriented extraction.

use std::collections::BTreeSet;

use super::CodeUnit;
use crate::document::{Document, LineRange};
use crate::language::{comment_syntax, CommentSyntax};
use crate::render::is_explanation_comment;

/// Prefixes that mark a line as a comment in the languages we annotate.
pub const COMMENT_MARKERS: &[&str] = &["//", "/*", "*", "#", "--", "'"];

/// Whether a line carries code worth explaining.
pub fn is_interpretable(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !COMMENT_MARKERS.iter().any(|m| trimmed.starts_with(m))
}

/// Whether a line of a document in `syntax` should become a unit.
///
/// Explanations written by an earlier run never do, whatever the syntax.
pub(super) fn qualifies(line: &str, syntax: CommentSyntax) -> bool {
    is_interpretable(line) && !is_explanation_comment(line, syntax)
}

/// One unit per qualifying line of the whole document.
pub fn extract_lines(doc: &Document) -> Vec<CodeUnit> {
    let syntax = comment_syntax(&doc.language_id);
    doc.lines()
        .iter()
        .enumerate()
        .filter(|(_, line)| qualifies(line, syntax))
        .map(|(index, line)| CodeUnit::line(index, line.trim()))
        .collect()
}

/// Units for the qualifying lines covered by any of the selections.
///
/// Overlapping selections are unioned; output is in ascending line order.
pub fn extract_selections(doc: &Document, selections: &[LineRange]) -> Vec<CodeUnit> {
    let last = match doc.line_count().checked_sub(1) {
        Some(last) => last,
        None => return Vec::new(),
    };

    let syntax = comment_syntax(&doc.language_id);
    let covered: BTreeSet<usize> = selections
        .iter()
        .map(|range| LineRange::new(range.start, range.end))
        .filter(|range| range.start <= last)
        .flat_map(|range| range.start..=range.end.min(last))
        .collect();

    covered
        .into_iter()
        .filter_map(|index| {
            let line = doc.line(index)?;
            qualifies(line, syntax).then(|| CodeUnit::line(index, line.trim()))
        })
        .collect()
}

/// The unit for a single line, if it qualifies.
pub fn extract_line(doc: &Document, index: usize) -> Option<CodeUnit> {
    let line = doc.line(index)?;
    qualifies(line, comment_syntax(&doc.language_id))
        .then(|| CodeUnit::line(index, line.trim()))
}

/// Whole-document extraction capped at `limit` units, for auto-interpret.
pub fn extract_auto(doc: &Document, limit: usize) -> Vec<CodeUnit> {
    let mut units = extract_lines(doc);
    units.truncate(limit);
    units
}
