//! Persistent explanations written into the document as comment lines.
//!
//! An explanation sits directly below the line it explains:
//!
//! ```text
//! const x = 10;
//! // 💡 Declares a constant x with value 10
//! ```
//!
//! Wrapped explanations continue on lines marked with `↳`. Rerunning on an
//! annotated line replaces the whole explanation run below it.

use std::collections::{BTreeSet, HashMap};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use crate::client::{ExplanationResult, NO_EXPLANATION};
use crate::document::{Document, DocumentId, EditTransaction, LineEdit};
use crate::language::{comment_syntax, CommentSyntax};

/// Marks the first line of an explanation comment.
pub const EXPLANATION_MARKER: &str = "💡";
/// Marks continuation lines of a wrapped explanation.
pub const CONTINUATION_MARKER: &str = "↳";
/// Default maximum comment line length, in characters.
pub const DEFAULT_WRAP_WIDTH: usize = 100;

lazy_static! {
    /// Lead-in phrases that add nothing to an explanation.
    static ref FILLER: Regex = Regex::new(
        r"(?i)^(this (line of code|line|code snippet|code|statement|expression|function|block)( here)?( simply| basically)?\s+|here,?\s+|basically,?\s+|simply put,?\s+|in short,?\s+)"
    )
    .unwrap();

    /// Comment delimiters that must not leak into generated comments.
    static ref EMBEDDED_MARKERS: Regex = Regex::new(r"//+|/\*+|\*+/|<!--|-->").unwrap();
}

/// How explanation text is laid out in comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentLayout {
    /// One comment line with the explanation as returned
    Single,
    /// Cleaned text wrapped over as many lines as needed
    Wrapped { width: usize },
}

/// Whether `line` is part of an explanation comment in this syntax.
pub fn is_explanation_comment(line: &str, syntax: CommentSyntax) -> bool {
    let Some(rest) = line.trim_start().strip_prefix(syntax.prefix) else {
        return false;
    };
    let rest = rest.trim_start();
    rest.starts_with(EXPLANATION_MARKER) || rest.starts_with(CONTINUATION_MARKER)
}

/// Whether `line` starts an explanation (as opposed to continuing one).
fn is_explanation_start(line: &str, syntax: CommentSyntax) -> bool {
    line.trim_start()
        .strip_prefix(syntax.prefix)
        .map(|rest| rest.trim_start().starts_with(EXPLANATION_MARKER))
        .unwrap_or(false)
}

/// Number of contiguous explanation lines starting at `from`.
fn explanation_run_len(doc: &Document, from: usize, syntax: CommentSyntax) -> usize {
    doc.lines()
        .iter()
        .skip(from)
        .take_while(|line| is_explanation_comment(line, syntax))
        .count()
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}

/// Strip filler lead-ins, embedded comment markers and trailing punctuation.
pub fn clean_explanation(text: &str) -> String {
    let without_markers = EMBEDDED_MARKERS.replace_all(text, " ");
    let collapsed = without_markers.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut cleaned = collapsed.as_str();
    // Filler can be stacked ("Here, this line ...")
    while let Some(m) = FILLER.find(cleaned) {
        if m.end() == 0 {
            break;
        }
        cleaned = &cleaned[m.end()..];
    }
    let cleaned = cleaned.trim_end_matches(['.', '!', ';', ',', ' ']);

    let mut chars = cleaned.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Greedy word wrap; a word longer than `width` gets a line of its own.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };

        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Build the comment lines for one explanation.
pub fn format_comment_lines(
    text: &str,
    indent: &str,
    syntax: CommentSyntax,
    layout: CommentLayout,
) -> Vec<String> {
    let suffix = if syntax.suffix.is_empty() {
        String::new()
    } else {
        format!(" {}", syntax.suffix)
    };
    let line = |marker: &str, body: &str| format!("{indent}{} {marker} {body}{suffix}", syntax.prefix);

    match layout {
        CommentLayout::Single => {
            let text = if syntax.suffix.is_empty() {
                text.to_string()
            } else {
                text.replace(syntax.suffix, " ")
            };
            let mut flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if flat.is_empty() {
                flat = NO_EXPLANATION.to_string();
            }
            vec![line(EXPLANATION_MARKER, flat.as_str())]
        }
        CommentLayout::Wrapped { width } => {
            let mut cleaned = clean_explanation(text);
            if cleaned.is_empty() {
                cleaned = NO_EXPLANATION.to_string();
            }
            // indent + prefix + " " + marker + " " ... suffix
            let overhead = indent.chars().count()
                + syntax.prefix.chars().count()
                + 3
                + suffix.chars().count();
            // Only a single word wider than the room left may overflow
            let text_width = width.saturating_sub(overhead).max(1);

            wrap_words(&cleaned, text_width)
                .iter()
                .enumerate()
                .map(|(i, body)| {
                    let marker = if i == 0 {
                        EXPLANATION_MARKER
                    } else {
                        CONTINUATION_MARKER
                    };
                    line(marker, body.as_str())
                })
                .collect()
        }
    }
}

/// Plan the edits that write `results` into `doc` as comments.
///
/// Each explanation goes below its unit's anchor line (the closing line for
/// blocks), indented like the unit's first line. An explanation already
/// below the anchor is replaced. Edits are returned as one transaction.
pub fn plan_comment_edits(
    doc: &Document,
    results: &[ExplanationResult],
    layout: CommentLayout,
) -> EditTransaction {
    let syntax = comment_syntax(&doc.language_id);
    let mut tx = EditTransaction::new();
    let mut seen = BTreeSet::new();

    for result in results {
        let anchor = result.position.anchor_line();
        if !seen.insert(anchor) {
            continue;
        }
        let first = match doc.line(result.position.first_line()) {
            Some(line) if anchor < doc.line_count() => line,
            _ => {
                warn!(doc = %doc.id, position = %result.position, "explanation target no longer exists");
                continue;
            }
        };

        let indent = leading_whitespace(first);
        let lines = format_comment_lines(result.outcome.text(), indent, syntax, layout);
        let existing = explanation_run_len(doc, anchor + 1, syntax);
        tx.push(LineEdit::replace(anchor + 1, existing, lines));
    }

    tx
}

/// Per-document record of which code lines carry an explanation.
#[derive(Debug, Default)]
pub struct AnnotationTracker {
    docs: HashMap<DocumentId, BTreeSet<usize>>,
}

impl AnnotationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the annotated lines of `doc` from its current text.
    pub fn refresh(&mut self, doc: &Document) {
        let syntax = comment_syntax(&doc.language_id);
        let lines = doc.lines();
        let annotated: BTreeSet<usize> = lines
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| {
                !is_explanation_comment(&pair[0], syntax) && is_explanation_start(&pair[1], syntax)
            })
            .map(|(index, _)| index)
            .collect();

        if annotated.is_empty() {
            self.docs.remove(&doc.id);
        } else {
            self.docs.insert(doc.id.clone(), annotated);
        }
    }

    pub fn is_annotated(&self, doc: &DocumentId, line: usize) -> bool {
        self.docs
            .get(doc)
            .map(|lines| lines.contains(&line))
            .unwrap_or(false)
    }

    pub fn annotated(&self, doc: &DocumentId) -> Vec<usize> {
        self.docs
            .get(doc)
            .map(|lines| lines.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Forget a closed document.
    pub fn forget(&mut self, doc: &DocumentId) {
        self.docs.remove(doc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Outcome;
    use crate::extract::UnitPosition;

    fn js(text: &str) -> Document {
        Document::new(DocumentId::new("a.js"), "javascript", text)
    }

    fn explained(line: usize, text: &str) -> ExplanationResult {
        ExplanationResult {
            position: UnitPosition::Line(line),
            outcome: Outcome::Explanation(text.to_string()),
        }
    }

    #[test]
    fn test_single_comment_below_line() {
        let mut doc = js("const x = 10;\n");
        let tx = plan_comment_edits(
            &doc,
            &[explained(0, "Declares a constant x with value 10")],
            CommentLayout::Single,
        );
        doc.apply(&tx).unwrap();

        assert_eq!(
            doc.lines(),
            &["const x = 10;", "// 💡 Declares a constant x with value 10"]
        );
    }

    #[test]
    fn test_comment_reuses_indentation_and_syntax() {
        let mut doc = Document::new(DocumentId::new("a.py"), "python", "def f():\n    return 1\n");
        let tx = plan_comment_edits(&doc, &[explained(1, "Returns one")], CommentLayout::Single);
        doc.apply(&tx).unwrap();
        assert_eq!(doc.lines()[2], "    # 💡 Returns one");
    }

    #[test]
    fn test_block_comment_languages_get_suffix() {
        let mut doc = Document::new(DocumentId::new("a.css"), "css", "a { color: red; }\n");
        let tx = plan_comment_edits(&doc, &[explained(0, "Makes */ links red")], CommentLayout::Single);
        doc.apply(&tx).unwrap();
        assert_eq!(doc.lines()[1], "/* 💡 Makes links red */");
    }

    #[test]
    fn test_two_runs_leave_exactly_one_explanation() {
        let mut doc = js("let a = 1;\n");
        let tx = plan_comment_edits(&doc, &[explained(0, "old")], CommentLayout::Single);
        doc.apply(&tx).unwrap();
        let tx = plan_comment_edits(&doc, &[explained(0, "new")], CommentLayout::Single);
        doc.apply(&tx).unwrap();

        assert_eq!(doc.lines(), &["let a = 1;", "// 💡 new"]);
    }

    #[test]
    fn test_plain_comment_below_is_kept() {
        let mut doc = js("go();\n// hand-written note\n");
        let tx = plan_comment_edits(&doc, &[explained(0, "Runs go")], CommentLayout::Single);
        doc.apply(&tx).unwrap();
        assert_eq!(
            doc.lines(),
            &["go();", "// 💡 Runs go", "// hand-written note"]
        );
    }

    #[test]
    fn test_wrapped_layout_respects_width() {
        let text = "This line iterates over every element of the input collection and accumulates \
                    the running total of all values that pass the validation filter defined above.";
        let lines = format_comment_lines(
            text,
            "    ",
            comment_syntax("javascript"),
            CommentLayout::Wrapped { width: 60 },
        );

        assert!(lines.len() > 1);
        assert!(lines[0].starts_with("    // 💡 Iterates over"));
        assert!(lines[1].starts_with("    // ↳ "));
        for line in &lines {
            assert!(line.chars().count() <= 60, "{:?} is too long", line);
        }
        assert!(!lines.last().unwrap().ends_with('.'));

        // Deep indentation leaves little room but the limit still holds
        let indent = " ".repeat(90);
        let lines = format_comment_lines(
            "Adds the tax to a net sum and then rolls it up",
            &indent,
            comment_syntax("javascript"),
            CommentLayout::Wrapped { width: 100 },
        );
        assert!(lines.len() > 2);
        for line in &lines {
            assert!(line.chars().count() <= 100, "{:?} is too long", line);
        }
        assert_eq!(lines[0], format!("{indent}// 💡 Adds"));
    }

    #[test]
    fn test_wrapped_rerun_replaces_whole_run() {
        let mut doc = js("compute();\nnext();\n");
        let long = "word ".repeat(60);
        let tx = plan_comment_edits(
            &doc,
            &[explained(0, &long)],
            CommentLayout::Wrapped { width: 40 },
        );
        doc.apply(&tx).unwrap();
        assert!(doc.line_count() > 3);

        let tx = plan_comment_edits(&doc, &[explained(0, "short")], CommentLayout::Wrapped { width: 40 });
        doc.apply(&tx).unwrap();
        assert_eq!(doc.lines(), &["compute();", "// 💡 Short", "next();"]);
    }

    #[test]
    fn test_block_explanation_goes_after_closing_line() {
        let mut doc = js("  function f() {\n    g();\n  }\nh();\n");
        let result = ExplanationResult {
            position: UnitPosition::Block { start: 0, end: 2 },
            outcome: Outcome::Explanation("Defines f".to_string()),
        };
        let tx = plan_comment_edits(&doc, &[result], CommentLayout::Single);
        doc.apply(&tx).unwrap();
        assert_eq!(doc.lines()[3], "  // 💡 Defines f");
        assert_eq!(doc.lines()[4], "h();");
    }

    #[test]
    fn test_errors_and_blanks_are_rendered() {
        let mut doc = js("a();\nb();\n");
        let results = [
            ExplanationResult {
                position: UnitPosition::Line(0),
                outcome: Outcome::Error("Error: Server error: rate limited".to_string()),
            },
            explained(1, "   "),
        ];
        let tx = plan_comment_edits(&doc, &results, CommentLayout::Single);
        doc.apply(&tx).unwrap();
        assert_eq!(doc.lines()[1], "// 💡 Error: Server error: rate limited");
        assert_eq!(doc.lines()[3], "// 💡 No explanation available");
    }

    #[test]
    fn test_stale_positions_are_skipped() {
        let doc = js("a();\n");
        let tx = plan_comment_edits(&doc, &[explained(5, "gone")], CommentLayout::Single);
        assert!(tx.is_empty());
    }

    #[test]
    fn test_clean_explanation() {
        assert_eq!(
            clean_explanation("This line declares // a counter."),
            "Declares a counter"
        );
        assert_eq!(clean_explanation("Here, this code /* loops */"), "Loops");
        assert_eq!(clean_explanation("Sums values!"), "Sums values");
        assert_eq!(clean_explanation("..."), "");
    }

    #[test]
    fn test_wrap_words_long_word() {
        let lines = wrap_words("a supercalifragilistic b", 5);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn test_tracker_refresh() {
        let doc = js("a();\n// 💡 Calls a\n// ↳ more\nb();\nc();\n// 💡 Calls c\n");
        let mut tracker = AnnotationTracker::new();
        tracker.refresh(&doc);

        assert_eq!(tracker.annotated(&doc.id), vec![0, 4]);
        assert!(tracker.is_annotated(&doc.id, 4));
        assert!(!tracker.is_annotated(&doc.id, 3));

        tracker.forget(&doc.id);
        assert!(tracker.annotated(&doc.id).is_empty());
    }
}
