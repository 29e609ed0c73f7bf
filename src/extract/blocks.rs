//! Brace-delimited block extraction.
//!
//! The scanner is a small state machine over lines: a brace depth counter,
//! the line of a block introducer still waiting for its opening brace, and
//! the start line of the block currently open at depth 0. Only top-level
//! blocks are emitted; nested blocks are part of their parent's text.
//!
//! Brace characters inside string, character or regex literals are counted
//! like any other brace, so such literals can shift or hide block bounds.

use lazy_static::lazy_static;
use regex::Regex;

use super::lines::{extract_lines, is_interpretable, qualifies};
use super::CodeUnit;
use crate::document::Document;
use crate::language::comment_syntax;

lazy_static! {
    /// Keywords that usually introduce a braced block.
    static ref BLOCK_KEYWORD: Regex =
        Regex::new(r"^(function|class|if|for|while|switch|try|catch|finally|else)\b").unwrap();
}

/// Whether a trimmed line looks like it opens a block.
fn is_block_introducer(trimmed: &str) -> bool {
    BLOCK_KEYWORD.is_match(trimmed) || trimmed.ends_with('{') || trimmed.contains("=> {")
}

/// Incremental scanner producing `(start, end)` line spans of top-level blocks.
#[derive(Debug, Default)]
pub struct BlockScanner {
    depth: usize,
    /// Introducer seen at depth 0 whose brace is on a later line
    pending_start: Option<usize>,
    /// Start line of the block open at depth 0
    open_start: Option<usize>,
    spans: Vec<(usize, usize)>,
}

impl BlockScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next line of the document.
    pub fn feed(&mut self, index: usize, line: &str) {
        // Comments and blank lines neither open blocks nor move the depth
        if !is_interpretable(line) {
            return;
        }

        let trimmed = line.trim();
        // `} else {` closes one block and introduces the next
        let introduces = is_block_introducer(trimmed.trim_start_matches('}').trim_start());
        let mut saw_open = false;

        for ch in line.chars() {
            match ch {
                '{' => {
                    saw_open = true;
                    if self.depth == 0 {
                        self.open_start = self
                            .pending_start
                            .take()
                            .or_else(|| introduces.then_some(index));
                    }
                    self.depth += 1;
                }
                '}' if self.depth > 0 => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        if let Some(start) = self.open_start.take() {
                            self.spans.push((start, index));
                        }
                    }
                }
                _ => {}
            }
        }

        if self.depth == 0 && !saw_open {
            self.pending_start = (introduces && !trimmed.ends_with(';')).then_some(index);
        }
    }

    /// Whether a block is still open (unbalanced braces so far).
    pub fn has_open_block(&self) -> bool {
        self.open_start.is_some()
    }

    /// Completed block spans, in document order.
    pub fn finish(self) -> Vec<(usize, usize)> {
        self.spans
    }
}

/// One unit per balanced top-level block.
///
/// Documents without any balanced block fall back to one unit per line.
pub fn extract_blocks(doc: &Document) -> Vec<CodeUnit> {
    let syntax = comment_syntax(&doc.language_id);
    let mut scanner = BlockScanner::new();
    for (index, line) in doc.lines().iter().enumerate() {
        // Explanation text may itself contain braces
        if qualifies(line, syntax) {
            scanner.feed(index, line);
        }
    }

    let spans = scanner.finish();
    if spans.is_empty() {
        return extract_lines(doc);
    }

    spans
        .into_iter()
        .map(|(start, end)| CodeUnit::block(start, end, doc.lines()[start..=end].join("\n")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentId;
    use crate::extract::UnitPosition;

    fn doc(text: &str) -> Document {
        Document::new(DocumentId::new("sample.js"), "javascript", text)
    }

    fn spans(text: &str) -> Vec<UnitPosition> {
        extract_blocks(&doc(text))
            .into_iter()
            .map(|u| u.position)
            .collect()
    }

    #[test]
    fn test_single_function_is_one_block() {
        let text = "\
function f(a) {
  if (a) {
    return 1;
  }
  return 2;
}
";
        let units = extract_blocks(&doc(text));
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].position, UnitPosition::Block { start: 0, end: 5 });
        assert!(units[0].text.starts_with("function f(a) {"));
        assert!(units[0].text.ends_with('}'));
        assert_eq!(units[0].text.lines().count(), 6);
    }

    #[test]
    fn test_no_braces_falls_back_to_lines() {
        let text = "x = 1\n# comment\ny = x + 1\n";
        let units = extract_blocks(&doc(text));
        assert_eq!(
            units,
            vec![CodeUnit::line(0, "x = 1"), CodeUnit::line(2, "y = x + 1")]
        );
    }

    #[test]
    fn test_brace_on_next_line() {
        let text = "function g()\n{\n  go();\n}\n";
        assert_eq!(spans(text), vec![UnitPosition::Block { start: 0, end: 3 }]);
    }

    #[test]
    fn test_statement_clears_pending_introducer() {
        // The braceless `if` ends at its semicolon; the block starts at the brace
        let text = "if (x) go();\n{\n  y();\n}\n";
        assert_eq!(spans(text), vec![UnitPosition::Block { start: 1, end: 3 }]);
    }

    #[test]
    fn test_else_chain_yields_two_blocks() {
        let text = "if (a) {\n  b();\n} else {\n  c();\n}\n";
        assert_eq!(
            spans(text),
            vec![
                UnitPosition::Block { start: 0, end: 2 },
                UnitPosition::Block { start: 2, end: 4 },
            ]
        );
    }

    #[test]
    fn test_arrow_and_one_line_blocks() {
        let text = "const h = () => {\n  run();\n};\nif (ok) { done(); }\n";
        assert_eq!(
            spans(text),
            vec![
                UnitPosition::Block { start: 0, end: 2 },
                UnitPosition::Block { start: 3, end: 3 },
            ]
        );
    }

    #[test]
    fn test_unbalanced_block_is_never_emitted() {
        let text = "function ok() {\n}\nfunction broken() {\n  if (x) {\n}\n";
        let mut scanner = BlockScanner::new();
        for (i, line) in text.lines().enumerate() {
            scanner.feed(i, line);
        }
        assert!(scanner.has_open_block());
        assert_eq!(scanner.finish(), vec![(0, 1)]);
    }

    #[test]
    fn test_braces_in_comments_are_ignored() {
        let text = "// if (x) {\nclass A {\n  // }\n}\n";
        assert_eq!(spans(text), vec![UnitPosition::Block { start: 1, end: 3 }]);
    }

    #[test]
    fn test_braces_in_explanations_are_ignored() {
        let text = "\
<script>
<!-- 💡 Wraps code in { braces -->
function f() {
  go();
}
</script>
";
        let d = Document::new(DocumentId::new("a.html"), "html", text);
        let positions: Vec<UnitPosition> =
            extract_blocks(&d).into_iter().map(|u| u.position).collect();
        assert_eq!(positions, vec![UnitPosition::Block { start: 2, end: 4 }]);
    }

    #[test]
    fn test_keyword_needs_word_boundary() {
        assert!(is_block_introducer("if (x)"));
        assert!(is_block_introducer("else"));
        assert!(!is_block_introducer("iffy = 3;"));
        assert!(is_block_introducer("items.map(x => { return x; })"));
    }
}
