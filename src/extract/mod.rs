//! Code-unit extraction.
//!
//! Decides which parts of a document are worth explaining:
//! - `lines`: one unit per qualifying line (whole file, selections, auto mode)
//! - `blocks`: one unit per top-level brace-delimited block

mod blocks;
mod lines;

pub use blocks::{extract_blocks, BlockScanner};
pub use lines::{
    extract_auto, extract_line, extract_lines, extract_selections, is_interpretable,
    COMMENT_MARKERS,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a unit sits in its document (0-based line indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitPosition {
    Line(usize),
    /// Inclusive span from the block's introducing line to its closing brace
    Block { start: usize, end: usize },
}

impl UnitPosition {
    pub fn first_line(&self) -> usize {
        match *self {
            UnitPosition::Line(line) => line,
            UnitPosition::Block { start, .. } => start,
        }
    }

    /// The line an explanation is attached below.
    pub fn anchor_line(&self) -> usize {
        match *self {
            UnitPosition::Line(line) => line,
            UnitPosition::Block { end, .. } => end,
        }
    }

    /// Every line the unit covers.
    pub fn lines(&self) -> std::ops::RangeInclusive<usize> {
        match *self {
            UnitPosition::Line(line) => line..=line,
            UnitPosition::Block { start, end } => start..=end,
        }
    }
}

impl fmt::Display for UnitPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitPosition::Line(line) => write!(f, "line {}", line + 1),
            UnitPosition::Block { start, end } => write!(f, "lines {}-{}", start + 1, end + 1),
        }
    }
}

/// A line or block selected for explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeUnit {
    pub position: UnitPosition,
    /// Trimmed line text, or the full untrimmed span for blocks
    pub text: String,
}

impl CodeUnit {
    pub fn line(line: usize, text: impl Into<String>) -> Self {
        Self {
            position: UnitPosition::Line(line),
            text: text.into(),
        }
    }

    pub fn block(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            position: UnitPosition::Block { start, end },
            text: text.into(),
        }
    }
}
