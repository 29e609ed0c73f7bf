//! File-backed editor host for the terminal front end.
//!
//! The "editor" is a single file on disk. Edits are written back to the file
//! (or kept in memory when printing to stdout), notifications and the status
//! indicator go to stderr, and a spinner runs while a request is in flight.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::document::{Document, DocumentId, EditTransaction};
use crate::render::InlayHint;
use crate::session::{EditorHost, NoticeLevel, SessionState};

/// Where applied edits end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// Rewrite the file after every transaction
    WriteBack,
    /// Keep edits in memory; the caller prints the result
    Stdout,
}

/// An [`EditorHost`] over one file.
pub struct FileHost {
    path: PathBuf,
    doc: Document,
    output: Output,
    hint_provider: bool,
    repaint_requested: bool,
    spinner: Option<ProgressBar>,
    quiet: bool,
}

impl FileHost {
    /// Open `path` as the active document.
    pub fn open(path: &Path, output: Output) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
        Ok(Self {
            path: path.to_path_buf(),
            doc: Document::from_path(path, &text),
            output,
            hint_provider: false,
            repaint_requested: false,
            spinner: None,
            quiet: false,
        })
    }

    /// Suppress notifications, status and spinner output.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn id(&self) -> &DocumentId {
        &self.doc.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The in-memory document.
    pub fn current(&self) -> &Document {
        &self.doc
    }

    pub fn hint_provider(&self) -> bool {
        self.hint_provider
    }

    /// Whether a repaint was requested since the last call.
    pub fn take_repaint(&mut self) -> bool {
        std::mem::take(&mut self.repaint_requested)
    }

    /// Re-read the file. Returns the edited lines if its content changed.
    pub fn reload(&mut self) -> anyhow::Result<Option<BTreeSet<usize>>> {
        let text = fs::read_to_string(&self.path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", self.path.display(), e))?;
        if text == self.doc.text() {
            return Ok(None);
        }

        let updated = Document::from_path(&self.path, &text);
        let edited = changed_lines(self.doc.lines(), updated.lines());
        self.doc = updated;
        Ok(Some(edited))
    }
}

impl EditorHost for FileHost {
    fn active_document(&self) -> Option<Document> {
        Some(self.doc.clone())
    }

    fn document(&self, id: &DocumentId) -> Option<Document> {
        (id == &self.doc.id).then(|| self.doc.clone())
    }

    fn apply_edits(&mut self, id: &DocumentId, tx: &EditTransaction) -> anyhow::Result<()> {
        if id != &self.doc.id {
            anyhow::bail!("unknown document {}", id);
        }
        self.doc.apply(tx)?;

        if self.output == Output::WriteBack {
            fs::write(&self.path, self.doc.text())
                .map_err(|e| anyhow::anyhow!("cannot write {}: {}", self.path.display(), e))?;
        }
        Ok(())
    }

    fn notify(&mut self, level: NoticeLevel, message: &str) {
        if self.quiet {
            return;
        }
        let tag = match level {
            NoticeLevel::Info => "info".cyan().bold(),
            NoticeLevel::Warning => "warning".yellow().bold(),
            NoticeLevel::Error => "error".red().bold(),
        };
        self.suspend(|| eprintln!("{}: {}", tag, message));
    }

    fn set_status(&mut self, state: SessionState) {
        if self.quiet {
            return;
        }
        let label = match state {
            SessionState::Disabled => state.label().dimmed(),
            SessionState::AutoInterpreting => state.label().green().bold(),
        };
        self.suspend(|| eprintln!("[{}]", label));
    }

    fn set_hint_provider(&mut self, registered: bool) {
        self.hint_provider = registered;
    }

    fn progress(&mut self, message: Option<&str>) {
        if self.quiet {
            return;
        }
        match message {
            Some(message) => {
                let spinner = self.spinner.get_or_insert_with(|| {
                    let pb = ProgressBar::new_spinner();
                    pb.set_style(
                        ProgressStyle::with_template("{spinner:.cyan} {msg}")
                            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                    );
                    pb.enable_steady_tick(Duration::from_millis(100));
                    pb
                });
                spinner.set_message(message.to_string());
            }
            None => {
                if let Some(spinner) = self.spinner.take() {
                    spinner.finish_and_clear();
                }
            }
        }
    }

    /// Terminal hints are printed by the caller, so a repaint is only a flag.
    fn request_repaint(&mut self, _id: &DocumentId) -> anyhow::Result<()> {
        self.repaint_requested = true;
        Ok(())
    }
}

impl FileHost {
    /// Print around a running spinner without garbling it.
    fn suspend<F: FnOnce()>(&self, f: F) {
        match &self.spinner {
            Some(spinner) => spinner.suspend(f),
            None => f(),
        }
    }
}

/// Lines of `new` that differ from `old`, found by trimming the common
/// prefix and suffix. A pure deletion reports the line it happened at.
pub fn changed_lines(old: &[String], new: &[String]) -> BTreeSet<usize> {
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let end = new.len() - suffix;
    if prefix < end {
        (prefix..end).collect()
    } else if old.len() != new.len() {
        BTreeSet::from([prefix])
    } else {
        BTreeSet::new()
    }
}

/// Print hints as `  12 | code  💡 explanation`.
pub fn print_hints(doc: &Document, hints: &[InlayHint]) {
    let width = doc.line_count().to_string().len();
    for hint in hints {
        let code = doc.line(hint.line).unwrap_or_default();
        println!(
            "{:>width$} {} {}{}",
            (hint.line + 1).to_string().dimmed(),
            "|".dimmed(),
            code,
            hint.label.cyan(),
            width = width
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::LineEdit;
    use tempfile::TempDir;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_changed_lines() {
        assert!(changed_lines(&lines("a\nb"), &lines("a\nb")).is_empty());
        assert_eq!(
            changed_lines(&lines("a\nb\nc"), &lines("a\nB\nc")),
            BTreeSet::from([1])
        );
        // insertion
        assert_eq!(
            changed_lines(&lines("a\nc"), &lines("a\nb\nx\nc")),
            BTreeSet::from([1, 2])
        );
        // deletion
        assert_eq!(
            changed_lines(&lines("a\nb\nc"), &lines("a\nc")),
            BTreeSet::from([1])
        );
        // appended at end
        assert_eq!(changed_lines(&lines("a"), &lines("a\nb")), BTreeSet::from([1]));
    }

    #[test]
    fn test_changed_lines_repeated_content() {
        assert_eq!(
            changed_lines(&lines("x\nx"), &lines("x\nx\nx")),
            BTreeSet::from([2])
        );
    }

    #[test]
    fn test_write_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.py");
        fs::write(&path, "x = 1\n").unwrap();

        let mut host = FileHost::open(&path, Output::WriteBack).unwrap().quiet(true);
        assert_eq!(host.current().language_id, "python");

        let mut tx = EditTransaction::new();
        tx.push(LineEdit::insert(1, vec!["# 💡 Sets x".to_string()]));
        let id = host.id().clone();
        host.apply_edits(&id, &tx).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "x = 1\n# 💡 Sets x\n");
    }

    #[test]
    fn test_stdout_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.js");
        fs::write(&path, "a();\n").unwrap();

        let mut host = FileHost::open(&path, Output::Stdout).unwrap().quiet(true);
        let mut tx = EditTransaction::new();
        tx.push(LineEdit::insert(1, vec!["// 💡 Calls a".to_string()]));
        let id = host.id().clone();
        host.apply_edits(&id, &tx).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "a();\n");
        assert_eq!(host.current().text(), "a();\n// 💡 Calls a\n");
    }

    #[test]
    fn test_reload_reports_edited_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.js");
        fs::write(&path, "a();\nb();\n").unwrap();

        let mut host = FileHost::open(&path, Output::WriteBack).unwrap().quiet(true);
        assert_eq!(host.reload().unwrap(), None);

        fs::write(&path, "a();\nc();\n").unwrap();
        assert_eq!(host.reload().unwrap(), Some(BTreeSet::from([1])));
        assert_eq!(host.current().line(1), Some("c();"));
    }

    #[test]
    fn test_repaint_is_a_flag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.js");
        fs::write(&path, "a();\n").unwrap();

        let mut host = FileHost::open(&path, Output::WriteBack).unwrap().quiet(true);
        let id = host.id().clone();
        host.request_repaint(&id).unwrap();
        assert!(host.take_repaint());
        assert!(!host.take_repaint());
        assert_eq!(fs::read_to_string(&path).unwrap(), "a();\n");
    }

    #[test]
    fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(FileHost::open(&dir.path().join("nope.js"), Output::Stdout).is_err());
    }
}
