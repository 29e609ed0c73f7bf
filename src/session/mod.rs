//! Session controller.
//!
//! A [`Session`] wires commands and editor events to the extract, client and
//! render stages. It owns all mutable state for one editor session:
//! - the explanation client and its cache
//! - the hint store and annotation tracker
//! - the target language and auto-interpret state
//! - the debounced refresh schedule
//!
//! Every operation takes `&mut self`, so operations never overlap.

mod host;

pub use host::{EditorHost, NoticeLevel, SessionState};

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::client::{ExplanationClient, ExplanationResult, Outcome, Transport};
use crate::config::Settings;
use crate::document::{Document, DocumentId, LineRange};
use crate::extract::{
    extract_auto, extract_blocks, extract_line, extract_lines, extract_selections, CodeUnit,
};
use crate::language::TargetLanguage;
use crate::render::{plan_comment_edits, AnnotationTracker, CommentLayout, HintStore, InlayHint};

/// Tunables taken from [`Settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Most lines explained per auto-interpret refresh
    pub auto_line_limit: usize,
    /// Quiet period after an edit before a refresh runs
    pub debounce: Duration,
    /// Comment width for the wrapped layout
    pub wrap_width: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for SessionOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            auto_line_limit: settings.auto_line_limit,
            debounce: settings.debounce(),
            wrap_width: settings.wrap_width,
        }
    }
}

/// User-invocable commands. Document commands act on the active document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Comment every qualifying line covered by the selections
    InterpretSelection(Vec<LineRange>),
    /// Comment every qualifying line of the file
    InterpretFile { wrapped: bool },
    /// Comment each brace-delimited block after its closing line
    InterpretBlocks,
    /// Explain one line as a notification
    InterpretLine(usize),
    ToggleAutoInterpret,
    ToggleClickInterpret,
}

/// What a command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Report {
    /// Units sent for explanation
    pub interpreted: usize,
    /// Units that came back as errors
    pub failed: usize,
}

impl Report {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// One editor session.
pub struct Session<T: Transport, H: EditorHost> {
    client: ExplanationClient<T>,
    host: H,
    hints: HintStore,
    annotations: AnnotationTracker,
    language: TargetLanguage,
    state: SessionState,
    click_interpret: bool,
    options: SessionOptions,
    pending: HashMap<DocumentId, Instant>,
    /// Document text at the last repaint nudge
    repainted: HashMap<DocumentId, Vec<String>>,
}

impl<T: Transport, H: EditorHost> Session<T, H> {
    pub fn new(
        client: ExplanationClient<T>,
        host: H,
        language: TargetLanguage,
        options: SessionOptions,
    ) -> Self {
        Self {
            client,
            host,
            hints: HintStore::new(),
            annotations: AnnotationTracker::new(),
            language,
            state: SessionState::Disabled,
            click_interpret: false,
            options,
            pending: HashMap::new(),
            repainted: HashMap::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn language(&self) -> TargetLanguage {
        self.language
    }

    pub fn click_interpret(&self) -> bool {
        self.click_interpret
    }

    pub fn client(&self) -> &ExplanationClient<T> {
        &self.client
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn hints(&self) -> &HintStore {
        &self.hints
    }

    pub fn annotations(&self) -> &AnnotationTracker {
        &self.annotations
    }

    /// Run a command and report a summary notification.
    pub async fn execute(&mut self, command: Command) -> anyhow::Result<Report> {
        debug!(?command, "executing command");
        match command {
            Command::InterpretSelection(selections) => {
                let Some(doc) = self.require_active_document() else {
                    return Ok(Report::default());
                };
                let units = extract_selections(&doc, &selections);
                self.annotate_lines(&doc, units, CommentLayout::Single).await
            }
            Command::InterpretFile { wrapped } => {
                let Some(doc) = self.require_active_document() else {
                    return Ok(Report::default());
                };
                let layout = if wrapped {
                    CommentLayout::Wrapped {
                        width: self.options.wrap_width,
                    }
                } else {
                    CommentLayout::Single
                };
                let units = extract_lines(&doc);
                self.annotate_lines(&doc, units, layout).await
            }
            Command::InterpretBlocks => {
                let Some(doc) = self.require_active_document() else {
                    return Ok(Report::default());
                };
                self.annotate_blocks(&doc).await
            }
            Command::InterpretLine(line) => {
                let Some(doc) = self.require_active_document() else {
                    return Ok(Report::default());
                };
                match extract_line(&doc, line) {
                    Some(unit) => {
                        let ok = self.explain_to_notification(&unit).await;
                        Ok(Report {
                            interpreted: 1,
                            failed: usize::from(!ok),
                        })
                    }
                    None => {
                        self.host.notify(
                            NoticeLevel::Warning,
                            &format!("Line {} has no code to interpret", line + 1),
                        );
                        Ok(Report::default())
                    }
                }
            }
            Command::ToggleAutoInterpret => {
                self.toggle_auto_interpret().await?;
                Ok(Report::default())
            }
            Command::ToggleClickInterpret => {
                self.toggle_click_interpret();
                Ok(Report::default())
            }
        }
    }

    /// Switch between Disabled and AutoInterpreting.
    pub async fn toggle_auto_interpret(&mut self) -> anyhow::Result<SessionState> {
        match self.state {
            SessionState::Disabled => {
                self.state = SessionState::AutoInterpreting;
                info!("auto-interpret enabled");
                self.host.set_hint_provider(true);
                self.host.set_status(self.state);
                if let Some(doc) = self.host.active_document() {
                    self.refresh_hints(&doc).await?;
                }
            }
            SessionState::AutoInterpreting => {
                self.state = SessionState::Disabled;
                info!("auto-interpret disabled");
                self.host.set_hint_provider(false);
                self.client.cache_mut().clear();
                self.hints.clear();
                self.pending.clear();
                self.repainted.clear();
                self.host.set_status(self.state);
                if let Some(doc) = self.host.active_document() {
                    self.host.request_repaint(&doc.id)?;
                }
            }
        }
        Ok(self.state)
    }

    /// Flip the click-to-interpret sub-mode. Returns the new setting.
    pub fn toggle_click_interpret(&mut self) -> bool {
        self.click_interpret = !self.click_interpret;
        let message = if self.click_interpret {
            "Click-to-interpret enabled"
        } else {
            "Click-to-interpret disabled"
        };
        info!(enabled = self.click_interpret, "click-to-interpret toggled");
        self.host.notify(NoticeLevel::Info, message);
        self.click_interpret
    }

    /// React to an edit of `edited` lines in a document.
    ///
    /// While auto-interpreting, stale cache and hint entries are dropped and a
    /// refresh is scheduled `debounce` after `now`. A pending refresh for the
    /// same document is pushed back.
    ///
    /// Changes that leave the text as it was at the last repaint nudge are the
    /// nudge's own insert and delete coming back from the host; they are ignored.
    pub fn on_document_change(&mut self, id: &DocumentId, edited: &BTreeSet<usize>, now: Instant) {
        if let Some(doc) = self.host.document(id) {
            if self
                .repainted
                .get(id)
                .is_some_and(|lines| lines.as_slice() == doc.lines())
            {
                debug!(doc = %id, "ignoring repaint echo");
                return;
            }
            self.annotations.refresh(&doc);
        }
        self.repainted.remove(id);
        if !self.state.is_auto() || edited.is_empty() {
            return;
        }

        let pruned = self.client.cache_mut().prune_lines(edited);
        let dropped = self.hints.invalidate_lines(id, edited);
        debug!(doc = %id, edited = edited.len(), pruned, dropped, "document changed");

        self.pending.insert(id.clone(), now + self.options.debounce);
    }

    /// The target language setting changed.
    pub fn on_language_changed(&mut self, language: TargetLanguage, now: Instant) {
        info!(from = %self.language, to = %language, "target language changed");
        self.language = language;
        self.client.cache_mut().clear();

        if self.state.is_auto() {
            if let Some(doc) = self.host.active_document() {
                self.pending.insert(doc.id, now + self.options.debounce);
            }
        }
    }

    /// The cursor moved to `line` of the active document.
    pub async fn on_cursor_moved(&mut self, line: usize) {
        if !self.click_interpret {
            return;
        }
        let Some(unit) = self
            .host
            .active_document()
            .and_then(|doc| extract_line(&doc, line))
        else {
            return;
        };
        self.explain_to_notification(&unit).await;
    }

    /// A document was closed.
    pub fn on_document_closed(&mut self, id: &DocumentId) {
        self.hints.remove_document(id);
        self.annotations.forget(id);
        self.pending.remove(id);
        self.repainted.remove(id);
    }

    /// When the earliest scheduled refresh is due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Run every refresh whose deadline has passed. Returns how many ran.
    pub async fn run_due(&mut self, now: Instant) -> anyhow::Result<usize> {
        let mut due: Vec<(Instant, DocumentId)> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, deadline)| (*deadline, id.clone()))
            .collect();
        due.sort();

        let mut ran = 0;
        for (_, id) in due {
            self.pending.remove(&id);
            if !self.state.is_auto() {
                continue;
            }
            match self.host.document(&id) {
                Some(doc) => {
                    self.refresh_hints(&doc).await?;
                    ran += 1;
                }
                None => debug!(doc = %id, "scheduled document is gone"),
            }
        }
        Ok(ran)
    }

    /// Re-explain a document and store the results as hints.
    ///
    /// Lines that already carry a comment explanation are skipped.
    pub async fn refresh_hints(&mut self, doc: &Document) -> anyhow::Result<usize> {
        self.annotations.refresh(doc);
        let units: Vec<CodeUnit> = extract_auto(doc, self.options.auto_line_limit)
            .into_iter()
            .filter(|unit| !self.annotations.is_annotated(&doc.id, unit.position.anchor_line()))
            .collect();

        let results = self.interpret(&units).await;
        self.hints.replace_document(&doc.id, &results);
        self.repaint(doc)?;
        Ok(results.len())
    }

    /// Hints for the visible `range` of a document; none unless auto-interpreting.
    pub fn provide_hints(&self, doc: &Document, range: LineRange) -> Vec<InlayHint> {
        if !self.state.is_auto() {
            return Vec::new();
        }
        self.hints.provide_hints(doc, range)
    }

    fn repaint(&mut self, doc: &Document) -> anyhow::Result<()> {
        self.repainted.insert(doc.id.clone(), doc.lines().to_vec());
        self.host.request_repaint(&doc.id)
    }

    fn require_active_document(&mut self) -> Option<Document> {
        let doc = self.host.active_document();
        if doc.is_none() {
            self.host.notify(NoticeLevel::Warning, "No active document");
        }
        doc
    }

    async fn interpret(&mut self, units: &[CodeUnit]) -> Vec<ExplanationResult> {
        if units.is_empty() {
            return Vec::new();
        }
        let message = format!("Interpreting {} lines", units.len());
        self.host.progress(Some(&message));
        let results = self.client.interpret_units(units, self.language).await;
        self.host.progress(None);
        results
    }

    async fn annotate_lines(
        &mut self,
        doc: &Document,
        units: Vec<CodeUnit>,
        layout: CommentLayout,
    ) -> anyhow::Result<Report> {
        if units.is_empty() {
            self.host
                .notify(NoticeLevel::Warning, "No interpretable lines found");
            return Ok(Report::default());
        }

        let results = self.interpret(&units).await;
        self.write_comments(doc, &results, layout)?;
        Ok(self.report(&results, "line"))
    }

    async fn annotate_blocks(&mut self, doc: &Document) -> anyhow::Result<Report> {
        let units = extract_blocks(doc);
        if units.is_empty() {
            self.host
                .notify(NoticeLevel::Warning, "No interpretable lines found");
            return Ok(Report::default());
        }

        // One request per block, in document order
        let mut results = Vec::with_capacity(units.len());
        for (i, unit) in units.iter().enumerate() {
            let message = format!("Interpreting block {} of {}", i + 1, units.len());
            self.host.progress(Some(&message));
            let outcome = match self.client.interpret_one(&unit.text, self.language).await {
                Ok(text) => Outcome::Explanation(text),
                Err(err) => {
                    warn!(position = %unit.position, error = %err, "block explanation failed");
                    Outcome::Error(err.display_text())
                }
            };
            results.push(ExplanationResult {
                position: unit.position,
                outcome,
            });
        }
        self.host.progress(None);

        self.write_comments(doc, &results, CommentLayout::Single)?;
        Ok(self.report(&results, "block"))
    }

    fn write_comments(
        &mut self,
        doc: &Document,
        results: &[ExplanationResult],
        layout: CommentLayout,
    ) -> anyhow::Result<()> {
        let tx = plan_comment_edits(doc, results, layout);
        if tx.is_empty() {
            return Ok(());
        }
        self.host.apply_edits(&doc.id, &tx)?;
        if let Some(updated) = self.host.document(&doc.id) {
            self.annotations.refresh(&updated);
        }
        Ok(())
    }

    /// Explain one unit as a notification. Returns whether it succeeded.
    async fn explain_to_notification(&mut self, unit: &CodeUnit) -> bool {
        self.host.progress(Some("Interpreting line"));
        let outcome = self.client.interpret_one(&unit.text, self.language).await;
        self.host.progress(None);

        match outcome {
            Ok(text) => {
                self.host.notify(
                    NoticeLevel::Info,
                    &format!("Line {}: {}", unit.position.first_line() + 1, text),
                );
                true
            }
            Err(err) => {
                warn!(position = %unit.position, error = %err, "line explanation failed");
                self.host.notify(NoticeLevel::Error, &err.display_text());
                false
            }
        }
    }

    fn report(&mut self, results: &[ExplanationResult], noun: &str) -> Report {
        let failed = results.iter().filter(|r| r.outcome.is_error()).count();
        let plural = if results.len() == 1 { "" } else { "s" };
        if failed == 0 {
            self.host.notify(
                NoticeLevel::Info,
                &format!("Interpreted {} {}{}", results.len(), noun, plural),
            );
        } else {
            self.host.notify(
                NoticeLevel::Warning,
                &format!(
                    "Interpreted {} {}{} ({} failed)",
                    results.len(),
                    noun,
                    plural,
                    failed
                ),
            );
        }
        Report {
            interpreted: results.len(),
            failed,
        }
    }
}
