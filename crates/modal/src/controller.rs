//! Modal controller
//!
//! State machine for the search dialog:
//!
//! ```text
//! Closed --Ctrl/Cmd+K, label click, open()--> Open
//! Open   --Escape, backdrop click, result activation--> Closed
//! ```
//!
//! Opening starts engine initialization the first time. Every input change
//! re-derives the query and runs one synchronous search, replacing the view.
//! Searches before the engine is ready never reach the module; the view shows
//! the loading placeholder instead, and [`ModalController::on_engine_settled`]
//! re-runs whatever the input holds once loading finishes.
//!
//! Each search takes a ticket. A completion is rendered only if its ticket is
//! the latest issued, so a slow result can never overwrite a newer one.

use crate::keys::{Key, KeyEvent, KeyOutcome};
use crate::launcher::{EngineEvent, InitLauncher};
use crate::view::{ResultsView, LOAD_ERROR_MESSAGE};
use sift_core::Readiness;
use sift_engine::EngineHandle;
use sift_search::{Query, QueryProtocol, TokenEditor};
use std::sync::Arc;

/// Whether the dialog is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModalState {
    /// Hidden
    #[default]
    Closed,
    /// Shown with the input focused
    Open,
}

/// Sequence number of an issued search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SearchTicket(u64);

/// Headless controller for the search modal.
pub struct ModalController {
    state: ModalState,
    engine: Arc<EngineHandle>,
    launcher: Box<dyn InitLauncher>,
    editor: TokenEditor,
    view: ResultsView,
    focused: bool,
    selected: Option<usize>,
    latest_ticket: u64,
}

impl ModalController {
    /// Controller with a fresh, unloaded engine.
    pub fn new(launcher: Box<dyn InitLauncher>) -> Self {
        Self::with_engine(Arc::new(EngineHandle::new()), launcher)
    }

    /// Controller over an existing engine handle.
    pub fn with_engine(engine: Arc<EngineHandle>, launcher: Box<dyn InitLauncher>) -> Self {
        ModalController {
            state: ModalState::Closed,
            engine,
            launcher,
            editor: TokenEditor::new(),
            view: ResultsView::Empty,
            focused: false,
            selected: None,
            latest_ticket: 0,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Open or closed.
    pub fn state(&self) -> ModalState {
        self.state
    }

    /// True while the dialog is shown.
    pub fn is_open(&self) -> bool {
        self.state == ModalState::Open
    }

    /// Whether the input has focus.
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// The engine searches go to.
    pub fn engine(&self) -> &Arc<EngineHandle> {
        &self.engine
    }

    /// Engine readiness.
    pub fn readiness(&self) -> Readiness {
        self.engine.readiness()
    }

    /// The search input.
    pub fn editor(&self) -> &TokenEditor {
        &self.editor
    }

    /// Current input text.
    pub fn input_text(&self) -> String {
        self.editor.text()
    }

    /// What the result area shows.
    pub fn view(&self) -> &ResultsView {
        &self.view
    }

    /// Index of the keyboard-selected result.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    // ========================================================================
    // Open / close
    // ========================================================================

    /// Show the dialog and focus the input. Starts initialization if the
    /// engine has not been started. Returns whether the state changed.
    pub fn open(&mut self) -> bool {
        self.focused = true;
        if self.is_open() {
            return false;
        }
        self.state = ModalState::Open;
        tracing::debug!(target: "sift::modal", readiness = %self.readiness(), "Modal opened");
        self.ensure_started();
        true
    }

    /// Hide the dialog, clearing the input and the results. Returns whether
    /// the state changed.
    pub fn close(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }
        self.state = ModalState::Closed;
        self.focused = false;
        self.editor.clear();
        self.view = ResultsView::Empty;
        self.selected = None;
        tracing::debug!(target: "sift::modal", "Modal closed");
        true
    }

    /// Click on the shortcut hint label.
    pub fn click_shortcut_label(&mut self) -> bool {
        self.open()
    }

    /// Click outside the dialog.
    pub fn click_backdrop(&mut self) -> bool {
        self.close()
    }

    /// Launch loading on first use; an engine that has already settled is
    /// rendered as such, so a failed load shows its error on every open.
    fn ensure_started(&mut self) {
        if self.readiness() == Readiness::NotReady {
            tracing::info!(target: "sift::modal", "Starting search engine initialization");
            self.launcher.launch(Arc::clone(&self.engine));
        }
        if self.readiness().is_settled() {
            self.on_engine_settled();
        }
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Feed a key press.
    pub fn handle_key(&mut self, event: KeyEvent) -> KeyOutcome {
        if event.is_open_shortcut() {
            return if self.open() {
                KeyOutcome::Opened
            } else {
                KeyOutcome::Ignored
            };
        }
        if !self.is_open() {
            return KeyOutcome::Ignored;
        }

        match event.key {
            Key::Escape => {
                self.close();
                KeyOutcome::Closed
            }
            Key::Char(_) if event.modifiers.is_command() => KeyOutcome::Ignored,
            Key::Char(c) => self.edited(|editor| editor.insert_char(c)),
            Key::Backspace => self.edited(|editor| editor.backspace() > 0),
            Key::Delete => self.edited(TokenEditor::delete_forward),
            Key::Left => self.moved(TokenEditor::move_left),
            Key::Right => self.moved(TokenEditor::move_right),
            Key::Home => self.moved(TokenEditor::move_home),
            Key::End => self.moved(TokenEditor::move_end),
            Key::Up => self.select_step(false),
            Key::Down => self.select_step(true),
            Key::Enter => match self.selected.or_else(|| self.first_result()) {
                Some(index) => self
                    .activate_result(index)
                    .map_or(KeyOutcome::Ignored, KeyOutcome::Activated),
                None => KeyOutcome::Ignored,
            },
        }
    }

    fn edited(&mut self, edit: impl FnOnce(&mut TokenEditor) -> bool) -> KeyOutcome {
        if edit(&mut self.editor) {
            self.search();
            KeyOutcome::Edited
        } else {
            KeyOutcome::Ignored
        }
    }

    fn moved(&mut self, movement: impl FnOnce(&mut TokenEditor)) -> KeyOutcome {
        movement(&mut self.editor);
        KeyOutcome::Moved
    }

    fn first_result(&self) -> Option<usize> {
        (!self.view.items().is_empty()).then_some(0)
    }

    fn select_step(&mut self, forward: bool) -> KeyOutcome {
        let count = self.view.items().len();
        if count == 0 {
            return KeyOutcome::Ignored;
        }
        self.selected = Some(match (self.selected, forward) {
            (None, true) => 0,
            (None, false) => count - 1,
            (Some(i), true) => (i + 1) % count,
            (Some(i), false) => (i + count - 1) % count,
        });
        KeyOutcome::Moved
    }

    /// Replace the whole input (paste, or a line-based front end) and search.
    pub fn set_input(&mut self, text: &str) {
        self.editor.set_text(text);
        self.search();
    }

    /// Click on result `index`: closes the dialog and returns the link to
    /// navigate to (`"#"` when the result has none).
    pub fn activate_result(&mut self, index: usize) -> Option<String> {
        let link = self.view.items().get(index)?.href().to_string();
        tracing::debug!(target: "sift::modal", index, link = %link, "Result activated");
        self.close();
        Some(link)
    }

    // ========================================================================
    // Searching
    // ========================================================================

    /// Search for the current input and render the outcome.
    pub fn search(&mut self) {
        let ticket = self.begin_search();
        let query = self.editor.query();
        let view = self.run(&query);
        self.complete_search(ticket, view);
    }

    fn run(&self, query: &Query) -> ResultsView {
        if query.is_empty() {
            return ResultsView::Empty;
        }
        match self.readiness() {
            Readiness::NotReady | Readiness::Loading => ResultsView::Loading,
            Readiness::Failed => ResultsView::error(LOAD_ERROR_MESSAGE),
            Readiness::Ready => {
                ResultsView::from_outcome(query, QueryProtocol::new(&self.engine).search(query))
            }
        }
    }

    /// Take the next ticket.
    pub fn begin_search(&mut self) -> SearchTicket {
        self.latest_ticket += 1;
        SearchTicket(self.latest_ticket)
    }

    /// Render `view` if `ticket` is still the latest. Returns whether it was
    /// rendered.
    pub fn complete_search(&mut self, ticket: SearchTicket, view: ResultsView) -> bool {
        if ticket.0 != self.latest_ticket {
            tracing::debug!(
                target: "sift::modal",
                ticket = ticket.0,
                latest = self.latest_ticket,
                "Dropping stale search result"
            );
            return false;
        }
        self.view = view;
        self.selected = None;
        true
    }

    // ========================================================================
    // Engine events
    // ========================================================================

    /// Initialization finished. Re-runs the input present now if the engine
    /// is ready, or shows the load error if it failed.
    pub fn on_engine_settled(&mut self) {
        match self.readiness() {
            Readiness::Ready => {
                if self.is_open() && !self.editor.query().is_empty() {
                    tracing::debug!(target: "sift::modal", "Re-running pending query");
                    self.search();
                }
            }
            Readiness::Failed => {
                if self.is_open() {
                    let ticket = self.begin_search();
                    self.complete_search(ticket, ResultsView::error(LOAD_ERROR_MESSAGE));
                }
            }
            Readiness::NotReady | Readiness::Loading => {}
        }
    }

    /// Handle a launcher notification.
    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Settled(readiness) => {
                tracing::debug!(target: "sift::modal", readiness = %readiness, "Engine settled");
                self.on_engine_settled();
            }
        }
    }

    /// Throw away a failed engine and start over with a fresh one. Returns
    /// false unless the current engine has failed.
    pub fn retry_initialization(&mut self) -> bool {
        if self.readiness() != Readiness::Failed {
            return false;
        }
        tracing::info!(target: "sift::modal", "Retrying search engine initialization");
        self.engine = Arc::new(EngineHandle::new());
        if self.is_open() {
            self.search();
            self.ensure_started();
        }
        true
    }
}
