//! Session wrapper around the modal controller.
//!
//! The terminal front end keeps one modal open for the whole session. The
//! engine loads on a background thread; a line entered before it is ready
//! waits for the settle event and is then re-run by the controller.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use sift_core::{DocumentId, Readiness, SiftResult};
use sift_engine::EngineLoader;
use sift_modal::{EngineEvent, ModalController, ResultsView, ThreadLauncher};
use sift_search::QueryProtocol;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Controller, engine events and the wait budget for loading.
pub struct SessionState {
    controller: ModalController,
    events: Receiver<EngineEvent>,
    settle_timeout: Duration,
}

impl SessionState {
    /// Start a session: opens the modal, which starts loading in the background.
    pub fn new(loader: EngineLoader, settle_timeout: Duration) -> Self {
        let (launcher, events) = ThreadLauncher::new(loader);
        Self::from_parts(
            ModalController::new(Box::new(launcher)),
            events,
            settle_timeout,
        )
    }

    /// Wrap an existing controller and the receiver its launcher reports to.
    pub fn from_parts(
        mut controller: ModalController,
        events: Receiver<EngineEvent>,
        settle_timeout: Duration,
    ) -> Self {
        controller.open();
        Self {
            controller,
            events,
            settle_timeout,
        }
    }

    /// The underlying controller.
    pub fn controller(&self) -> &ModalController {
        &self.controller
    }

    /// Apply any settle events that arrived since the last call.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.controller.handle_event(event);
        }
    }

    /// Block until loading settles or the timeout passes. Returns the
    /// readiness at that point.
    ///
    /// The handle settles before its event is sent, so a loading placeholder
    /// still on screen once settled is re-rendered here rather than left for
    /// the queued event.
    pub fn wait_settled(&mut self) -> Readiness {
        self.drain_events();
        let deadline = Instant::now() + self.settle_timeout;
        while !self.controller.readiness().is_settled() {
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(
                    target: "sift::cli",
                    timeout_ms = self.settle_timeout.as_millis() as u64,
                    "Gave up waiting for the search engine"
                );
                break;
            }
            match self.events.recv_timeout(POLL_INTERVAL.min(deadline - now)) {
                Ok(event) => self.controller.handle_event(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        let readiness = self.controller.readiness();
        if readiness.is_settled() && self.controller.view() == &ResultsView::Loading {
            self.controller.on_engine_settled();
        }
        readiness
    }

    /// Replace the input with `line` and return the rendered view. Waits
    /// out the loading placeholder.
    pub fn query(&mut self, line: &str) -> &ResultsView {
        self.drain_events();
        self.controller.open();
        self.controller.set_input(line);
        if self.controller.view() == &ResultsView::Loading {
            self.wait_settled();
        }
        self.controller.view()
    }

    /// Follow result `index` (0-based). The modal reopens afterwards so the
    /// session can keep searching.
    pub fn open_result(&mut self, index: usize) -> Option<String> {
        let link = self.controller.activate_result(index)?;
        self.controller.open();
        Some(link)
    }

    /// Full text of a document.
    pub fn document(&mut self, id: DocumentId) -> SiftResult<Option<String>> {
        self.wait_settled();
        QueryProtocol::new(self.controller.engine()).get_document(id)
    }

    /// Start over after a failed load. Returns false if the engine has not failed.
    pub fn retry(&mut self) -> bool {
        self.drain_events();
        self.controller.open();
        self.controller.retry_initialization()
    }

    /// One-line engine summary.
    pub fn status(&self) -> String {
        let engine = self.controller.engine();
        match (engine.readiness(), engine.failure()) {
            (Readiness::Ready, _) => format!(
                "ready ({} mapped documents)",
                engine.document_count().unwrap_or(0)
            ),
            (Readiness::Failed, Some(reason)) => format!("failed: {}", reason),
            (readiness, _) => readiness.to_string(),
        }
    }

    /// Generate the REPL prompt string.
    pub fn prompt(&self) -> String {
        match self.controller.readiness() {
            Readiness::Ready => "sift> ".to_string(),
            readiness => format!("sift({})> ", readiness),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_engine::testing::{sample_source, MockBehavior, MockRuntime};
    use sift_engine::{AssetPaths, EngineHandle};
    use sift_modal::InitLauncher;
    use std::sync::mpsc;
    use std::sync::Arc;

    /// Leaves loading to the test.
    struct IdleLauncher;

    impl InitLauncher for IdleLauncher {
        fn launch(&self, _engine: Arc<EngineHandle>) {}
    }

    fn sample_loader() -> EngineLoader {
        EngineLoader::new(
            Arc::new(sample_source()),
            Arc::new(MockRuntime::new(MockBehavior::default())),
            AssetPaths::default(),
        )
    }

    fn session(source: sift_engine::testing::MemorySource) -> SessionState {
        let loader = EngineLoader::new(
            Arc::new(source),
            Arc::new(MockRuntime::new(MockBehavior::default())),
            AssetPaths::default(),
        );
        SessionState::new(loader, Duration::from_secs(5))
    }

    #[test]
    fn query_waits_for_engine() {
        let mut state = session(sample_source());
        let ids: Vec<u32> = state
            .query("rust server")
            .items()
            .iter()
            .map(|r| r.document_id)
            .collect();
        assert_eq!(ids, vec![2, 4]);
        assert_eq!(state.prompt(), "sift> ");
        assert!(state.status().starts_with("ready"));
    }

    #[test]
    fn settled_before_event_still_renders_results() {
        let engine = Arc::new(EngineHandle::new());
        let mut controller =
            ModalController::with_engine(Arc::clone(&engine), Box::new(IdleLauncher));
        controller.open();
        controller.set_input("rust server");
        assert_eq!(controller.view(), &ResultsView::Loading);

        // Engine is ready but its settle event has not been delivered yet
        sample_loader().load(&engine).unwrap();
        let (_events_tx, events) = mpsc::channel::<EngineEvent>();
        let mut state = SessionState::from_parts(controller, events, Duration::from_secs(5));

        assert_eq!(state.wait_settled(), Readiness::Ready);
        let ids: Vec<u32> = state
            .controller()
            .view()
            .items()
            .iter()
            .map(|r| r.document_id)
            .collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn settled_failure_before_event_renders_error() {
        let engine = Arc::new(EngineHandle::new());
        let mut controller =
            ModalController::with_engine(Arc::clone(&engine), Box::new(IdleLauncher));
        controller.open();
        controller.set_input("rust");
        assert_eq!(controller.view(), &ResultsView::Loading);

        let loader = EngineLoader::new(
            Arc::new(sample_source().without("wasm/search-index.bin")),
            Arc::new(MockRuntime::new(MockBehavior::default())),
            AssetPaths::default(),
        );
        assert!(loader.load(&engine).is_err());
        let (_events_tx, events) = mpsc::channel::<EngineEvent>();
        let mut state = SessionState::from_parts(controller, events, Duration::from_secs(5));

        assert_eq!(state.wait_settled(), Readiness::Failed);
        assert!(matches!(state.controller().view(), ResultsView::Error { .. }));
    }

    #[test]
    fn open_result_keeps_session_open() {
        let mut state = session(sample_source());
        state.query("lifetimes");
        assert_eq!(
            state.open_result(0).as_deref(),
            Some("posts/rust-lifetimes/post.html")
        );
        assert!(state.controller().is_open());
        assert_eq!(state.open_result(0), None);
    }

    #[test]
    fn failed_load_reports_and_retries() {
        let mut state = session(sample_source().without("wasm/docs-mapping.json"));
        assert_eq!(state.wait_settled(), Readiness::Failed);
        assert!(state.status().starts_with("failed"));
        assert_eq!(state.prompt(), "sift(failed)> ");
        assert!(state.retry());
        assert_eq!(state.wait_settled(), Readiness::Failed);
    }

    #[test]
    fn document_lookup() {
        let mut state = session(sample_source());
        assert!(state.document(3).unwrap().is_some());
    }
}
