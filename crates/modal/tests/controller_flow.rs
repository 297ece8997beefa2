//! End-to-end controller flows against the mock module

use parking_lot::Mutex;
use sift_core::{Readiness, SiftResult};
use sift_engine::testing::{sample_source, MemorySource, MockBehavior, MockRuntime, StatsHandle};
use sift_engine::{AssetPaths, AssetSource, EngineLoader};
use sift_modal::{
    EngineEvent, InlineLauncher, Key, KeyEvent, KeyOutcome, ModalController, ResultsView,
    ThreadLauncher, LOADING_MESSAGE, LOAD_ERROR_MESSAGE, NO_RESULTS_MESSAGE,
    SEARCH_ERROR_MESSAGE,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// Helpers
// ============================================================================

fn inline(
    source: impl AssetSource + 'static,
    behavior: MockBehavior,
) -> (ModalController, StatsHandle) {
    let runtime = MockRuntime::new(behavior);
    let stats = runtime.stats();
    let loader = EngineLoader::new(Arc::new(source), Arc::new(runtime), AssetPaths::default());
    (
        ModalController::new(Box::new(InlineLauncher::new(loader))),
        stats,
    )
}

fn type_text(controller: &mut ModalController, text: &str) {
    for c in text.chars() {
        controller.handle_key(Key::Char(c).into());
    }
}

/// Blocks the module fetch until released.
struct GatedSource {
    inner: MemorySource,
    gate: Mutex<Receiver<()>>,
}

impl GatedSource {
    fn new(inner: MemorySource) -> (Self, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (
            GatedSource {
                inner,
                gate: Mutex::new(rx),
            },
            tx,
        )
    }
}

impl AssetSource for GatedSource {
    fn fetch(&self, path: &str) -> SiftResult<Vec<u8>> {
        if path == AssetPaths::default().module {
            let _ = self.gate.lock().recv();
        }
        self.inner.fetch(path)
    }

    fn describe(&self, path: &str) -> String {
        self.inner.describe(path)
    }
}

/// Serves no mapping until `healed` is set.
struct FlakySource {
    inner: MemorySource,
    healed: Arc<AtomicBool>,
}

impl AssetSource for FlakySource {
    fn fetch(&self, path: &str) -> SiftResult<Vec<u8>> {
        if path == AssetPaths::default().mapping && !self.healed.load(Ordering::SeqCst) {
            return Err(sift_core::SiftError::fetch(path, "503 service unavailable"));
        }
        self.inner.fetch(path)
    }

    fn describe(&self, path: &str) -> String {
        self.inner.describe(path)
    }
}

fn wait_for(controller: &ModalController, readiness: Readiness) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while controller.readiness() != readiness {
        assert!(Instant::now() < deadline, "timed out waiting for {}", readiness);
        thread::sleep(Duration::from_millis(1));
    }
}

// ============================================================================
// Searching
// ============================================================================

#[test]
fn typing_rust_server_shows_http_post() {
    let (mut controller, stats) = inline(sample_source(), MockBehavior::default());
    assert_eq!(controller.handle_key(KeyEvent::ctrl('k')), KeyOutcome::Opened);
    type_text(&mut controller, "rust server");

    assert_eq!(controller.input_text(), "rust ∧ server");
    let view = controller.view();
    assert_eq!(view.header(), Some("rust ∧ server"));
    let first = &view.items()[0];
    assert_eq!(first.document_id, 2);
    assert_eq!(first.title.as_deref(), Some("Mini http/1.1 server (in rust)"));
    assert_eq!(first.link.as_deref(), Some("posts/http-server-rust/post.html"));
    assert!(stats.snapshot().is_balanced());
}

#[test]
fn every_keystroke_searches() {
    let (mut controller, stats) = inline(sample_source(), MockBehavior::default());
    controller.open();
    type_text(&mut controller, "rust");
    assert_eq!(stats.snapshot().search_calls, 4);
}

#[test]
fn clearing_input_skips_module() {
    let (mut controller, stats) = inline(sample_source(), MockBehavior::default());
    controller.open();
    controller.set_input("rust");
    assert!(!controller.view().items().is_empty());

    for _ in 0..3 {
        controller.handle_key(Key::Backspace.into());
    }
    assert_eq!(controller.input_text(), "r");
    let calls = stats.snapshot().total_calls();

    controller.handle_key(Key::Backspace.into());
    assert_eq!(controller.input_text(), "");
    assert_eq!(controller.view(), &ResultsView::Empty);
    assert_eq!(stats.snapshot().total_calls(), calls);
    assert!(stats.snapshot().is_balanced());
}

#[test]
fn no_hits_shows_header_and_message() {
    let (mut controller, _stats) = inline(sample_source(), MockBehavior::default());
    controller.open();
    controller.set_input("haskell monads");
    assert_eq!(
        controller.view(),
        &ResultsView::NoResults {
            header: "haskell ∧ monads".into()
        }
    );
    assert_eq!(controller.view().message(), Some(NO_RESULTS_MESSAGE));
}

#[test]
fn module_search_failure_shows_generic_error() {
    let (mut controller, stats) = inline(
        sample_source(),
        MockBehavior {
            fail_search: true,
            ..Default::default()
        },
    );
    controller.open();
    controller.set_input("rust");
    assert_eq!(controller.view().message(), Some(SEARCH_ERROR_MESSAGE));
    assert!(stats.snapshot().is_balanced());
}

#[test]
fn backspace_over_separator_keeps_query() {
    let (mut controller, _stats) = inline(sample_source(), MockBehavior::default());
    controller.open();
    type_text(&mut controller, "rust ");
    assert_eq!(controller.input_text(), "rust ∧ ");

    assert_eq!(
        controller.handle_key(Key::Backspace.into()),
        KeyOutcome::Edited
    );
    assert_eq!(controller.input_text(), "rust ");
    assert_eq!(controller.editor().cursor(), 5);
    assert_eq!(controller.view().header(), Some("rust"));
}

// ============================================================================
// Activation
// ============================================================================

#[test]
fn activating_result_returns_link_and_closes() {
    let (mut controller, _stats) = inline(sample_source(), MockBehavior::default());
    controller.open();
    controller.set_input("rust server");

    let link = controller.activate_result(0);
    assert_eq!(link.as_deref(), Some("posts/http-server-rust/post.html"));
    assert!(!controller.is_open());
    assert_eq!(controller.input_text(), "");
    assert_eq!(controller.view(), &ResultsView::Empty);
}

#[test]
fn unmapped_result_links_to_hash() {
    let (mut controller, _stats) = inline(sample_source(), MockBehavior::default());
    controller.open();
    controller.set_input("draft");
    assert_eq!(controller.view().items()[0].display_title(), "Document 4");
    assert_eq!(
        controller.handle_key(Key::Enter.into()),
        KeyOutcome::Activated("#".into())
    );
}

#[test]
fn activating_missing_result_does_nothing() {
    let (mut controller, _stats) = inline(sample_source(), MockBehavior::default());
    controller.open();
    controller.set_input("rust server");
    assert_eq!(controller.activate_result(9), None);
    assert!(controller.is_open());
}

#[test]
fn label_and_backdrop_clicks() {
    let (mut controller, _stats) = inline(sample_source(), MockBehavior::default());
    assert!(controller.click_shortcut_label());
    assert!(controller.is_open());
    assert!(controller.click_backdrop());
    assert!(!controller.is_open());
    assert!(!controller.click_backdrop());
}

// ============================================================================
// Initialization
// ============================================================================

#[test]
fn pending_query_is_rerun_with_latest_text() {
    let (source, release) = GatedSource::new(sample_source());
    let runtime = MockRuntime::new(MockBehavior::default());
    let stats = runtime.stats();
    let loader = EngineLoader::new(Arc::new(source), Arc::new(runtime), AssetPaths::default());
    let (launcher, events) = ThreadLauncher::new(loader);
    let mut controller = ModalController::new(Box::new(launcher));

    controller.open();
    wait_for(&controller, Readiness::Loading);

    type_text(&mut controller, "rust");
    assert_eq!(controller.view(), &ResultsView::Loading);
    assert_eq!(controller.view().message(), Some(LOADING_MESSAGE));
    type_text(&mut controller, " server");
    assert_eq!(controller.view(), &ResultsView::Loading);
    assert_eq!(stats.snapshot().total_calls(), 0);

    release.send(()).unwrap();
    let event = events.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(event, EngineEvent::Settled(Readiness::Ready));
    controller.handle_event(event);

    assert_eq!(controller.view().header(), Some("rust ∧ server"));
    let ids: Vec<u32> = controller
        .view()
        .items()
        .iter()
        .map(|r| r.document_id)
        .collect();
    assert_eq!(ids, vec![2, 4]);
    assert_eq!(stats.snapshot().search_calls, 1);
}

#[test]
fn settled_with_empty_input_does_not_search() {
    let (source, release) = GatedSource::new(sample_source());
    let runtime = MockRuntime::new(MockBehavior::default());
    let stats = runtime.stats();
    let loader = EngineLoader::new(Arc::new(source), Arc::new(runtime), AssetPaths::default());
    let (launcher, events) = ThreadLauncher::new(loader);
    let mut controller = ModalController::new(Box::new(launcher));

    controller.open();
    release.send(()).unwrap();
    controller.handle_event(events.recv_timeout(Duration::from_secs(5)).unwrap());

    assert_eq!(controller.readiness(), Readiness::Ready);
    assert_eq!(controller.view(), &ResultsView::Empty);
    assert_eq!(stats.snapshot().search_calls, 0);
}

#[test]
fn failed_load_shows_error_until_retry() {
    let healed = Arc::new(AtomicBool::new(false));
    let source = FlakySource {
        inner: sample_source(),
        healed: Arc::clone(&healed),
    };
    let (mut controller, _stats) = inline(source, MockBehavior::default());

    controller.open();
    assert_eq!(controller.readiness(), Readiness::Failed);
    assert_eq!(controller.view().message(), Some(LOAD_ERROR_MESSAGE));

    controller.set_input("rust");
    assert_eq!(controller.view().message(), Some(LOAD_ERROR_MESSAGE));

    healed.store(true, Ordering::SeqCst);
    let failed = Arc::clone(controller.engine());
    assert!(controller.retry_initialization());
    assert!(!Arc::ptr_eq(&failed, controller.engine()));
    assert_eq!(failed.readiness(), Readiness::Failed);
    assert_eq!(controller.readiness(), Readiness::Ready);
    assert_eq!(controller.view().items().len(), 3);
}

#[test]
fn view_serializes_with_kind_tag() {
    let json = serde_json::to_value(ResultsView::Loading).unwrap();
    assert_eq!(json, serde_json::json!({ "kind": "loading" }));

    let (mut controller, _stats) = inline(sample_source(), MockBehavior::default());
    controller.open();
    controller.set_input("lifetimes");
    let json = serde_json::to_value(controller.view()).unwrap();
    assert_eq!(json["kind"], "results");
    assert_eq!(json["items"][0]["document_id"], 3);
    assert_eq!(json["items"][0]["link"], "posts/rust-lifetimes/post.html");
}
