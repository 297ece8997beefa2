//! Engine lifecycle
//!
//! An [`EngineHandle`] owns one search module instance (through its
//! [`MemoryBridge`]) and the document mapping, behind a readiness state that
//! only moves forward:
//!
//! ```text
//! NotReady --initialize--> Loading --ok--> Ready
//!                                  \--err--> Failed
//! ```
//!
//! The first caller of [`EngineHandle::initialize`] claims the
//! `NotReady -> Loading` transition under the state lock and does the work;
//! everyone else gets [`InitOutcome::AlreadyStarted`]. Fetching and
//! instantiation run with the lock released so readers see `Loading` in the
//! meantime. A failed handle stays failed; recovering means building a new one.

use crate::bridge::MemoryBridge;
use crate::fetch::{AssetPaths, AssetSource};
use crate::module::ModuleRuntime;
use parking_lot::Mutex;
use sift_core::{DocumentMapping, Readiness, SiftError, SiftResult};
use std::sync::Arc;
use std::time::Instant;

/// A fully initialized engine.
struct LoadedEngine {
    bridge: MemoryBridge,
    mapping: DocumentMapping,
}

enum EngineState {
    NotReady,
    Loading,
    Ready(LoadedEngine),
    Failed(String),
}

impl EngineState {
    fn readiness(&self) -> Readiness {
        match self {
            EngineState::NotReady => Readiness::NotReady,
            EngineState::Loading => Readiness::Loading,
            EngineState::Ready(_) => Readiness::Ready,
            EngineState::Failed(_) => Readiness::Failed,
        }
    }
}

/// Result of a call to [`EngineHandle::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// This call performed the initialization and the engine is ready
    Initialized,
    /// Another caller got there first; readiness at the time of the call
    AlreadyStarted(Readiness),
}

/// Shared handle onto one search engine instance.
///
/// Shared as `Arc<EngineHandle>`. All module calls go through
/// [`EngineHandle::with_engine`], which holds the state lock for the whole
/// call so allocate/free pairs never interleave.
pub struct EngineHandle {
    state: Mutex<EngineState>,
}

impl Default for EngineHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineHandle {
    /// A handle that has not started loading.
    pub fn new() -> Self {
        EngineHandle {
            state: Mutex::new(EngineState::NotReady),
        }
    }

    /// Current readiness.
    pub fn readiness(&self) -> Readiness {
        self.state.lock().readiness()
    }

    /// Whether queries may reach the module.
    pub fn is_ready(&self) -> bool {
        self.readiness().is_ready()
    }

    /// Why initialization failed, if it did.
    pub fn failure(&self) -> Option<String> {
        match &*self.state.lock() {
            EngineState::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Number of entries in the loaded mapping, once ready.
    pub fn document_count(&self) -> Option<usize> {
        match &*self.state.lock() {
            EngineState::Ready(engine) => Some(engine.mapping.len()),
            _ => None,
        }
    }

    /// Fetch, instantiate and load the engine.
    ///
    /// # Errors
    ///
    /// Returns the error that moved the handle to `Failed`. A call that finds
    /// initialization already started returns `Ok(AlreadyStarted)` instead.
    pub fn initialize(
        &self,
        source: &dyn AssetSource,
        runtime: &dyn ModuleRuntime,
        paths: &AssetPaths,
    ) -> SiftResult<InitOutcome> {
        {
            let mut state = self.state.lock();
            let current = state.readiness();
            if !current.can_advance_to(Readiness::Loading) {
                tracing::debug!(target: "sift::engine", readiness = %current, "Initialization already started");
                return Ok(InitOutcome::AlreadyStarted(current));
            }
            *state = EngineState::Loading;
        }

        let started = Instant::now();
        match load(source, runtime, paths) {
            Ok(engine) => {
                let documents = engine.mapping.len();
                *self.state.lock() = EngineState::Ready(engine);
                tracing::info!(
                    target: "sift::engine",
                    documents,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Search engine ready"
                );
                Ok(InitOutcome::Initialized)
            }
            Err(e) => {
                tracing::error!(target: "sift::engine", error = %e, "Search engine failed to load");
                *self.state.lock() = EngineState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Move a handle that never got to load to `Failed`, for when the
    /// loading work could not even be started. Returns false if the handle
    /// was already `Ready` or `Failed`.
    pub fn mark_failed(&self, reason: impl Into<String>) -> bool {
        let mut state = self.state.lock();
        match &*state {
            EngineState::NotReady | EngineState::Loading => {
                let reason = reason.into();
                tracing::error!(target: "sift::engine", error = %reason, "Search engine failed to load");
                *state = EngineState::Failed(reason);
                true
            }
            EngineState::Ready(_) | EngineState::Failed(_) => false,
        }
    }

    /// Run `f` against the loaded engine.
    ///
    /// # Errors
    ///
    /// `SiftError::NotReady` without calling `f` unless the engine is ready.
    pub fn with_engine<R>(
        &self,
        f: impl FnOnce(&mut MemoryBridge, &DocumentMapping) -> R,
    ) -> SiftResult<R> {
        let mut state = self.state.lock();
        match &mut *state {
            EngineState::Ready(engine) => Ok(f(&mut engine.bridge, &engine.mapping)),
            other => Err(SiftError::NotReady(other.readiness())),
        }
    }
}

fn load(
    source: &dyn AssetSource,
    runtime: &dyn ModuleRuntime,
    paths: &AssetPaths,
) -> SiftResult<LoadedEngine> {
    tracing::debug!(target: "sift::engine", asset = %source.describe(&paths.module), "Fetching module");
    let module_bytes = source.fetch(&paths.module)?;
    let module = runtime.instantiate(&module_bytes)?;
    let mut bridge = MemoryBridge::new(module);

    tracing::debug!(target: "sift::engine", asset = %source.describe(&paths.index), "Fetching index");
    let index = source.fetch(&paths.index)?;
    {
        let mut scope = bridge.scope();
        let region = scope.alloc_bytes(&index)?;
        if !scope.module().load_index(region.ptr, region.len)? {
            return Err(SiftError::IndexLoad);
        }
    }
    tracing::debug!(target: "sift::engine", bytes = index.len(), "Index loaded");

    tracing::debug!(target: "sift::engine", asset = %source.describe(&paths.mapping), "Fetching mapping");
    let mapping = DocumentMapping::from_json(&source.fetch(&paths.mapping)?)?;

    Ok(LoadedEngine { bridge, mapping })
}

/// Everything needed to initialize a handle, bundled for handing to a
/// background thread.
#[derive(Clone)]
pub struct EngineLoader {
    source: Arc<dyn AssetSource>,
    runtime: Arc<dyn ModuleRuntime>,
    paths: AssetPaths,
}

impl EngineLoader {
    /// Loader for `paths` served by `source`, instantiated by `runtime`.
    pub fn new(
        source: Arc<dyn AssetSource>,
        runtime: Arc<dyn ModuleRuntime>,
        paths: AssetPaths,
    ) -> Self {
        EngineLoader {
            source,
            runtime,
            paths,
        }
    }

    /// Asset paths this loader fetches.
    pub fn paths(&self) -> &AssetPaths {
        &self.paths
    }

    /// Initialize `handle`.
    pub fn load(&self, handle: &EngineHandle) -> SiftResult<InitOutcome> {
        handle.initialize(self.source.as_ref(), self.runtime.as_ref(), &self.paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_source, MockBehavior, MockRuntime};

    #[test]
    fn new_handle_is_not_ready() {
        let handle = EngineHandle::new();
        assert_eq!(handle.readiness(), Readiness::NotReady);
        assert!(handle.failure().is_none());
        assert!(handle.document_count().is_none());
    }

    #[test]
    fn mark_failed_before_loading() {
        let handle = EngineHandle::new();
        assert!(handle.mark_failed("no init thread"));
        assert_eq!(handle.readiness(), Readiness::Failed);
        assert_eq!(handle.failure().as_deref(), Some("no init thread"));
        assert!(!handle.mark_failed("again"));
        assert_eq!(handle.failure().as_deref(), Some("no init thread"));

        // Failed stays failed
        let runtime = MockRuntime::new(MockBehavior::default());
        let outcome = handle
            .initialize(&sample_source(), &runtime, &AssetPaths::default())
            .unwrap();
        assert_eq!(outcome, InitOutcome::AlreadyStarted(Readiness::Failed));
    }

    #[test]
    fn mark_failed_leaves_ready_alone() {
        let handle = EngineHandle::new();
        let runtime = MockRuntime::new(MockBehavior::default());
        handle
            .initialize(&sample_source(), &runtime, &AssetPaths::default())
            .unwrap();
        assert!(!handle.mark_failed("late"));
        assert!(handle.is_ready());
    }

    #[test]
    fn initialize_reaches_ready() {
        let handle = EngineHandle::new();
        let runtime = MockRuntime::new(MockBehavior::default());
        let outcome = handle
            .initialize(&sample_source(), &runtime, &AssetPaths::default())
            .unwrap();
        assert_eq!(outcome, InitOutcome::Initialized);
        assert!(handle.is_ready());
        assert_eq!(handle.document_count(), Some(3));
    }

    #[test]
    fn second_initialize_does_no_work() {
        let handle = EngineHandle::new();
        let runtime = MockRuntime::new(MockBehavior::default());
        let source = sample_source();
        handle
            .initialize(&source, &runtime, &AssetPaths::default())
            .unwrap();
        let fetches = source.fetches();

        let outcome = handle
            .initialize(&source, &runtime, &AssetPaths::default())
            .unwrap();
        assert_eq!(outcome, InitOutcome::AlreadyStarted(Readiness::Ready));
        assert_eq!(source.fetches(), fetches);
        assert_eq!(runtime.instantiations(), 1);
    }

    #[test]
    fn with_engine_before_ready_is_not_ready_error() {
        let handle = EngineHandle::new();
        let err = handle.with_engine(|_, _| ()).unwrap_err();
        assert!(matches!(err, SiftError::NotReady(Readiness::NotReady)));
    }

    #[test]
    fn rejected_index_fails_handle() {
        let handle = EngineHandle::new();
        let runtime = MockRuntime::new(MockBehavior {
            reject_index: true,
            ..Default::default()
        });
        let err = handle
            .initialize(&sample_source(), &runtime, &AssetPaths::default())
            .unwrap_err();
        assert!(matches!(err, SiftError::IndexLoad));
        assert_eq!(handle.readiness(), Readiness::Failed);
        assert!(handle.failure().is_some());
        assert!(runtime.stats().snapshot().is_balanced());
    }

    #[test]
    fn failed_handle_stays_failed() {
        let handle = EngineHandle::new();
        let runtime = MockRuntime::new(MockBehavior::default());
        let broken = sample_source().without("wasm/search.wasm");
        assert!(handle
            .initialize(&broken, &runtime, &AssetPaths::default())
            .is_err());

        let outcome = handle
            .initialize(&sample_source(), &runtime, &AssetPaths::default())
            .unwrap();
        assert_eq!(outcome, InitOutcome::AlreadyStarted(Readiness::Failed));
        assert_eq!(handle.readiness(), Readiness::Failed);
    }

    #[test]
    fn loader_initializes_handle() {
        let loader = EngineLoader::new(
            Arc::new(sample_source()),
            Arc::new(MockRuntime::new(MockBehavior::default())),
            AssetPaths::default(),
        );
        let handle = EngineHandle::new();
        assert_eq!(loader.load(&handle).unwrap(), InitOutcome::Initialized);
        assert!(handle.is_ready());
    }
}
