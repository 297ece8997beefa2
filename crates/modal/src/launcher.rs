//! Starting engine initialization
//!
//! The controller never loads the engine itself. It hands the handle to an
//! [`InitLauncher`] on first open and is told when loading settles, either
//! because the launcher ran synchronously or through an [`EngineEvent`].

use sift_core::Readiness;
use sift_engine::{EngineHandle, EngineLoader};
use std::sync::mpsc::{self, Receiver, Sender};
use std::io;
use std::sync::Arc;
use std::thread;

/// Name of the background initialization thread.
pub const INIT_THREAD_NAME: &str = "sift-init";

/// Notification sent when initialization finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Loading ended with this readiness (`Ready` or `Failed`)
    Settled(Readiness),
}

/// Starts initialization of an engine handle.
pub trait InitLauncher {
    /// Begin initializing `engine`. May return before loading finishes.
    fn launch(&self, engine: Arc<EngineHandle>);
}

/// Initializes on the calling thread.
pub struct InlineLauncher {
    loader: EngineLoader,
}

impl InlineLauncher {
    /// Launcher that runs `loader` synchronously.
    pub fn new(loader: EngineLoader) -> Self {
        InlineLauncher { loader }
    }
}

impl InitLauncher for InlineLauncher {
    fn launch(&self, engine: Arc<EngineHandle>) {
        // Failure is recorded on the handle
        let _ = self.loader.load(&engine);
    }
}

/// Initializes on a named background thread and reports over a channel.
pub struct ThreadLauncher {
    loader: EngineLoader,
    events: Sender<EngineEvent>,
}

impl ThreadLauncher {
    /// Launcher plus the receiving end of its event channel.
    pub fn new(loader: EngineLoader) -> (Self, Receiver<EngineEvent>) {
        let (events, receiver) = mpsc::channel();
        (ThreadLauncher { loader, events }, receiver)
    }
}

impl InitLauncher for ThreadLauncher {
    fn launch(&self, engine: Arc<EngineHandle>) {
        let loader = self.loader.clone();
        let events = self.events.clone();
        let worker_engine = Arc::clone(&engine);
        let spawned = thread::Builder::new()
            .name(INIT_THREAD_NAME.to_string())
            .spawn(move || {
                let _ = loader.load(&worker_engine);
                send_settled(&events, &worker_engine);
            });
        if let Err(e) = spawned {
            report_spawn_failure(&engine, &self.events, &e);
        }
    }
}

fn send_settled(events: &Sender<EngineEvent>, engine: &EngineHandle) {
    if events.send(EngineEvent::Settled(engine.readiness())).is_err() {
        tracing::debug!(target: "sift::modal", "Engine event receiver dropped");
    }
}

/// No thread means no load: fail the handle and settle it right away.
fn report_spawn_failure(engine: &EngineHandle, events: &Sender<EngineEvent>, error: &io::Error) {
    tracing::error!(target: "sift::modal", error = %error, "Failed to spawn init thread");
    engine.mark_failed(format!("could not start initialization: {}", error));
    send_settled(events, engine);
}
