//! Search modal for Sift
//!
//! A headless controller for the search dialog: open/close transitions,
//! keyboard shortcuts, separator-aware editing, one synchronous search per
//! input change, and re-issuing the pending query once the engine becomes
//! ready. Front ends feed it key and click events and render [`ResultsView`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod controller;
pub mod keys;
pub mod launcher;
pub mod view;

pub use controller::{ModalController, ModalState, SearchTicket};
pub use keys::{Key, KeyEvent, KeyOutcome, Modifiers};
pub use launcher::{EngineEvent, InitLauncher, InlineLauncher, ThreadLauncher};
pub use view::{
    ResultsView, LOADING_MESSAGE, LOAD_ERROR_MESSAGE, NO_RESULTS_MESSAGE, SEARCH_ERROR_MESSAGE,
};
