//! Search engine runtime for Sift
//!
//! This crate owns everything between the host and the compiled search module:
//! - module: the export contract as the `SearchModule` / `ModuleRuntime` traits
//! - wasm: the wasmtime implementation of that contract
//! - bridge: allocation, copying and slot decoding across linear memory
//! - fetch: where the module, index and mapping come from
//! - handle: the `EngineHandle` readiness state machine
//! - config: `sift.toml`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bridge;
pub mod config;
pub mod fetch;
pub mod handle;
pub mod module;
pub mod wasm;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bridge::{Allocation, AllocationScope, MemoryBridge, Region};
pub use config::{SiftConfig, CONFIG_FILE_NAME};
#[cfg(feature = "http")]
pub use fetch::HttpSource;
pub use fetch::{AssetPaths, AssetSource, FsSource};
pub use handle::{EngineHandle, EngineLoader, InitOutcome};
pub use module::{ModuleRuntime, SearchModule};
pub use wasm::{WasmModule, WasmtimeRuntime};
