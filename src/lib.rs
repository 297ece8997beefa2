//! Sift - client bridge for a compiled WebAssembly search module
//!
//! Sift loads a site's search module and prebuilt index, runs AND queries
//! against it through a byte-level memory bridge, and drives a search modal
//! on top.
//!
//! # Quick Start
//!
//! ```ignore
//! use sift::{EngineHandle, EngineLoader, Query, QueryProtocol, SiftConfig};
//! use std::sync::Arc;
//!
//! let config = SiftConfig::default();
//! let loader = EngineLoader::new(
//!     Arc::from(config.source()?),
//!     Arc::new(config.runtime()),
//!     config.asset_paths(),
//! );
//! let engine = EngineHandle::new();
//! loader.load(&engine)?;
//!
//! let results = QueryProtocol::new(&engine).search(&Query::parse("rust server"))?;
//! ```
//!
//! # Architecture
//!
//! - `sift-core`: errors, readiness, search results, document mapping
//! - `sift-engine`: memory bridge, module runtime, asset fetching, lifecycle
//! - `sift-search`: query language, token editor, search protocol
//! - `sift-modal`: headless modal controller

pub use sift_core::*;
pub use sift_engine::*;
pub use sift_modal::*;
pub use sift_search::*;
