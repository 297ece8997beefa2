//! Search surface for Sift
//!
//! This crate provides:
//! - Query / Token: the AND query language and its two renderings
//! - TokenEditor: the search input with separator-aware editing
//! - QueryProtocol: search and document fetch through the engine
//!
//! # Usage
//!
//! ```ignore
//! use sift_search::{Query, QueryProtocol};
//!
//! let results = QueryProtocol::new(&engine).search(&Query::parse("rust server"))?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod editor;
pub mod protocol;
pub mod query;

pub use editor::TokenEditor;
pub use protocol::QueryProtocol;
pub use query::{join, tokenize, Query, Token, CONJUNCTION_MARKER, SEPARATOR};
