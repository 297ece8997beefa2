//! Core types for Sift
//!
//! This crate defines the types shared by every layer of the search bridge:
//! - SiftError / SiftResult: the error taxonomy
//! - Readiness: the one-way engine readiness state
//! - SearchResult, DocumentId: what a query produces
//! - DocumentMapping: the static id -> {title, link} table

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod mapping;
pub mod readiness;
pub mod search_types;

pub use error::{SiftError, SiftResult};
pub use mapping::{DocumentMapping, MappingEntry};
pub use readiness::Readiness;
pub use search_types::{default_title, DocumentId, SearchResult};
