//! Error types for Sift
//!
//! One taxonomy covers the whole bridge. Initialization failures (fetch,
//! instantiate, index load, mapping) are terminal for an engine instance.
//! Per-query failures (allocation, search, trap, decode) are isolated to the
//! query that raised them. Document lookup misses are not errors at all:
//! they come back as `None`.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::readiness::Readiness;
use std::io;
use thiserror::Error;

/// Result type alias for Sift operations
pub type SiftResult<T> = std::result::Result<T, SiftError>;

/// Error types for the search bridge
#[derive(Debug, Error)]
pub enum SiftError {
    /// An asset (module, index, mapping) could not be fetched
    #[error("failed to fetch {asset}: {reason}")]
    Fetch {
        /// Path or URL of the asset
        asset: String,
        /// Underlying cause
        reason: String,
    },

    /// The module bytes could not be compiled or instantiated
    #[error("failed to instantiate search module: {0}")]
    Instantiate(String),

    /// The module does not export a required symbol with the expected signature
    #[error("search module is missing export '{0}'")]
    MissingExport(&'static str),

    /// `load_index` returned false
    #[error("search module rejected the index")]
    IndexLoad,

    /// The document mapping file could not be parsed
    #[error("invalid document mapping: {0}")]
    Mapping(String),

    /// The module allocator returned a null pointer
    #[error("module allocator returned null for {requested} bytes")]
    Allocation {
        /// Requested buffer length
        requested: usize,
    },

    /// `wasm_search` returned false
    #[error("search module reported a search failure")]
    Search,

    /// A query or document fetch was attempted before the engine was ready
    #[error("search engine is not ready ({0})")]
    NotReady(Readiness),

    /// The module trapped during a call
    #[error("search module trapped: {0}")]
    Trap(String),

    /// A pointer/length pair falls outside module memory
    #[error("memory access out of bounds: ptr={ptr} len={len} memory={memory_size}")]
    OutOfBounds {
        /// Start of the access
        ptr: u32,
        /// Length of the access
        len: u32,
        /// Current size of module memory in bytes
        memory_size: usize,
    },

    /// A write did not match the length of its allocation
    #[error("write of {actual} bytes into an allocation of {expected} bytes")]
    LengthMismatch {
        /// Allocation length
        expected: u32,
        /// Bytes offered
        actual: usize,
    },

    /// Module output could not be decoded (bad UTF-8 or JSON)
    #[error("failed to decode module output: {0}")]
    Decode(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error (config files, local assets)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SiftError {
    /// Build a fetch error for `asset`.
    pub fn fetch(asset: impl Into<String>, reason: impl ToString) -> Self {
        SiftError::Fetch {
            asset: asset.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        SiftError::Config(message.into())
    }

    /// Errors that end an initialization attempt.
    ///
    /// An engine that hits one of these stays `Failed`; only an explicit
    /// retry with a fresh engine can recover.
    pub fn is_init_failure(&self) -> bool {
        matches!(
            self,
            SiftError::Fetch { .. }
                | SiftError::Instantiate(_)
                | SiftError::MissingExport(_)
                | SiftError::IndexLoad
                | SiftError::Mapping(_)
        )
    }
}

impl From<serde_json::Error> for SiftError {
    fn from(e: serde_json::Error) -> Self {
        SiftError::Decode(e.to_string())
    }
}

impl From<std::string::FromUtf8Error> for SiftError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        SiftError::Decode(e.to_string())
    }
}
