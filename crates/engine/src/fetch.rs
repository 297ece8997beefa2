//! Asset fetching
//!
//! Initialization needs three side files: the compiled module, the binary
//! index and the JSON document mapping. They are addressed by relative paths
//! resolved against a base that is either a directory or (with the `http`
//! feature) an HTTP(S) URL.

use sift_core::{SiftError, SiftResult};
use std::path::{Path, PathBuf};

/// Default module path, relative to the asset base.
pub const DEFAULT_MODULE_PATH: &str = "wasm/search.wasm";
/// Default index path, relative to the asset base.
pub const DEFAULT_INDEX_PATH: &str = "wasm/search-index.bin";
/// Default mapping path, relative to the asset base.
pub const DEFAULT_MAPPING_PATH: &str = "wasm/docs-mapping.json";

/// Relative paths of the three initialization assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    /// Compiled search module
    pub module: String,
    /// Opaque index blob
    pub index: String,
    /// JSON document mapping
    pub mapping: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        AssetPaths {
            module: DEFAULT_MODULE_PATH.to_string(),
            index: DEFAULT_INDEX_PATH.to_string(),
            mapping: DEFAULT_MAPPING_PATH.to_string(),
        }
    }
}

/// Somewhere assets can be fetched from.
pub trait AssetSource: Send + Sync {
    /// Fetch the whole asset at `path`.
    ///
    /// # Errors
    ///
    /// `SiftError::Fetch` naming the asset on any failure.
    fn fetch(&self, path: &str) -> SiftResult<Vec<u8>>;

    /// Human-readable location of `path`, for logs.
    fn describe(&self, path: &str) -> String;
}

/// Whether `base` names an HTTP(S) location.
pub fn is_url(base: &str) -> bool {
    base.starts_with("http://") || base.starts_with("https://")
}

// ============================================================================
// Filesystem
// ============================================================================

/// Reads assets from a directory.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    /// Serve assets from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsSource { root: root.into() }
    }

    /// Directory assets are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl AssetSource for FsSource {
    fn fetch(&self, path: &str) -> SiftResult<Vec<u8>> {
        let full = self.resolve(path);
        std::fs::read(&full).map_err(|e| SiftError::fetch(full.display().to_string(), e))
    }

    fn describe(&self, path: &str) -> String {
        self.resolve(path).display().to_string()
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// Fetches assets over HTTP(S) with a blocking `ureq` agent.
#[cfg(feature = "http")]
pub struct HttpSource {
    base: String,
    agent: ureq::Agent,
    max_bytes: u64,
}

#[cfg(feature = "http")]
impl HttpSource {
    /// Fetch relative to `base`, giving up after `timeout` per request and
    /// refusing bodies over `max_bytes`.
    pub fn new(base: impl Into<String>, timeout: std::time::Duration, max_bytes: u64) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        HttpSource {
            base: base.into(),
            agent: ureq::Agent::new_with_config(config),
            max_bytes,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(feature = "http")]
impl AssetSource for HttpSource {
    fn fetch(&self, path: &str) -> SiftResult<Vec<u8>> {
        let url = self.url(path);
        let mut response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| SiftError::fetch(&url, e))?;
        response
            .body_mut()
            .with_config()
            .limit(self.max_bytes)
            .read_to_vec()
            .map_err(|e| SiftError::fetch(&url, e))
    }

    fn describe(&self, path: &str) -> String {
        self.url(path)
    }
}
