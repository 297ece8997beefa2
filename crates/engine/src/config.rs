//! Configuration via `sift.toml`
//!
//! Says where the search assets live and how to fetch and run them. Command
//! line flags override individual values after the file is read.

use crate::fetch::{is_url, AssetPaths, AssetSource, FsSource};
use crate::wasm::WasmtimeRuntime;
use serde::{Deserialize, Serialize};
use sift_core::{SiftError, SiftResult};
use std::path::Path;

/// Config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "sift.toml";

/// Where the initialization assets live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetsConfig {
    /// Directory or HTTP(S) base URL
    #[serde(default = "default_base")]
    pub base: String,
    /// Module path relative to `base`
    #[serde(default = "default_module")]
    pub module: String,
    /// Index path relative to `base`
    #[serde(default = "default_index")]
    pub index: String,
    /// Mapping path relative to `base`
    #[serde(default = "default_mapping")]
    pub mapping: String,
}

fn default_base() -> String {
    ".".to_string()
}

fn default_module() -> String {
    crate::fetch::DEFAULT_MODULE_PATH.to_string()
}

fn default_index() -> String {
    crate::fetch::DEFAULT_INDEX_PATH.to_string()
}

fn default_mapping() -> String {
    crate::fetch::DEFAULT_MAPPING_PATH.to_string()
}

impl Default for AssetsConfig {
    fn default() -> Self {
        AssetsConfig {
            base: default_base(),
            module: default_module(),
            index: default_index(),
            mapping: default_mapping(),
        }
    }
}

/// HTTP fetch limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchConfig {
    /// Per-request timeout in milliseconds (default: 5000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Largest accepted asset body in bytes (default: 64 MiB)
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_bytes() -> u64 {
    64 * 1024 * 1024
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

/// Module runtime settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    /// Cap on linear memory, in 64KiB pages. Unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_memory_pages: Option<u32>,
}

/// Configuration loaded from `sift.toml`.
///
/// # Example
///
/// ```toml
/// [assets]
/// base = "https://example.com"
///
/// [fetch]
/// timeout_ms = 5000
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SiftConfig {
    /// Asset locations
    #[serde(default)]
    pub assets: AssetsConfig,
    /// HTTP limits
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Runtime limits
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl SiftConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Sift configuration

[assets]
# Directory or http(s) base URL the asset paths are resolved against.
base = "."
module = "wasm/search.wasm"
index = "wasm/search-index.bin"
mapping = "wasm/docs-mapping.json"

[fetch]
# Per-request timeout for http(s) bases, in milliseconds.
timeout_ms = 5000
# Largest accepted asset, in bytes.
max_bytes = 67108864

[runtime]
# Cap on module linear memory, in 64KiB pages (unlimited when unset).
# max_memory_pages = 1024
"#
    }

    /// Check values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns an error for empty asset paths or a zero timeout/limit.
    pub fn validate(&self) -> SiftResult<()> {
        for (name, value) in [
            ("assets.base", &self.assets.base),
            ("assets.module", &self.assets.module),
            ("assets.index", &self.assets.index),
            ("assets.mapping", &self.assets.mapping),
        ] {
            if value.trim().is_empty() {
                return Err(SiftError::config(format!("'{}' must not be empty", name)));
            }
        }
        if self.fetch.timeout_ms == 0 {
            return Err(SiftError::config("'fetch.timeout_ms' must be positive"));
        }
        if self.fetch.max_bytes == 0 {
            return Err(SiftError::config("'fetch.max_bytes' must be positive"));
        }
        if self.runtime.max_memory_pages == Some(0) {
            return Err(SiftError::config("'runtime.max_memory_pages' must be positive"));
        }
        Ok(())
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> SiftResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SiftError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: SiftConfig = toml::from_str(&content).map_err(|e| {
            SiftError::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path` if it exists, otherwise fall back to defaults.
    pub fn from_file_or_default(path: &Path) -> SiftResult<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> SiftResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                SiftError::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> SiftResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SiftError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            SiftError::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Relative asset paths.
    pub fn asset_paths(&self) -> AssetPaths {
        AssetPaths {
            module: self.assets.module.clone(),
            index: self.assets.index.clone(),
            mapping: self.assets.mapping.clone(),
        }
    }

    /// Asset source for `assets.base`.
    ///
    /// # Errors
    ///
    /// Returns an error for an HTTP(S) base when the `http` feature is off.
    pub fn source(&self) -> SiftResult<Box<dyn AssetSource>> {
        if is_url(&self.assets.base) {
            #[cfg(feature = "http")]
            {
                return Ok(Box::new(crate::fetch::HttpSource::new(
                    self.assets.base.clone(),
                    std::time::Duration::from_millis(self.fetch.timeout_ms),
                    self.fetch.max_bytes,
                )));
            }
            #[cfg(not(feature = "http"))]
            {
                return Err(SiftError::config(format!(
                    "asset base '{}' is a URL but the 'http' feature is not enabled",
                    self.assets.base
                )));
            }
        }
        Ok(Box::new(FsSource::new(&self.assets.base)))
    }

    /// Wasmtime runtime with the configured limits.
    pub fn runtime(&self) -> WasmtimeRuntime {
        let runtime = WasmtimeRuntime::new();
        match self.runtime.max_memory_pages {
            Some(pages) => runtime.with_max_memory_pages(pages),
            None => runtime,
        }
    }
}
