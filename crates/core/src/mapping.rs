//! Document mapping: document id -> {title, link}
//!
//! Loaded once from a JSON side file when the engine initializes, read-only
//! afterwards. Two shapes are accepted:
//!
//! ```json
//! { "2": { "title": "Mini http/1.1 server (in rust)", "link": "posts/http-server-rust/post.html" } }
//! ```
//!
//! ```json
//! [ null, { "title": "...", "link": "..." } ]
//! ```
//!
//! In the array form the index is the document id and `null` marks a hole.
//! Rows that cannot be read (a key that is not a document id, an entry that
//! is not an object of strings) are skipped with a warning and resolve to the
//! default title like any other miss.

use crate::error::{SiftError, SiftResult};
use crate::search_types::{default_title, DocumentId, SearchResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One row of the mapping file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Human-facing title
    #[serde(default)]
    pub title: Option<String>,
    /// Relative or absolute link to the document
    #[serde(default)]
    pub link: Option<String>,
}

/// Immutable id -> entry table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMapping {
    entries: BTreeMap<DocumentId, MappingEntry>,
}

impl DocumentMapping {
    /// Parse a mapping file.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::Mapping` if the bytes are not JSON, or if the top
    /// level is neither an object nor an array.
    pub fn from_json(bytes: &[u8]) -> SiftResult<Self> {
        let raw: Value =
            serde_json::from_slice(bytes).map_err(|e| SiftError::Mapping(e.to_string()))?;

        let mut entries = BTreeMap::new();
        match raw {
            Value::Object(map) => {
                for (key, value) in map {
                    let Ok(id) = key.trim().parse::<DocumentId>() else {
                        tracing::warn!(
                            target: "sift::engine",
                            key = %key,
                            "Skipping mapping row: key is not a document id"
                        );
                        continue;
                    };
                    if let Some(entry) = read_entry(id, value) {
                        entries.insert(id, entry);
                    }
                }
            }
            Value::Array(list) => {
                for (index, value) in list.into_iter().enumerate() {
                    let Ok(id) = DocumentId::try_from(index) else {
                        tracing::warn!(
                            target: "sift::engine",
                            index,
                            "Skipping mapping rows past the document id range"
                        );
                        break;
                    };
                    if let Some(entry) = read_entry(id, value) {
                        entries.insert(id, entry);
                    }
                }
            }
            other => {
                return Err(SiftError::Mapping(format!(
                    "expected an object or array of entries, found {}",
                    json_kind(&other)
                )));
            }
        }

        Ok(DocumentMapping { entries })
    }

    /// Build a mapping from in-memory entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (DocumentId, MappingEntry)>) -> Self {
        DocumentMapping {
            entries: entries.into_iter().collect(),
        }
    }

    /// Raw entry for `id`, if any.
    pub fn get(&self, id: DocumentId) -> Option<&MappingEntry> {
        self.entries.get(&id)
    }

    /// Join `id` against the table.
    ///
    /// Never fails: a missing entry, an empty title or an empty link degrade
    /// to `"Document {id}"` and `None`.
    pub fn resolve(&self, id: DocumentId) -> SearchResult {
        let entry = self.entries.get(&id);
        let title = entry
            .and_then(|e| e.title.as_deref())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_title(id));
        let link = entry
            .and_then(|e| e.link.as_deref())
            .filter(|l| !l.is_empty())
            .map(str::to_string);

        SearchResult {
            document_id: id,
            title: Some(title),
            link,
        }
    }

    /// Number of mapped documents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `null` is a hole; anything that is not a valid entry is skipped.
fn read_entry(id: DocumentId, value: Value) -> Option<MappingEntry> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value::<MappingEntry>(value) {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::warn!(target: "sift::engine", id, error = %e, "Skipping unreadable mapping row");
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
