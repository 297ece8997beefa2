//! Search result types
//!
//! The module answers a query with a list of document ids. A `SearchResult`
//! is one of those ids joined against the document mapping.

use serde::Serialize;

/// Opaque document identifier assigned by the index builder.
pub type DocumentId = u32;

/// Title used when the mapping has no usable title for `id`.
pub fn default_title(id: DocumentId) -> String {
    format!("Document {}", id)
}

/// A single hit, enriched with mapping data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Id returned by the module
    pub document_id: DocumentId,
    /// Title from the mapping, or the synthesized default
    pub title: Option<String>,
    /// Link from the mapping; `None` when absent
    pub link: Option<String>,
}

impl SearchResult {
    /// Result with no mapping data at all.
    pub fn unmapped(document_id: DocumentId) -> Self {
        SearchResult {
            document_id,
            title: Some(default_title(document_id)),
            link: None,
        }
    }

    /// Title to show, falling back to `"Document {id}"`.
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| default_title(self.document_id))
    }

    /// Link target to navigate to; `"#"` when the result has no link.
    pub fn href(&self) -> &str {
        self.link.as_deref().unwrap_or("#")
    }
}
