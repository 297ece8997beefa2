//! Query protocol
//!
//! Marshals a query into module memory, calls `wasm_search`, reads back the
//! JSON id list the module reports through its output slots and joins the ids
//! against the document mapping. Every buffer of a call (query, slots and the
//! module-allocated payload) lives in one `AllocationScope` and is freed on
//! every exit path.

use crate::query::Query;
use sift_core::{DocumentId, DocumentMapping, SearchResult, SiftError, SiftResult};
use sift_engine::module::SLOT_PAIR_SIZE;
use sift_engine::{EngineHandle, MemoryBridge};

/// Issues searches and document fetches against an engine.
#[derive(Clone, Copy)]
pub struct QueryProtocol<'e> {
    engine: &'e EngineHandle,
}

impl<'e> QueryProtocol<'e> {
    /// Protocol over `engine`.
    pub fn new(engine: &'e EngineHandle) -> Self {
        QueryProtocol { engine }
    }

    /// Run `query` and resolve the hits against the mapping.
    ///
    /// An empty query returns no results without touching the engine.
    ///
    /// # Errors
    ///
    /// - `SiftError::NotReady` if the engine is not ready (the module is not called)
    /// - `SiftError::Search` if `wasm_search` reports failure
    /// - `SiftError::Decode` if the payload is not a JSON array of ids
    pub fn search(&self, query: &Query) -> SiftResult<Vec<SearchResult>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let text = query.module_text();
        let results = self
            .engine
            .with_engine(|bridge, mapping| run_search(bridge, mapping, &text))??;
        tracing::debug!(
            target: "sift::search",
            query = %text,
            results = results.len(),
            "Search completed"
        );
        Ok(results)
    }

    /// Parse `text` and search for it.
    pub fn search_text(&self, text: &str) -> SiftResult<Vec<SearchResult>> {
        self.search(&Query::parse(text))
    }

    /// Full text of document `id`, or `None` if the module does not know it.
    pub fn get_document(&self, id: DocumentId) -> SiftResult<Option<String>> {
        self.engine
            .with_engine(|bridge, _| fetch_document(bridge, id))?
    }
}

fn run_search(
    bridge: &mut MemoryBridge,
    mapping: &DocumentMapping,
    text: &str,
) -> SiftResult<Vec<SearchResult>> {
    let mut scope = bridge.scope();
    let query = scope.alloc_bytes(text.as_bytes())?;
    let slots = scope.alloc(SLOT_PAIR_SIZE)?;

    let found = scope
        .module()
        .search(query.ptr, query.len, slots.ptr_slot(), slots.len_slot())?;
    if !found {
        tracing::warn!(target: "sift::search", query = %text, "Module reported search failure");
        return Err(SiftError::Search);
    }

    let (ptr, len) = scope.read_slots(slots)?;
    let payload = scope.adopt(ptr, len);
    let bytes = scope.read_bytes(payload)?;
    let ids: Vec<DocumentId> = serde_json::from_slice(&bytes)?;

    Ok(ids.into_iter().map(|id| mapping.resolve(id)).collect())
}

fn fetch_document(bridge: &mut MemoryBridge, id: DocumentId) -> SiftResult<Option<String>> {
    let mut scope = bridge.scope();
    let slots = scope.alloc(SLOT_PAIR_SIZE)?;
    if !scope
        .module()
        .get_document(id, slots.ptr_slot(), slots.len_slot())?
    {
        return Ok(None);
    }
    let (ptr, len) = scope.read_slots(slots)?;
    let text = scope.adopt(ptr, len);
    scope.read_string(text).map(Some)
}
