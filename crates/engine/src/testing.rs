//! In-process test doubles
//!
//! `MockModule` implements the module contract in plain Rust: a growable
//! byte vector as linear memory, a bump allocator that checks every free
//! against a live allocation, a JSON index of `{id, text}` documents and an
//! AND search over lowercased text. Every export call is counted in shared
//! [`ModuleStats`] so tests can assert allocate/free balance after the module
//! has been boxed away inside a bridge.
//!
//! Enabled for this crate's tests and, for other crates, with the `testing`
//! feature.

use crate::fetch::{AssetPaths, AssetSource};
use crate::module::{ModuleRuntime, SearchModule, PAGE_SIZE};
use byteorder::{ByteOrder, LittleEndian};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sift_core::{SiftError, SiftResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Stats
// ============================================================================

/// Counters for every export call a mock module received.
#[derive(Debug, Clone, Default)]
pub struct ModuleStats {
    /// `(ptr, len)` of every successful `wasm_alloc`
    pub allocs: Vec<(u32, u32)>,
    /// `(ptr, len)` of every `wasm_free`
    pub frees: Vec<(u32, u32)>,
    /// `wasm_alloc` calls that returned 0
    pub failed_allocs: usize,
    /// `load_index` calls
    pub load_index_calls: usize,
    /// `wasm_search` calls
    pub search_calls: usize,
    /// `get_document` calls
    pub get_document_calls: usize,
    /// Times linear memory grew
    pub memory_grows: usize,
}

impl ModuleStats {
    /// Every allocation was freed exactly once with its own length.
    pub fn is_balanced(&self) -> bool {
        let mut allocs = self.allocs.clone();
        let mut frees = self.frees.clone();
        allocs.sort_unstable();
        frees.sort_unstable();
        allocs == frees
    }

    /// Allocations not yet freed.
    pub fn outstanding(&self) -> usize {
        self.allocs.len().saturating_sub(self.frees.len())
    }

    /// Calls that reached the module at all.
    pub fn total_calls(&self) -> usize {
        self.allocs.len()
            + self.failed_allocs
            + self.frees.len()
            + self.load_index_calls
            + self.search_calls
            + self.get_document_calls
    }
}

/// Shared handle onto a mock module's stats.
#[derive(Debug, Clone, Default)]
pub struct StatsHandle(Arc<Mutex<ModuleStats>>);

impl StatsHandle {
    /// Copy of the current counters.
    pub fn snapshot(&self) -> ModuleStats {
        self.0.lock().clone()
    }

    fn record(&self, f: impl FnOnce(&mut ModuleStats)) {
        f(&mut self.0.lock());
    }
}

// ============================================================================
// MockModule
// ============================================================================

/// Failure injection knobs.
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    /// `load_index` returns false
    pub reject_index: bool,
    /// `wasm_search` returns false
    pub fail_search: bool,
    /// `wasm_search` traps
    pub trap_on_search: bool,
    /// `wasm_search` writes a payload that is not JSON
    pub corrupt_search_output: bool,
    /// `wasm_alloc` returns 0 for requests larger than this
    pub fail_alloc_over: Option<u32>,
    /// Grow memory by one page before every allocation
    pub grow_on_alloc: bool,
}

/// A document in the mock index format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockDocument {
    /// Document id reported by searches
    pub id: u32,
    /// Full text, searched case-insensitively
    pub text: String,
}

const HEAP_START: u32 = 16;
const ALIGN: u32 = 8;

/// Pure-Rust implementation of the module contract.
pub struct MockModule {
    memory: Vec<u8>,
    next: u32,
    live: BTreeMap<u32, u32>,
    documents: Option<Vec<MockDocument>>,
    behavior: MockBehavior,
    stats: StatsHandle,
}

impl MockModule {
    /// One page of memory, empty index.
    pub fn new(behavior: MockBehavior) -> Self {
        Self::with_stats(behavior, StatsHandle::default())
    }

    fn with_stats(behavior: MockBehavior, stats: StatsHandle) -> Self {
        MockModule {
            memory: vec![0; PAGE_SIZE],
            next: HEAP_START,
            live: BTreeMap::new(),
            documents: None,
            behavior,
            stats,
        }
    }

    /// Handle onto this module's counters.
    pub fn stats(&self) -> StatsHandle {
        self.stats.clone()
    }

    /// Encode documents in the index format `load_index` understands.
    pub fn index_blob(documents: &[MockDocument]) -> Vec<u8> {
        serde_json::to_vec(documents).unwrap_or_default()
    }

    fn grow(&mut self, min_size: usize) {
        while self.memory.len() < min_size {
            self.memory.resize(self.memory.len() + PAGE_SIZE, 0);
            self.stats.record(|s| s.memory_grows += 1);
        }
    }

    fn bytes(&self, ptr: u32, len: u32) -> &[u8] {
        &self.memory[ptr as usize..(ptr + len) as usize]
    }

    fn write_bytes(&mut self, ptr: u32, bytes: &[u8]) {
        let start = ptr as usize;
        self.memory[start..start + bytes.len()].copy_from_slice(bytes);
    }

    fn write_u32(&mut self, ptr: u32, value: u32) {
        let start = ptr as usize;
        LittleEndian::write_u32(&mut self.memory[start..start + 4], value);
    }

    /// Allocate a buffer for `payload` and report it through the slots.
    fn emit(&mut self, payload: &[u8], out_ptr_slot: u32, out_len_slot: u32) -> SiftResult<bool> {
        let len = payload.len() as u32;
        let ptr = self.alloc(len)?;
        if ptr == 0 {
            return Ok(false);
        }
        self.write_bytes(ptr, payload);
        self.write_u32(out_ptr_slot, ptr);
        self.write_u32(out_len_slot, len);
        Ok(true)
    }
}

impl SearchModule for MockModule {
    fn alloc(&mut self, len: u32) -> SiftResult<u32> {
        if self.behavior.fail_alloc_over.is_some_and(|max| len > max) || len == 0 {
            self.stats.record(|s| s.failed_allocs += 1);
            return Ok(0);
        }
        if self.behavior.grow_on_alloc {
            let target = self.memory.len() + PAGE_SIZE;
            self.grow(target);
        }
        let ptr = self.next.div_ceil(ALIGN) * ALIGN;
        self.next = ptr + len;
        self.grow(self.next as usize);
        self.live.insert(ptr, len);
        self.stats.record(|s| s.allocs.push((ptr, len)));
        Ok(ptr)
    }

    fn free(&mut self, ptr: u32, len: u32) -> SiftResult<()> {
        match self.live.remove(&ptr) {
            Some(live_len) if live_len == len => {
                self.stats.record(|s| s.frees.push((ptr, len)));
                if self.live.is_empty() {
                    self.next = HEAP_START;
                }
                Ok(())
            }
            Some(live_len) => panic!(
                "wasm_free({}, {}) does not match wasm_alloc of {} bytes",
                ptr, len, live_len
            ),
            None => panic!("wasm_free({}, {}) of a buffer that is not live", ptr, len),
        }
    }

    fn load_index(&mut self, ptr: u32, len: u32) -> SiftResult<bool> {
        self.stats.record(|s| s.load_index_calls += 1);
        if self.behavior.reject_index {
            return Ok(false);
        }
        match serde_json::from_slice::<Vec<MockDocument>>(self.bytes(ptr, len)) {
            Ok(documents) => {
                self.documents = Some(documents);
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    fn search(
        &mut self,
        query_ptr: u32,
        query_len: u32,
        out_ptr_slot: u32,
        out_len_slot: u32,
    ) -> SiftResult<bool> {
        self.stats.record(|s| s.search_calls += 1);
        if self.behavior.trap_on_search {
            return Err(SiftError::Trap("unreachable executed".into()));
        }
        if self.behavior.fail_search {
            return Ok(false);
        }
        let Some(documents) = self.documents.as_ref() else {
            return Ok(false);
        };
        let query = String::from_utf8_lossy(self.bytes(query_ptr, query_len)).to_lowercase();
        let terms: Vec<&str> = query.split_whitespace().collect();
        let ids: Vec<u32> = documents
            .iter()
            .filter(|doc| {
                let text = doc.text.to_lowercase();
                terms.iter().all(|t| text.contains(t))
            })
            .map(|doc| doc.id)
            .collect();

        let payload = if self.behavior.corrupt_search_output {
            b"[1, 2,".to_vec()
        } else {
            serde_json::to_vec(&ids).map_err(|e| SiftError::Decode(e.to_string()))?
        };
        self.emit(&payload, out_ptr_slot, out_len_slot)
    }

    fn get_document(
        &mut self,
        doc_id: u32,
        out_ptr_slot: u32,
        out_len_slot: u32,
    ) -> SiftResult<bool> {
        self.stats.record(|s| s.get_document_calls += 1);
        let text = self
            .documents
            .as_ref()
            .and_then(|docs| docs.iter().find(|d| d.id == doc_id))
            .map(|d| d.text.clone());
        match text {
            Some(text) => self.emit(text.as_bytes(), out_ptr_slot, out_len_slot),
            None => Ok(false),
        }
    }

    fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }
}

// ============================================================================
// MockRuntime
// ============================================================================

/// Runtime producing [`MockModule`]s that share one stats handle.
#[derive(Debug, Default)]
pub struct MockRuntime {
    behavior: MockBehavior,
    stats: StatsHandle,
    instantiations: AtomicUsize,
}

impl MockRuntime {
    /// Runtime whose modules behave per `behavior`.
    pub fn new(behavior: MockBehavior) -> Self {
        MockRuntime {
            behavior,
            stats: StatsHandle::default(),
            instantiations: AtomicUsize::new(0),
        }
    }

    /// Stats shared by every module this runtime created.
    pub fn stats(&self) -> StatsHandle {
        self.stats.clone()
    }

    /// Number of successful instantiations.
    pub fn instantiations(&self) -> usize {
        self.instantiations.load(Ordering::SeqCst)
    }
}

impl ModuleRuntime for MockRuntime {
    fn instantiate(&self, bytes: &[u8]) -> SiftResult<Box<dyn SearchModule>> {
        if bytes.is_empty() {
            return Err(SiftError::Instantiate("empty module".into()));
        }
        self.instantiations.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockModule::with_stats(
            self.behavior.clone(),
            self.stats.clone(),
        )))
    }
}

// ============================================================================
// MemorySource
// ============================================================================

/// Asset source backed by a map of path -> bytes.
#[derive(Debug, Default)]
pub struct MemorySource {
    assets: HashMap<String, Vec<u8>>,
    fetches: AtomicUsize,
}

impl MemorySource {
    /// Empty source; every fetch fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: serve `bytes` at `path`.
    pub fn with(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.assets.insert(path.into(), bytes.into());
        self
    }

    /// Builder: stop serving `path`.
    pub fn without(mut self, path: &str) -> Self {
        self.assets.remove(path);
        self
    }

    /// Number of fetch calls so far.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl AssetSource for MemorySource {
    fn fetch(&self, path: &str) -> SiftResult<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.assets
            .get(path)
            .cloned()
            .ok_or_else(|| SiftError::fetch(path, "404 not found"))
    }

    fn describe(&self, path: &str) -> String {
        format!("memory:{}", path)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Placeholder module bytes accepted by [`MockRuntime`].
pub const MOCK_MODULE_BYTES: &[u8] = b"\0asm-mock";

/// A small blog corpus.
pub fn sample_documents() -> Vec<MockDocument> {
    vec![
        MockDocument {
            id: 1,
            text: "Python problem with type hints and how pydantic re-builds are affected".into(),
        },
        MockDocument {
            id: 2,
            text: "Mini http/1.1 server (in rust): parsing requests and writing responses".into(),
        },
        MockDocument {
            id: 3,
            text: "Notes on rust lifetimes".into(),
        },
        MockDocument {
            id: 4,
            text: "An unmapped draft about rust servers".into(),
        },
    ]
}

/// Mapping file for [`sample_documents`]; document 4 is deliberately absent.
pub fn sample_mapping_json() -> String {
    serde_json::json!({
        "1": {
            "title": "Python problem with type hints and how pydantic re-builds are affected",
            "link": "posts/python-type-hints-and-pydantic-rebuilds/post.html"
        },
        "2": {
            "title": "Mini http/1.1 server (in rust)",
            "link": "posts/http-server-rust/post.html"
        },
        "3": {
            "title": "Notes on rust lifetimes",
            "link": "posts/rust-lifetimes/post.html"
        }
    })
    .to_string()
}

/// Source serving the mock module, the sample index and mapping at the
/// default asset paths.
pub fn sample_source() -> MemorySource {
    let paths = AssetPaths::default();
    MemorySource::new()
        .with(paths.module, MOCK_MODULE_BYTES)
        .with(paths.index, MockModule::index_blob(&sample_documents()))
        .with(paths.mapping, sample_mapping_json())
}
