//! Search module contract
//!
//! The search module is a compiled black box. The host sees it through the
//! export table below and nothing else:
//!
//! | Export         | Signature                                         |
//! |----------------|---------------------------------------------------|
//! | `memory`       | linear memory                                     |
//! | `wasm_alloc`   | `(len) -> ptr`, 0 on failure                      |
//! | `wasm_free`    | `(ptr, len)`, must match a prior `wasm_alloc`     |
//! | `load_index`   | `(ptr, len) -> bool`                              |
//! | `wasm_search`  | `(qptr, qlen, out_ptr_slot, out_len_slot) -> bool`|
//! | `get_document` | `(doc_id, out_ptr_slot, out_len_slot) -> bool`    |
//!
//! `wasm_search` and `get_document` report their payload by writing a
//! little-endian `(ptr, len)` pair into two adjacent u32 slots. The payload
//! buffer is allocated by the module and freed by the host.

use sift_core::SiftResult;

/// Export name of the module allocator.
pub const EXPORT_ALLOC: &str = "wasm_alloc";
/// Export name of the module deallocator.
pub const EXPORT_FREE: &str = "wasm_free";
/// Export name of the index loader.
pub const EXPORT_LOAD_INDEX: &str = "load_index";
/// Export name of the search entry point.
pub const EXPORT_SEARCH: &str = "wasm_search";
/// Export name of the document fetch entry point.
pub const EXPORT_GET_DOCUMENT: &str = "get_document";
/// Export name of the linear memory.
pub const EXPORT_MEMORY: &str = "memory";

/// Size of one output slot (a u32).
pub const SLOT_SIZE: u32 = 4;
/// Size of the `(ptr, len)` output slot pair.
pub const SLOT_PAIR_SIZE: u32 = 2 * SLOT_SIZE;

/// WebAssembly page size (64KiB).
pub const PAGE_SIZE: usize = 65_536;

/// An instantiated search module.
///
/// Calls map one-to-one onto the exports. Every method returns `Err` if the
/// module traps. `memory()`/`memory_mut()` borrow the module's memory as it
/// is *now*; an allocation may grow it, so views must never be held across
/// another call (the borrow checker enforces this).
pub trait SearchModule: Send {
    /// `wasm_alloc(len)`. Returns the raw pointer, 0 meaning failure.
    fn alloc(&mut self, len: u32) -> SiftResult<u32>;

    /// `wasm_free(ptr, len)`.
    fn free(&mut self, ptr: u32, len: u32) -> SiftResult<()>;

    /// `load_index(ptr, len)`.
    fn load_index(&mut self, ptr: u32, len: u32) -> SiftResult<bool>;

    /// `wasm_search(query_ptr, query_len, out_ptr_slot, out_len_slot)`.
    fn search(
        &mut self,
        query_ptr: u32,
        query_len: u32,
        out_ptr_slot: u32,
        out_len_slot: u32,
    ) -> SiftResult<bool>;

    /// `get_document(doc_id, out_ptr_slot, out_len_slot)`.
    fn get_document(&mut self, doc_id: u32, out_ptr_slot: u32, out_len_slot: u32)
        -> SiftResult<bool>;

    /// Current view of linear memory.
    fn memory(&self) -> &[u8];

    /// Current mutable view of linear memory.
    fn memory_mut(&mut self) -> &mut [u8];
}

/// Turns module bytes into a live [`SearchModule`].
///
/// Instantiation happens with no imports.
pub trait ModuleRuntime: Send + Sync {
    /// Compile and instantiate `bytes`.
    fn instantiate(&self, bytes: &[u8]) -> SiftResult<Box<dyn SearchModule>>;
}
