//! Wasmtime-backed module runtime
//!
//! Compiles the search module with wasmtime, instantiates it with an empty
//! import list and resolves the export table once. Memory growth is capped
//! through `StoreLimits` when a page budget is configured.

use crate::module::{
    ModuleRuntime, SearchModule, EXPORT_ALLOC, EXPORT_FREE, EXPORT_GET_DOCUMENT,
    EXPORT_LOAD_INDEX, EXPORT_MEMORY, EXPORT_SEARCH, PAGE_SIZE,
};
use sift_core::{SiftError, SiftResult};
use wasmtime::{
    Engine, Instance, Memory, Module, Store, StoreLimits, StoreLimitsBuilder, TypedFunc,
    WasmParams, WasmResults,
};

/// Runtime that instantiates modules with wasmtime.
#[derive(Clone)]
pub struct WasmtimeRuntime {
    engine: Engine,
    max_memory_pages: Option<u32>,
}

impl WasmtimeRuntime {
    /// Runtime with default engine settings and no memory cap.
    pub fn new() -> Self {
        WasmtimeRuntime {
            engine: Engine::default(),
            max_memory_pages: None,
        }
    }

    /// Cap linear memory at `pages` 64KiB pages.
    pub fn with_max_memory_pages(mut self, pages: u32) -> Self {
        self.max_memory_pages = Some(pages);
        self
    }

    /// Configured memory cap, if any.
    pub fn max_memory_pages(&self) -> Option<u32> {
        self.max_memory_pages
    }

    fn limits(&self) -> StoreLimits {
        let mut builder = StoreLimitsBuilder::new();
        if let Some(pages) = self.max_memory_pages {
            builder = builder.memory_size(pages as usize * PAGE_SIZE);
        }
        builder.build()
    }
}

impl Default for WasmtimeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRuntime for WasmtimeRuntime {
    fn instantiate(&self, bytes: &[u8]) -> SiftResult<Box<dyn SearchModule>> {
        let module =
            Module::new(&self.engine, bytes).map_err(|e| SiftError::Instantiate(e.to_string()))?;

        let mut store = Store::new(&self.engine, self.limits());
        store.limiter(|limits| limits);

        let instance = Instance::new(&mut store, &module, &[])
            .map_err(|e| SiftError::Instantiate(e.to_string()))?;

        let memory = instance
            .get_memory(&mut store, EXPORT_MEMORY)
            .ok_or(SiftError::MissingExport(EXPORT_MEMORY))?;

        let exports = Exports {
            alloc: typed(&instance, &mut store, EXPORT_ALLOC)?,
            free: typed(&instance, &mut store, EXPORT_FREE)?,
            load_index: typed(&instance, &mut store, EXPORT_LOAD_INDEX)?,
            search: typed(&instance, &mut store, EXPORT_SEARCH)?,
            get_document: typed(&instance, &mut store, EXPORT_GET_DOCUMENT)?,
        };

        tracing::debug!(
            target: "sift::engine",
            bytes = bytes.len(),
            memory = memory.data_size(&store),
            "Search module instantiated"
        );

        Ok(Box::new(WasmModule {
            store,
            memory,
            exports,
        }))
    }
}

fn typed<P, R>(
    instance: &Instance,
    store: &mut Store<StoreLimits>,
    name: &'static str,
) -> SiftResult<TypedFunc<P, R>>
where
    P: WasmParams,
    R: WasmResults,
{
    instance.get_typed_func::<P, R>(store, name).map_err(|e| {
        tracing::debug!(target: "sift::engine", export = name, error = %e, "Export lookup failed");
        SiftError::MissingExport(name)
    })
}

struct Exports {
    alloc: TypedFunc<u32, u32>,
    free: TypedFunc<(u32, u32), ()>,
    load_index: TypedFunc<(u32, u32), u32>,
    search: TypedFunc<(u32, u32, u32, u32), u32>,
    get_document: TypedFunc<(u32, u32, u32), u32>,
}

/// A search module instantiated by wasmtime.
pub struct WasmModule {
    store: Store<StoreLimits>,
    memory: Memory,
    exports: Exports,
}

fn trap(e: wasmtime::Error) -> SiftError {
    SiftError::Trap(e.to_string())
}

impl SearchModule for WasmModule {
    fn alloc(&mut self, len: u32) -> SiftResult<u32> {
        self.exports.alloc.call(&mut self.store, len).map_err(trap)
    }

    fn free(&mut self, ptr: u32, len: u32) -> SiftResult<()> {
        self.exports.free.call(&mut self.store, (ptr, len)).map_err(trap)
    }

    fn load_index(&mut self, ptr: u32, len: u32) -> SiftResult<bool> {
        let ok = self
            .exports
            .load_index
            .call(&mut self.store, (ptr, len))
            .map_err(trap)?;
        Ok(ok != 0)
    }

    fn search(
        &mut self,
        query_ptr: u32,
        query_len: u32,
        out_ptr_slot: u32,
        out_len_slot: u32,
    ) -> SiftResult<bool> {
        let ok = self
            .exports
            .search
            .call(
                &mut self.store,
                (query_ptr, query_len, out_ptr_slot, out_len_slot),
            )
            .map_err(trap)?;
        Ok(ok != 0)
    }

    fn get_document(
        &mut self,
        doc_id: u32,
        out_ptr_slot: u32,
        out_len_slot: u32,
    ) -> SiftResult<bool> {
        let ok = self
            .exports
            .get_document
            .call(&mut self.store, (doc_id, out_ptr_slot, out_len_slot))
            .map_err(trap)?;
        Ok(ok != 0)
    }

    fn memory(&self) -> &[u8] {
        self.memory.data(&self.store)
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        self.memory.data_mut(&mut self.store)
    }
}
