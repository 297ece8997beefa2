//! Wasmtime runtime tests
//!
//! A tiny hand-written module implements the export contract so the real
//! runtime path (compile, instantiate, typed calls, memory growth) is
//! exercised without a prebuilt search module.

use sift_core::{Readiness, SiftError};
use sift_engine::module::SLOT_PAIR_SIZE;
use sift_engine::testing::{sample_mapping_json, MemorySource};
use sift_engine::{AssetPaths, EngineHandle, MemoryBridge, ModuleRuntime, WasmtimeRuntime};

/// Bump allocator that grows memory on demand, a `wasm_search` that always
/// reports `[2]`, and one document (id 2).
const SEARCH_MODULE: &str = r#"
(module
  (memory (export "memory") 1)
  (global $next (mut i32) (i32.const 1024))
  (data (i32.const 16) "[2]")
  (data (i32.const 32) "mini http server")

  (func (export "wasm_alloc") (param $len i32) (result i32)
    (local $ptr i32)
    (local $end i32)
    (local.set $ptr (global.get $next))
    (local.set $end (i32.add (local.get $ptr) (local.get $len)))
    (if (i32.gt_u (local.get $end) (i32.mul (memory.size) (i32.const 65536)))
      (then
        (if (i32.eq
              (memory.grow
                (i32.add
                  (i32.shr_u
                    (i32.sub (local.get $end) (i32.mul (memory.size) (i32.const 65536)))
                    (i32.const 16))
                  (i32.const 1)))
              (i32.const -1))
          (then (return (i32.const 0))))))
    (global.set $next (local.get $end))
    (local.get $ptr))

  (func (export "wasm_free") (param i32 i32))

  (func (export "load_index") (param $ptr i32) (param $len i32) (result i32)
    (i32.ne (local.get $len) (i32.const 0)))

  (func (export "wasm_search")
    (param $q i32) (param $qlen i32) (param $out_ptr i32) (param $out_len i32)
    (result i32)
    (if (i32.eqz (local.get $qlen)) (then (return (i32.const 0))))
    (i32.store (local.get $out_ptr) (i32.const 16))
    (i32.store (local.get $out_len) (i32.const 3))
    (i32.const 1))

  (func (export "get_document")
    (param $id i32) (param $out_ptr i32) (param $out_len i32) (result i32)
    (if (i32.ne (local.get $id) (i32.const 2)) (then (return (i32.const 0))))
    (i32.store (local.get $out_ptr) (i32.const 32))
    (i32.store (local.get $out_len) (i32.const 16))
    (i32.const 1))
)
"#;

fn bridge(runtime: &WasmtimeRuntime) -> MemoryBridge {
    MemoryBridge::new(runtime.instantiate(SEARCH_MODULE.as_bytes()).unwrap())
}

#[test]
fn instantiates_and_reads_static_data() {
    let bridge = bridge(&WasmtimeRuntime::new());
    assert_eq!(bridge.memory_size(), 65_536);
    assert_eq!(bridge.read_string(16, 3).unwrap(), "[2]");
}

#[test]
fn search_reports_payload_through_slots() {
    let mut bridge = bridge(&WasmtimeRuntime::new());
    let mut scope = bridge.scope();
    let query = scope.alloc_bytes(b"rust server").unwrap();
    let slots = scope.alloc(SLOT_PAIR_SIZE).unwrap();

    let ok = scope
        .module()
        .search(query.ptr, query.len, slots.ptr_slot(), slots.len_slot())
        .unwrap();
    assert!(ok);

    let (ptr, len) = scope.read_slots(slots).unwrap();
    assert_eq!((ptr, len), (16, 3));
    let payload = scope.adopt(ptr, len);
    assert_eq!(scope.read_string(payload).unwrap(), "[2]");
}

#[test]
fn empty_query_returns_false() {
    let mut bridge = bridge(&WasmtimeRuntime::new());
    let mut scope = bridge.scope();
    let slots = scope.alloc(SLOT_PAIR_SIZE).unwrap();
    let ok = scope
        .module()
        .search(0, 0, slots.ptr_slot(), slots.len_slot())
        .unwrap();
    assert!(!ok);
}

#[test]
fn get_document_hit_and_miss() {
    let mut bridge = bridge(&WasmtimeRuntime::new());
    let mut scope = bridge.scope();
    let slots = scope.alloc(SLOT_PAIR_SIZE).unwrap();

    assert!(!scope
        .module()
        .get_document(7, slots.ptr_slot(), slots.len_slot())
        .unwrap());
    assert!(scope
        .module()
        .get_document(2, slots.ptr_slot(), slots.len_slot())
        .unwrap());
    let (ptr, len) = scope.read_slots(slots).unwrap();
    let text = scope.adopt(ptr, len);
    assert_eq!(scope.read_string(text).unwrap(), "mini http server");
}

#[test]
fn large_write_lands_after_growth() {
    let mut bridge = bridge(&WasmtimeRuntime::new());
    let payload = vec![0x5A; 100_000];
    let allocation = bridge.allocate(payload.len() as u32).unwrap();
    assert!(bridge.memory_size() > 65_536);

    bridge.write(&allocation, &payload).unwrap();
    assert_eq!(
        bridge
            .read_bytes(allocation.ptr(), allocation.len())
            .unwrap(),
        payload
    );
    bridge.free(allocation).unwrap();
}

#[test]
fn memory_cap_turns_growth_into_allocation_error() {
    let mut bridge = bridge(&WasmtimeRuntime::new().with_max_memory_pages(1));
    let err = bridge.allocate(100_000).unwrap_err();
    assert!(matches!(err, SiftError::Allocation { requested: 100_000 }));
    assert_eq!(bridge.memory_size(), 65_536);
}

#[test]
fn missing_entry_point_is_reported_by_name() {
    let wat = r#"
(module
  (memory (export "memory") 1)
  (func (export "wasm_alloc") (param i32) (result i32) (i32.const 0))
  (func (export "wasm_free") (param i32 i32))
  (func (export "load_index") (param i32 i32) (result i32) (i32.const 1))
  (func (export "wasm_search") (param i32 i32 i32 i32) (result i32) (i32.const 0))
)
"#;
    let err = WasmtimeRuntime::new()
        .instantiate(wat.as_bytes())
        .err()
        .unwrap();
    assert!(matches!(err, SiftError::MissingExport("get_document")));
}

#[test]
fn wrong_signature_is_missing_export() {
    let wat = r#"
(module
  (memory (export "memory") 1)
  (func (export "wasm_alloc") (param i64) (result i64) (i64.const 0))
)
"#;
    let err = WasmtimeRuntime::new()
        .instantiate(wat.as_bytes())
        .err()
        .unwrap();
    assert!(matches!(err, SiftError::MissingExport("wasm_alloc")));
}

#[test]
fn engine_handle_loads_real_module() {
    let paths = AssetPaths::default();
    let source = MemorySource::new()
        .with(paths.module.clone(), SEARCH_MODULE.as_bytes().to_vec())
        .with(paths.index.clone(), vec![1, 2, 3, 4])
        .with(paths.mapping.clone(), sample_mapping_json());

    let handle = EngineHandle::new();
    handle
        .initialize(&source, &WasmtimeRuntime::new(), &paths)
        .unwrap();
    assert_eq!(handle.readiness(), Readiness::Ready);

    let title = handle
        .with_engine(|bridge, mapping| {
            let mut scope = bridge.scope();
            let query = scope.alloc_bytes(b"rust").unwrap();
            let slots = scope.alloc(SLOT_PAIR_SIZE).unwrap();
            assert!(scope
                .module()
                .search(query.ptr, query.len, slots.ptr_slot(), slots.len_slot())
                .unwrap());
            let (ptr, len) = scope.read_slots(slots).unwrap();
            let payload = scope.adopt(ptr, len);
            let ids = scope.read_string(payload).unwrap();
            let ids: Vec<u32> = serde_json::from_str(&ids).unwrap();
            mapping.resolve(ids[0]).display_title()
        })
        .unwrap();
    assert_eq!(title, "Mini http/1.1 server (in rust)");
}

#[test]
fn empty_index_fails_engine() {
    let paths = AssetPaths::default();
    let source = MemorySource::new()
        .with(paths.module.clone(), SEARCH_MODULE.as_bytes().to_vec())
        .with(paths.index.clone(), Vec::new())
        .with(paths.mapping.clone(), sample_mapping_json());

    let handle = EngineHandle::new();
    let err = handle
        .initialize(&source, &WasmtimeRuntime::new(), &paths)
        .unwrap_err();
    assert!(matches!(err, SiftError::IndexLoad));
    assert_eq!(handle.readiness(), Readiness::Failed);
}
