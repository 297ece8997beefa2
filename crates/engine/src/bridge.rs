//! Memory bridge over the module's linear memory
//!
//! The bridge copies bytes in and out of module memory and pairs
//! `wasm_alloc` with `wasm_free`. It keeps no allocation records of its own:
//! ownership is carried by the values it hands out.
//!
//! - [`Allocation`] is move-only and consumed by [`MemoryBridge::free`], so a
//!   buffer cannot be freed twice or used after it was freed.
//! - [`AllocationScope`] owns every buffer acquired through it (including
//!   module-allocated buffers it adopts) and frees them when it drops, on
//!   every exit path.
//!
//! Memory views are resolved per call. An allocation may grow memory and
//! invalidate any view taken before it.

use crate::module::{SearchModule, SLOT_PAIR_SIZE, SLOT_SIZE};
use byteorder::{ByteOrder, LittleEndian};
use sift_core::{SiftError, SiftResult};
use std::ops::Range;

/// Non-owning `(ptr, len)` view of a buffer in module memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Start of the buffer
    pub ptr: u32,
    /// Length in bytes
    pub len: u32,
}

impl Region {
    /// Pointer of the first output slot (the payload pointer).
    pub fn ptr_slot(&self) -> u32 {
        self.ptr
    }

    /// Pointer of the second output slot (the payload length).
    pub fn len_slot(&self) -> u32 {
        self.ptr + SLOT_SIZE
    }
}

/// A buffer in module memory owned by the caller.
///
/// Must be handed back to [`MemoryBridge::free`]. Dropping it unreleased
/// leaks the buffer inside the module and is logged as an error.
#[must_use = "an Allocation must be released with MemoryBridge::free"]
#[derive(Debug)]
pub struct Allocation {
    ptr: u32,
    len: u32,
    released: bool,
}

impl Allocation {
    fn new(ptr: u32, len: u32) -> Self {
        Allocation {
            ptr,
            len,
            released: false,
        }
    }

    fn empty() -> Self {
        Allocation::new(0, 0)
    }

    /// Start of the buffer.
    pub fn ptr(&self) -> u32 {
        self.ptr
    }

    /// Length in bytes.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Zero-length allocations never touch the module.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Non-owning view.
    pub fn region(&self) -> Region {
        Region {
            ptr: self.ptr,
            len: self.len,
        }
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        if !self.released && !self.is_empty() {
            tracing::error!(
                target: "sift::bridge",
                ptr = self.ptr,
                len = self.len,
                "Allocation dropped without being freed"
            );
        }
    }
}

/// Copies data across the module boundary.
pub struct MemoryBridge {
    module: Box<dyn SearchModule>,
}

impl MemoryBridge {
    /// Wrap an instantiated module.
    pub fn new(module: Box<dyn SearchModule>) -> Self {
        MemoryBridge { module }
    }

    /// Direct access to the module exports. Outside this crate, entry points
    /// are reached through [`AllocationScope::module`].
    pub(crate) fn module_mut(&mut self) -> &mut dyn SearchModule {
        self.module.as_mut()
    }

    /// Current size of module memory in bytes.
    pub fn memory_size(&self) -> usize {
        self.module.memory().len()
    }

    /// Request `len` bytes from the module allocator.
    ///
    /// A zero-length request is served without calling the module.
    ///
    /// # Errors
    ///
    /// `SiftError::Allocation` if the allocator returns a null pointer,
    /// `SiftError::Trap` if it traps.
    pub fn allocate(&mut self, len: u32) -> SiftResult<Allocation> {
        if len == 0 {
            return Ok(Allocation::empty());
        }
        let ptr = self.module.alloc(len)?;
        if ptr == 0 {
            tracing::warn!(target: "sift::bridge", len, "Module allocator returned null");
            return Err(SiftError::Allocation {
                requested: len as usize,
            });
        }
        tracing::trace!(target: "sift::bridge", ptr, len, "alloc");
        Ok(Allocation::new(ptr, len))
    }

    /// Copy `bytes` into `allocation`. Lengths must match exactly.
    pub fn write(&mut self, allocation: &Allocation, bytes: &[u8]) -> SiftResult<()> {
        if bytes.len() != allocation.len as usize {
            return Err(SiftError::LengthMismatch {
                expected: allocation.len,
                actual: bytes.len(),
            });
        }
        if bytes.is_empty() {
            return Ok(());
        }
        let memory = self.module.memory_mut();
        let range = checked_range(memory.len(), allocation.ptr, allocation.len)?;
        memory[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Release `allocation` back to the module.
    pub fn free(&mut self, mut allocation: Allocation) -> SiftResult<()> {
        allocation.released = true;
        if allocation.is_empty() {
            return Ok(());
        }
        tracing::trace!(target: "sift::bridge", ptr = allocation.ptr, len = allocation.len, "free");
        self.module.free(allocation.ptr, allocation.len)
    }

    /// Copy `len` bytes out of module memory.
    pub fn read_bytes(&self, ptr: u32, len: u32) -> SiftResult<Vec<u8>> {
        let memory = self.module.memory();
        let range = checked_range(memory.len(), ptr, len)?;
        Ok(memory[range].to_vec())
    }

    /// Copy `len` bytes out of module memory as UTF-8.
    pub fn read_string(&self, ptr: u32, len: u32) -> SiftResult<String> {
        Ok(String::from_utf8(self.read_bytes(ptr, len)?)?)
    }

    /// Decode the little-endian `(ptr, len)` pair written into `slots`.
    pub fn read_slots(&self, slots: Region) -> SiftResult<(u32, u32)> {
        if slots.len < SLOT_PAIR_SIZE {
            return Err(SiftError::LengthMismatch {
                expected: SLOT_PAIR_SIZE,
                actual: slots.len as usize,
            });
        }
        let raw = self.read_bytes(slots.ptr, SLOT_PAIR_SIZE)?;
        let ptr = LittleEndian::read_u32(&raw[..SLOT_SIZE as usize]);
        let len = LittleEndian::read_u32(&raw[SLOT_SIZE as usize..]);
        Ok((ptr, len))
    }

    /// Open an allocation scope.
    pub fn scope(&mut self) -> AllocationScope<'_> {
        AllocationScope {
            bridge: self,
            live: Vec::new(),
        }
    }
}

fn checked_range(memory_size: usize, ptr: u32, len: u32) -> SiftResult<Range<usize>> {
    let start = ptr as usize;
    let end = start
        .checked_add(len as usize)
        .filter(|end| *end <= memory_size)
        .ok_or(SiftError::OutOfBounds {
            ptr,
            len,
            memory_size,
        })?;
    Ok(start..end)
}

/// Scoped acquisition of module buffers.
///
/// Every buffer acquired or adopted through the scope is freed, newest
/// first, when the scope drops.
pub struct AllocationScope<'b> {
    bridge: &'b mut MemoryBridge,
    live: Vec<Allocation>,
}

impl<'b> AllocationScope<'b> {
    /// Allocate `len` bytes owned by the scope.
    pub fn alloc(&mut self, len: u32) -> SiftResult<Region> {
        let allocation = self.bridge.allocate(len)?;
        let region = allocation.region();
        self.live.push(allocation);
        Ok(region)
    }

    /// Allocate a buffer the size of `bytes` and copy `bytes` into it.
    pub fn alloc_bytes(&mut self, bytes: &[u8]) -> SiftResult<Region> {
        let len = u32::try_from(bytes.len()).map_err(|_| SiftError::Allocation {
            requested: bytes.len(),
        })?;
        let allocation = self.bridge.allocate(len)?;
        let written = self.bridge.write(&allocation, bytes);
        let region = allocation.region();
        self.live.push(allocation);
        written.map(|()| region)
    }

    /// Take ownership of a buffer the module allocated on our behalf.
    pub fn adopt(&mut self, ptr: u32, len: u32) -> Region {
        let allocation = if len == 0 {
            Allocation::empty()
        } else {
            Allocation::new(ptr, len)
        };
        let region = allocation.region();
        self.live.push(allocation);
        region
    }

    /// The module, for calling entry points with scope-owned buffers.
    pub fn module(&mut self) -> &mut dyn SearchModule {
        self.bridge.module_mut()
    }

    /// See [`MemoryBridge::read_bytes`].
    pub fn read_bytes(&self, region: Region) -> SiftResult<Vec<u8>> {
        self.bridge.read_bytes(region.ptr, region.len)
    }

    /// See [`MemoryBridge::read_string`].
    pub fn read_string(&self, region: Region) -> SiftResult<String> {
        self.bridge.read_string(region.ptr, region.len)
    }

    /// See [`MemoryBridge::read_slots`].
    pub fn read_slots(&self, slots: Region) -> SiftResult<(u32, u32)> {
        self.bridge.read_slots(slots)
    }

    /// Buffers currently owned by the scope.
    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|a| !a.is_empty()).count()
    }
}

impl Drop for AllocationScope<'_> {
    fn drop(&mut self) {
        while let Some(allocation) = self.live.pop() {
            let (ptr, len) = (allocation.ptr, allocation.len);
            if let Err(e) = self.bridge.free(allocation) {
                tracing::warn!(target: "sift::bridge", ptr, len, error = %e, "Failed to free module buffer");
            }
        }
    }
}
