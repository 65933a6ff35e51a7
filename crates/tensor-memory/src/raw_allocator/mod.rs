//! Raw allocator abstraction: the only point of contact between the planner and a backend's
//! actual storage.
//!
//! The planner never dereferences the pointers it hands out; it only asks a [`RawAllocator`]
//! for aligned regions and relies on [`Region`] to expose their address and length to the
//! pools built on top of it.

#![allow(unsafe_code)]

mod system;

use std::sync::Arc;

pub use system::SystemAllocator;

use crate::error::{MemoryError, Result};

/// Anything that can describe a contiguous span of backing memory.
///
/// Implemented by both owned regions (backed by an allocation, freed on drop) and
/// non-owning views into a larger arena (the offset pool's per-tensor windows).
pub trait Region: Send + Sync {
    /// Address of the first byte of the region.
    fn as_ptr(&self) -> *mut u8;

    /// Length of the region in bytes.
    fn len(&self) -> usize;

    /// True if the region spans zero bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A non-owning view into someone else's region, e.g. a tensor's slice of an offset arena.
///
/// Carries no destructor; the arena it points into is responsible for its own lifetime.
#[derive(Debug, Clone, Copy)]
pub struct RegionView {
    ptr: *mut u8,
    len: usize,
}

impl RegionView {
    /// # Safety
    /// `ptr` must be valid for reads/writes of `len` bytes for as long as this view is used.
    pub unsafe fn new(ptr: *mut u8, len: usize) -> Self {
        Self { ptr, len }
    }
}

// SAFETY: RegionView is a plain (pointer, length) pair; it performs no I/O and does not
// dereference the pointer itself. Callers are responsible for synchronizing access to the
// memory it describes (see the Memory Group acquire/release window).
unsafe impl Send for RegionView {}
unsafe impl Sync for RegionView {}

impl Region for RegionView {
    fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Interface a backend implements to provide aligned raw memory to the planner.
///
/// The core ships one implementation, [`SystemAllocator`], backed by the host's global
/// allocator. Other backends (OpenCL device memory, GLES buffers, ...) are expected to
/// provide their own and are out of scope for this crate.
pub trait RawAllocator: Send + Sync {
    /// Allocate `size` bytes aligned to `alignment` (a power of two).
    fn allocate(&self, size: usize, alignment: usize) -> Result<std::ptr::NonNull<u8>>;

    /// Free a region previously returned by [`RawAllocator::allocate`] on `self` with the same
    /// `size`/`alignment`.
    ///
    /// # Safety
    /// `ptr` must have been obtained from this same allocator with an identical
    /// `(size, alignment)` pair, and must not already have been freed.
    unsafe fn free(&self, ptr: std::ptr::NonNull<u8>, size: usize, alignment: usize);
}

/// An owned memory region: frees itself through its allocator on drop.
pub struct OwnedRegion {
    allocator: Arc<dyn RawAllocator>,
    ptr: std::ptr::NonNull<u8>,
    size: usize,
    alignment: usize,
}

impl OwnedRegion {
    /// Non-owning view of `size` bytes starting at `offset` inside this region.
    ///
    /// Used by the offset pool to hand each tensor a window into the shared arena.
    pub fn extract_subregion(&self, offset: usize, size: usize) -> RegionView {
        assert!(
            offset + size <= self.size,
            "subregion [{offset}, {offset_end}) out of bounds of region of size {region_size}",
            offset_end = offset + size,
            region_size = self.size,
        );
        // SAFETY: offset + size is within the allocation's bounds, checked above, and the
        // returned view cannot outlive borrows of `self` any more strictly than a raw pointer
        // normally would — callers uphold the same access discipline documented on `RegionView`.
        unsafe { RegionView::new(self.ptr.as_ptr().add(offset), size) }
    }
}

impl Region for OwnedRegion {
    fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    fn len(&self) -> usize {
        self.size
    }
}

impl Drop for OwnedRegion {
    fn drop(&mut self) {
        // SAFETY: `ptr` was returned by `allocator.allocate(size, alignment)` in `make_region`
        // and has not been freed before (OwnedRegion has no Clone).
        unsafe { self.allocator.free(self.ptr, self.size, self.alignment) };
    }
}

/// Allocate a region of `size` bytes aligned to `alignment` from `allocator`, wrapped so it
/// frees itself on drop.
pub fn make_region(allocator: Arc<dyn RawAllocator>, size: usize, alignment: usize) -> Result<OwnedRegion> {
    let ptr = allocator.allocate(size, alignment)?;
    Ok(OwnedRegion { allocator, ptr, size, alignment })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subregion_reads_back_bytes_written_to_parent() {
        let allocator: Arc<dyn RawAllocator> = Arc::new(SystemAllocator::new());
        let region = make_region(allocator, 64, 8).unwrap();
        unsafe {
            region.as_ptr().add(16).write(0xAB);
        }
        let view = region.extract_subregion(16, 8);
        unsafe {
            assert_eq!(view.as_ptr().read(), 0xAB);
        }
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn subregion_rejects_out_of_bounds_window() {
        let allocator: Arc<dyn RawAllocator> = Arc::new(SystemAllocator::new());
        let region = make_region(allocator, 16, 8).unwrap();
        let _ = region.extract_subregion(8, 16);
    }
}
