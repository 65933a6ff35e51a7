//! System allocator implementation.
//!
//! Delegates to the host's global allocator (`std::alloc::System`). This is the one raw
//! allocator the core ships directly; device-backed allocators (OpenCL, GLES, ...) are
//! supplied by the caller and implement [`RawAllocator`] themselves.

use std::alloc::{Layout, System};
use std::ptr::NonNull;

use super::RawAllocator;
use crate::error::{MemoryError, Result};

/// Raw allocator backed by the host's global allocator.
///
/// # Thread Safety
/// Inherently thread-safe: it delegates to the platform allocator, which already
/// synchronizes concurrent allocations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl SystemAllocator {
    /// Creates a new `SystemAllocator`. Zero-cost; the type carries no state.
    #[inline]
    pub const fn new() -> Self {
        SystemAllocator
    }
}

impl RawAllocator for SystemAllocator {
    fn allocate(&self, size: usize, alignment: usize) -> Result<NonNull<u8>> {
        let alignment = alignment.max(1);
        let layout = Layout::from_size_align(size, alignment).map_err(|_| MemoryError::AllocFailed { size, alignment })?;

        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }

        // SAFETY: layout has non-zero size, validated above.
        let ptr = unsafe { std::alloc::GlobalAlloc::alloc(&System, layout) };
        NonNull::new(ptr).ok_or(MemoryError::AllocFailed { size, alignment })
    }

    unsafe fn free(&self, ptr: NonNull<u8>, size: usize, alignment: usize) {
        let alignment = alignment.max(1);
        if size == 0 {
            return;
        }
        let layout = Layout::from_size_align(size, alignment).expect("layout was valid at allocation time");
        // SAFETY: caller guarantees `ptr` came from `allocate` with this exact (size, alignment).
        unsafe { std::alloc::GlobalAlloc::dealloc(&System, ptr.as_ptr(), layout) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_and_frees() {
        let allocator = SystemAllocator::new();
        let ptr = allocator.allocate(64, 8).unwrap();
        unsafe {
            ptr.as_ptr().write_bytes(0xCD, 64);
            allocator.free(ptr, 64, 8);
        }
    }

    #[test]
    fn zero_sized_allocation_does_not_crash() {
        let allocator = SystemAllocator::new();
        let ptr = allocator.allocate(0, 8).unwrap();
        unsafe {
            allocator.free(ptr, 0, 8);
        }
    }

    #[test]
    fn rejects_non_power_of_two_alignment() {
        let allocator = SystemAllocator::new();
        assert!(allocator.allocate(8, 3).is_err());
    }

    #[test]
    fn thread_safety_markers() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<SystemAllocator>();
        assert_sync::<SystemAllocator>();
    }
}
