//! The tensor-side half of the acquire/release contract.
//!
//! A [`TensorHandle`] is how a pool tells a tensor where its storage lives. The planner never
//! constructs or dereferences one; it only stores `Arc<dyn TensorHandle>` values it was handed
//! by the caller and calls back into them during [`MemoryPool::acquire`](crate::pool::MemoryPool::acquire)
//! and [`MemoryPool::release`](crate::pool::MemoryPool::release).

use crate::raw_allocator::{Region, RegionView};

/// What a pool hands a tensor handle when binding it to backing storage.
pub enum Binding<'a> {
    /// The handle owns an entire blob region (blob-variant pools).
    Region(&'a dyn Region),
    /// The handle owns a byte-range window into a shared arena (offset-variant pools).
    Offset(RegionView),
}

/// Interface a backend's tensor storage type implements so the planner can program it.
///
/// Implementations typically wrap a raw pointer behind whatever synchronization or
/// device-specific bookkeeping the backend needs; the core only ever calls `bind`/`unbind`
/// inside a [`MemoryGroup::acquire`](crate::group::MemoryGroup::acquire)/
/// [`release`](crate::group::MemoryGroup::release) pair, so implementations may assume calls
/// alternate and are not reentrant for the same handle.
pub trait TensorHandle: Send + Sync {
    /// Point this handle's storage at `binding`.
    fn bind(&self, binding: Binding<'_>);

    /// Clear this handle's storage. Must be safe to call even if `bind` was never called.
    fn unbind(&self);
}
