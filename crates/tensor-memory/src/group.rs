//! Tensor groups: the user-facing unit of planning and execution.
//!
//! A [`MemoryGroup`] is how application code participates in planning: wrap every tensor a
//! kernel allocates scratch storage for in one group, `manage` each tensor before it is written,
//! `finalize_memory` each one once its size is known, then `acquire`/`release` around every
//! execution that actually touches the bound storage.

use std::sync::Arc;

use crate::handle::TensorHandle;
use crate::managed::{GroupId, Mappings, TensorId};
use crate::memory_manager::MemoryManager;
use crate::pool::MemoryPool;

/// A set of tensors planned and executed together.
///
/// A group with no [`MemoryManager`] attached is a valid, inert group: `manage` and
/// `finalize_memory` become no-ops, and the tensors it was asked to track keep whatever storage
/// they already have. This mirrors groups created for kernels that never needed managed scratch
/// memory in the first place.
pub struct MemoryGroup {
    id: GroupId,
    manager: Option<Arc<MemoryManager>>,
    mappings: Mappings,
    leased_pool: Option<Box<dyn MemoryPool>>,
}

impl MemoryGroup {
    /// A fresh group, optionally tied to `manager` for planning.
    pub fn new(manager: Option<Arc<MemoryManager>>) -> Self {
        Self { id: GroupId::next(), manager, mappings: Mappings::new(), leased_pool: None }
    }

    /// This group's opaque identity.
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Register `tensor`'s lifetime as starting now.
    ///
    /// A no-op once this group has already completed a planning pass (its mapping table is no
    /// longer empty) — call on a fresh group, or one that went through
    /// [`release`](MemoryManager::clear) and a fresh lifetime manager, to replan.
    pub fn manage<T>(&mut self, tensor: &T) {
        let Some(manager) = &self.manager else { return };
        if !self.mappings.is_empty() {
            return;
        }
        let mut lifetime_manager = manager.lifetime_manager().lock();
        lifetime_manager.register_group(self.id);
        lifetime_manager.start_lifetime(TensorId::from_ref(tensor));
    }

    /// Close `tensor`'s lifetime: record the handle it should bind to and the size and
    /// alignment it actually needed.
    ///
    /// Like `manage`, a no-op once this group's mapping table is already populated. When this
    /// call closes the last open interval for the group, the lifetime manager hands back a
    /// completed layout, which becomes this group's `mappings`.
    pub fn finalize_memory<T>(&mut self, tensor: &T, handle: Arc<dyn TensorHandle>, size: usize, alignment: usize) {
        let Some(manager) = &self.manager else { return };
        if !self.mappings.is_empty() {
            return;
        }
        let mut lifetime_manager = manager.lifetime_manager().lock();
        if let Some(mappings) = lifetime_manager.end_lifetime(TensorId::from_ref(tensor), handle, size, alignment) {
            drop(lifetime_manager);
            self.mappings = mappings;
        }
    }

    /// True once this group has a completed layout ready to execute against.
    pub fn is_finalized(&self) -> bool {
        !self.mappings.is_empty()
    }

    /// Lease a pool from the attached manager and bind every tensor in this group's layout to
    /// it.
    ///
    /// A no-op if this group has no completed layout yet (nothing to bind). Panics if this group
    /// has a layout but no attached manager, or is already holding a leased pool.
    pub fn acquire(&mut self) {
        if self.mappings.is_empty() {
            return;
        }
        assert!(self.leased_pool.is_none(), "acquire called while a pool is already leased");
        let manager = self.manager.as_ref().expect("acquire called on a group with no memory manager");
        let pool = manager.pool_manager().lock_pool();
        pool.acquire(&self.mappings);
        self.leased_pool = Some(pool);
    }

    /// Unbind this group's tensors and return the leased pool to the manager.
    ///
    /// A no-op if no pool is currently leased (including when `acquire` itself was a no-op).
    pub fn release(&mut self) {
        let Some(pool) = self.leased_pool.take() else { return };
        let manager = self.manager.as_ref().expect("release called on a group with no memory manager");
        pool.release(&self.mappings);
        manager.pool_manager().unlock_pool(pool);
    }
}

/// RAII guard that acquires a [`MemoryGroup`] on construction and releases it on drop.
///
/// Grounded on the acquire/release pairing `MemoryGroup` otherwise leaves to the caller to get
/// right by hand; this makes an early return or a panic mid-execution still release the pool.
pub struct ScopedMemoryGroup<'a> {
    group: &'a mut MemoryGroup,
}

impl<'a> ScopedMemoryGroup<'a> {
    /// Acquire `group` and hold it until this guard drops.
    pub fn new(group: &'a mut MemoryGroup) -> Self {
        group.acquire();
        Self { group }
    }
}

impl std::ops::Deref for ScopedMemoryGroup<'_> {
    type Target = MemoryGroup;

    fn deref(&self) -> &Self::Target {
        self.group
    }
}

impl std::ops::DerefMut for ScopedMemoryGroup<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.group
    }
}

impl Drop for ScopedMemoryGroup<'_> {
    fn drop(&mut self) {
        self.group.release();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::handle::Binding;
    use crate::lifetime::BlobLifetimeManager;
    use crate::raw_allocator::{RawAllocator, SystemAllocator};

    struct RecordingHandle {
        bound_len: AtomicUsize,
    }

    impl RecordingHandle {
        fn new() -> Arc<Self> {
            Arc::new(Self { bound_len: AtomicUsize::new(0) })
        }
    }

    impl TensorHandle for RecordingHandle {
        fn bind(&self, binding: Binding<'_>) {
            let len = match binding {
                Binding::Region(r) => r.len(),
                Binding::Offset(v) => v.len(),
            };
            self.bound_len.store(len, Ordering::SeqCst);
        }

        fn unbind(&self) {
            self.bound_len.store(0, Ordering::SeqCst);
        }
    }

    fn manager() -> Arc<MemoryManager> {
        let allocator: Arc<dyn RawAllocator> = Arc::new(SystemAllocator::new());
        Arc::new(MemoryManager::new(Box::new(BlobLifetimeManager::new()), allocator))
    }

    /// A group with no attached manager lets manage/finalize_memory through as no-ops.
    #[test]
    fn unattached_group_ignores_manage_and_finalize() {
        let mut group = MemoryGroup::new(None);
        let tensor = 1u8;
        group.manage(&tensor);
        group.finalize_memory(&tensor, RecordingHandle::new(), 64, 8);
        assert!(!group.is_finalized());
    }

    /// Matches the upstream `LifetimeManager` unit test's call pattern: three tensors managed
    /// and finalized within one group, interleaved rather than strictly paired up front.
    #[test]
    fn three_interleaved_tensors_all_get_planned() {
        let manager = manager();
        let mut group = MemoryGroup::new(Some(manager));

        let a = 1u8;
        let b = 2u8;
        let c = 3u8;
        let ha = RecordingHandle::new();
        let hb = RecordingHandle::new();
        let hc = RecordingHandle::new();

        group.manage(&a);
        group.manage(&b);
        group.finalize_memory(&a, ha.clone(), 12, 8);
        group.manage(&c);
        group.finalize_memory(&b, hb.clone(), 128, 16);
        group.finalize_memory(&c, hc.clone(), 32, 0);

        assert!(group.is_finalized());
        assert_eq!(group.mappings.len(), 3);
    }

    #[test]
    fn acquire_binds_tensors_and_release_unbinds_them() {
        let manager = manager();
        let mut group = MemoryGroup::new(Some(manager.clone()));

        let a = 1u8;
        let handle = RecordingHandle::new();
        group.manage(&a);
        group.finalize_memory(&a, handle.clone(), 64, 8);
        assert!(group.is_finalized());

        manager.populate(1).unwrap();

        group.acquire();
        assert_eq!(handle.bound_len.load(Ordering::SeqCst), 64);
        group.release();
        assert_eq!(handle.bound_len.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn scoped_group_releases_on_drop() {
        let manager = manager();
        let mut group = MemoryGroup::new(Some(manager.clone()));

        let a = 1u8;
        let handle = RecordingHandle::new();
        group.manage(&a);
        group.finalize_memory(&a, handle.clone(), 64, 8);
        manager.populate(1).unwrap();

        {
            let _scope = ScopedMemoryGroup::new(&mut group);
            assert_eq!(handle.bound_len.load(Ordering::SeqCst), 64);
        }
        assert_eq!(handle.bound_len.load(Ordering::SeqCst), 0);
    }

    /// A group with no manager never gets a non-empty layout, so acquire/release are no-ops
    /// rather than panics.
    #[test]
    fn acquire_and_release_without_manager_are_no_ops() {
        let mut group = MemoryGroup::new(None);
        group.acquire();
        group.release();
    }

    /// Scenario/property 5: releasing a group that was never acquired is a no-op, not a panic.
    #[test]
    fn release_without_acquire_is_a_no_op() {
        let manager = manager();
        let mut group = MemoryGroup::new(Some(manager));
        group.release();
    }
}
