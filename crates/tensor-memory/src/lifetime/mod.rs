//! Lifetime managers: track each tensor's live interval inside a group and compute the
//! minimal pool layout once every interval has closed.

mod blob;
mod offset;

pub use blob::BlobLifetimeManager;
pub use offset::OffsetLifetimeManager;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::handle::TensorHandle;
use crate::managed::{BlobEntry, GroupId, ManagedElement, Mappings, MappingKind, TensorId};
use crate::pool::MemoryPool;
use crate::raw_allocator::RawAllocator;

/// Interface implemented by both the blob and offset lifetime-manager variants.
///
/// Planning is single-threaded per lifetime manager: callers serialize `start_lifetime`/
/// `end_lifetime` for one group at a time (enforced upstream by
/// [`MemoryGroup::manage`](crate::group::MemoryGroup::manage) and
/// [`MemoryGroup::finalize_memory`](crate::group::MemoryGroup::finalize_memory), which both
/// check the group's own mapping table rather than this trait).
pub trait LifetimeManager: Send {
    /// Remember the currently planning group. First caller wins; ignored while a group is
    /// already active.
    fn register_group(&mut self, group: GroupId);

    /// Discard a finalized group's archived tracking state.
    ///
    /// Returns `true` if `group` was found and released.
    fn release_group(&mut self, group: GroupId) -> bool;

    /// The tensor identified by `id` becomes live.
    ///
    /// Panics if `id` is already active — starting the same tensor's lifetime twice is a
    /// programming error.
    fn start_lifetime(&mut self, id: TensorId);

    /// Close the interval for `id`, recording the handle it should be bound to and the size
    /// and alignment it actually needs at execution time.
    ///
    /// Returns `Some(mappings)` once this call closes the *last* open interval for the active
    /// group — at that point a full layout has been computed and `mappings` is ready to hand
    /// to the group. Returns `None` while other tensors in the group are still live.
    ///
    /// Panics if `id` was never started.
    fn end_lifetime(&mut self, id: TensorId, handle: Arc<dyn TensorHandle>, size: usize, alignment: usize) -> Option<Mappings>;

    /// True once every interval opened since the last completed group has been closed.
    ///
    /// Vacuously true when no group is currently being planned.
    fn all_finalized(&self) -> bool;

    /// Build a pool sized for the layout computed so far.
    ///
    /// Panics if [`all_finalized`](LifetimeManager::all_finalized) is false.
    fn create_pool(&self, allocator: Arc<dyn RawAllocator>) -> Result<Box<dyn MemoryPool>>;

    /// The mapping kind this manager produces, and the only kind of pool it can pair with.
    fn mapping_kind(&self) -> MappingKind;
}

/// Interval-tracking bookkeeping shared by both variants.
///
/// Blob selection (which free blob a newly-started tensor reuses) and layout computation
/// (how blobs translate into [`BlobInfo`](crate::managed::BlobInfo)/offsets) are the only parts
/// that differ between variants; this struct implements everything else.
pub(crate) struct LifetimeCore {
    active_group: Option<GroupId>,
    active_elements: HashMap<TensorId, ManagedElement>,
    free_blobs: Vec<BlobEntry>,
    occupied_blobs: Vec<BlobEntry>,
    finalized_groups: HashMap<GroupId, HashMap<TensorId, ManagedElement>>,
}

impl LifetimeCore {
    pub(crate) fn new() -> Self {
        Self {
            active_group: None,
            active_elements: HashMap::new(),
            free_blobs: Vec::new(),
            occupied_blobs: Vec::new(),
            finalized_groups: HashMap::new(),
        }
    }

    pub(crate) fn register_group(&mut self, group: GroupId) {
        if self.active_group.is_none() {
            self.active_group = Some(group);
        }
    }

    pub(crate) fn release_group(&mut self, group: GroupId) -> bool {
        self.finalized_groups.remove(&group).is_some()
    }

    pub(crate) fn start_lifetime(&mut self, id: TensorId) {
        assert!(
            !self.active_elements.contains_key(&id),
            "tensor {id:?} already has an active lifetime"
        );

        if self.free_blobs.is_empty() {
            self.occupied_blobs.insert(0, BlobEntry::new_occupied(id));
        } else {
            let mut blob = self.free_blobs.remove(0);
            blob.owner = Some(id);
            blob.bound.insert(id);
            self.occupied_blobs.insert(0, blob);
        }

        self.active_elements.insert(id, ManagedElement::started());
    }

    /// Record the closing of `id`'s interval. Returns `true` if this was the last open interval
    /// for the active group (the caller should now compute a layout and call
    /// [`finish_group`](LifetimeCore::finish_group)).
    pub(crate) fn end_lifetime(&mut self, id: TensorId, handle: Arc<dyn TensorHandle>, size: usize, alignment: usize) -> bool {
        let element = self
            .active_elements
            .get_mut(&id)
            .unwrap_or_else(|| panic!("end_lifetime called for unknown tensor {id:?}"));
        element.handle = Some(handle);
        element.size = size;
        element.alignment = alignment;
        element.finalized = true;

        let pos = self
            .occupied_blobs
            .iter()
            .position(|b| b.owner == Some(id))
            .expect("tensor with an active lifetime must own an occupied blob");
        let mut blob = self.occupied_blobs.remove(pos);
        blob.bound.insert(id);
        blob.max_size = blob.max_size.max(size);
        blob.max_alignment = blob.max_alignment.max(alignment);
        blob.owner = None;
        self.free_blobs.insert(0, blob);

        self.all_finalized()
    }

    pub(crate) fn finish_group(&mut self) {
        debug_assert!(self.occupied_blobs.is_empty());
        let group = self.active_group.take().expect("finish_group called with no active group");
        let elements = std::mem::take(&mut self.active_elements);
        self.finalized_groups.insert(group, elements);
        self.free_blobs.clear();
    }

    pub(crate) fn all_finalized(&self) -> bool {
        self.active_elements.values().all(|e| e.finalized)
    }

    pub(crate) fn free_blobs(&self) -> &[BlobEntry] {
        &self.free_blobs
    }

    pub(crate) fn free_blobs_mut(&mut self) -> &mut Vec<BlobEntry> {
        &mut self.free_blobs
    }

    pub(crate) fn active_elements(&self) -> &HashMap<TensorId, ManagedElement> {
        &self.active_elements
    }
}
