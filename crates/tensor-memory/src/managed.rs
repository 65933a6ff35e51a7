//! Planner-internal bookkeeping types shared by both lifetime-manager variants.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::handle::TensorHandle;

/// Opaque identity of a tensor inside a lifetime manager.
///
/// Two tensors compare equal only if they are the same object; the planner never reads
/// through this value, it only uses it as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorId(usize);

impl TensorId {
    /// Derive an identity from a tensor's own address.
    pub fn from_ref<T>(tensor: &T) -> Self {
        Self(tensor as *const T as usize)
    }
}

/// Opaque identity of a [`MemoryGroup`](crate::group::MemoryGroup), assigned at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

impl GroupId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Which layout strategy produced a set of mappings, or which kind a pool accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKind {
    /// One physical region per class of non-overlapping tensors.
    Blob,
    /// A single arena; tensors are packed at disjoint byte offsets.
    Offset,
}

/// Per-tensor physical layout: size, alignment, and how many tensors may share it at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlobInfo {
    /// Size in bytes the backing region must be.
    pub size: usize,
    /// Alignment in bytes the backing region must satisfy.
    pub alignment: usize,
    /// Number of tensors bound to this blob in parallel (relevant to the offset variant, where
    /// it tracks how many disjoint intervals were packed into the arena).
    pub owners: usize,
}

impl BlobInfo {
    pub(crate) fn elementwise_max(self, other: Self) -> Self {
        Self {
            size: self.size.max(other.size),
            alignment: self.alignment.max(other.alignment),
            owners: self.owners.max(other.owners),
        }
    }
}

/// Planning-time record of one tensor's lifetime.
pub(crate) struct ManagedElement {
    pub handle: Option<Arc<dyn TensorHandle>>,
    pub size: usize,
    pub alignment: usize,
    pub finalized: bool,
}

impl ManagedElement {
    pub(crate) fn started() -> Self {
        Self { handle: None, size: 0, alignment: 0, finalized: false }
    }
}

/// Planning-time record of one physical buffer candidate.
pub(crate) struct BlobEntry {
    pub owner: Option<TensorId>,
    pub max_size: usize,
    pub max_alignment: usize,
    pub bound: HashSet<TensorId>,
}

impl BlobEntry {
    pub(crate) fn new_occupied(owner: TensorId) -> Self {
        let mut bound = HashSet::new();
        bound.insert(owner);
        Self { owner: Some(owner), max_size: 0, max_alignment: 0, bound }
    }
}

/// One resolved tensor-handle-to-slot binding, produced by a lifetime manager when a group
/// finishes planning.
///
/// `slot` means a blob index for [`MappingKind::Blob`] mappings and a byte offset for
/// [`MappingKind::Offset`] mappings. `size` is carried along so the offset pool can hand out a
/// bounded [`RegionView`](crate::raw_allocator::RegionView) rather than just a bare pointer.
pub struct Mapping {
    /// The tensor handle this slot is bound to.
    pub handle: Arc<dyn TensorHandle>,
    /// Blob index (Blob variant) or byte offset (Offset variant).
    pub slot: usize,
    /// The size, in bytes, the tensor bound to this slot actually needed when finalized.
    pub size: usize,
}

/// The full set of handle/slot bindings computed for one group.
pub type Mappings = Vec<Mapping>;
