//! Blob-per-tensor-class lifetime manager.

use std::sync::Arc;

use super::{LifetimeCore, LifetimeManager};
use crate::error::Result;
use crate::handle::TensorHandle;
use crate::managed::{BlobInfo, GroupId, Mapping, Mappings, MappingKind, TensorId};
use crate::pool::{BlobPool, MemoryPool};
use crate::raw_allocator::RawAllocator;

/// Computes a layout as a list of independently-allocated blobs, one per class of
/// non-overlapping tensors.
///
/// Reusing one manager across several groups never shrinks the blob list: each blob's
/// size and alignment is the element-wise max across every group planned so far. A group
/// that happens to need unusually large tensors once will keep the manager allocating at
/// that peak forever; see `DESIGN.md` for why this is preserved rather than "fixed".
pub struct BlobLifetimeManager {
    core: LifetimeCore,
    blobs: Vec<BlobInfo>,
}

impl BlobLifetimeManager {
    /// An empty manager, ready to plan its first group.
    pub fn new() -> Self {
        Self { core: LifetimeCore::new(), blobs: Vec::new() }
    }

    /// The blob layout computed so far, indexed the same way `Mapping::slot` is.
    pub fn blob_list(&self) -> &[BlobInfo] {
        &self.blobs
    }

    fn update_layout_and_mappings(&mut self) -> Mappings {
        self.core.free_blobs_mut().sort_by(|a, b| b.max_size.cmp(&a.max_size));

        let group_sizes: Vec<BlobInfo> = self
            .core
            .free_blobs()
            .iter()
            .map(|b| BlobInfo { size: b.max_size, alignment: b.max_alignment, owners: 1 })
            .collect();

        let max_len = self.blobs.len().max(group_sizes.len());
        self.blobs.resize(max_len, BlobInfo::default());
        let mut group_sizes = group_sizes;
        group_sizes.resize(max_len, BlobInfo::default());
        for (stored, fresh) in self.blobs.iter_mut().zip(group_sizes) {
            *stored = stored.elementwise_max(fresh);
        }

        let mut mappings = Mappings::new();
        for (slot, blob) in self.core.free_blobs().iter().enumerate() {
            for &id in &blob.bound {
                let element = &self.core.active_elements()[&id];
                let handle = element.handle.clone().expect("finalized element must carry a handle");
                mappings.push(Mapping { handle, slot, size: element.size });
            }
        }
        mappings
    }
}

impl Default for BlobLifetimeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LifetimeManager for BlobLifetimeManager {
    fn register_group(&mut self, group: GroupId) {
        self.core.register_group(group);
    }

    fn release_group(&mut self, group: GroupId) -> bool {
        self.core.release_group(group)
    }

    fn start_lifetime(&mut self, id: TensorId) {
        self.core.start_lifetime(id);
    }

    fn end_lifetime(&mut self, id: TensorId, handle: Arc<dyn TensorHandle>, size: usize, alignment: usize) -> Option<Mappings> {
        let ready = self.core.end_lifetime(id, handle, size, alignment);
        if !ready {
            return None;
        }
        let mappings = self.update_layout_and_mappings();
        #[cfg(feature = "logging")]
        nebula_log::debug!(blobs = self.blobs.len(), "recomputed blob layout");
        self.core.finish_group();
        Some(mappings)
    }

    fn all_finalized(&self) -> bool {
        self.core.all_finalized()
    }

    fn create_pool(&self, allocator: Arc<dyn RawAllocator>) -> Result<Box<dyn MemoryPool>> {
        assert!(self.all_finalized(), "create_pool requires all registered tensors to be finalized");
        Ok(Box::new(BlobPool::new(allocator, self.blobs.clone())?))
    }

    fn mapping_kind(&self) -> MappingKind {
        MappingKind::Blob
    }
}
