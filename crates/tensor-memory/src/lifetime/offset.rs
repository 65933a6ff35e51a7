//! Offset-in-single-arena lifetime manager.

use std::sync::Arc;

use super::{LifetimeCore, LifetimeManager};
use crate::error::Result;
use crate::handle::TensorHandle;
use crate::managed::{BlobInfo, GroupId, Mapping, Mappings, MappingKind, TensorId};
use crate::pool::{MemoryPool, OffsetPool};
use crate::raw_allocator::RawAllocator;

fn align_offset(offset: usize, alignment: usize) -> usize {
    if alignment == 0 {
        return offset;
    }
    let remainder = offset % alignment;
    if remainder == 0 {
        offset
    } else {
        offset + (alignment - remainder)
    }
}

/// Computes a layout as a single arena with tensors packed at disjoint byte offsets.
///
/// Like [`BlobLifetimeManager`](crate::lifetime::BlobLifetimeManager), the arena only ever
/// grows across reused groups: `size`, `alignment`, and `owners` are each a running max.
pub struct OffsetLifetimeManager {
    core: LifetimeCore,
    blob: BlobInfo,
}

impl OffsetLifetimeManager {
    /// An empty manager, ready to plan its first group.
    pub fn new() -> Self {
        Self { core: LifetimeCore::new(), blob: BlobInfo::default() }
    }

    fn update_layout_and_mappings(&mut self) -> Mappings {
        let mut max_aggregated_size = 0usize;
        let mut arena_alignment = self.blob.alignment;
        for b in self.core.free_blobs() {
            max_aggregated_size += b.max_size;
            arena_alignment = arena_alignment.max(b.max_alignment);
        }
        max_aggregated_size += self.core.free_blobs().len() * arena_alignment;

        self.blob.alignment = arena_alignment;
        self.blob.owners = self.blob.owners.max(self.core.free_blobs().len());
        self.blob.size = self.blob.size.max(max_aggregated_size);

        let mut mappings = Mappings::new();
        let mut offset = 0usize;
        for blob in self.core.free_blobs() {
            for &id in &blob.bound {
                let element = &self.core.active_elements()[&id];
                let handle = element.handle.clone().expect("finalized element must carry a handle");
                mappings.push(Mapping { handle, slot: offset, size: element.size });
            }
            offset += blob.max_size;
            offset = align_offset(offset, arena_alignment);
            assert!(offset <= self.blob.size, "computed offset exceeds arena size");
        }
        mappings
    }
}

impl Default for OffsetLifetimeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LifetimeManager for OffsetLifetimeManager {
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
        nebula_log::debug!(arena_size = self.blob.size, "recomputed arena layout");
        self.core.finish_group();
        Some(mappings)
    }

    fn all_finalized(&self) -> bool {
        self.core.all_finalized()
    }

    fn create_pool(&self, allocator: Arc<dyn RawAllocator>) -> Result<Box<dyn MemoryPool>> {
        assert!(self.all_finalized(), "create_pool requires all registered tensors to be finalized");
        Ok(Box::new(OffsetPool::new(allocator, self.blob)?))
    }

    fn mapping_kind(&self) -> MappingKind {
        MappingKind::Offset
    }
}
