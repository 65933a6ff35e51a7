//! Offset variant: a single arena, tensors packed at disjoint byte offsets.

use std::sync::Arc;

use super::MemoryPool;
use crate::error::Result;
use crate::handle::Binding;
use crate::managed::{BlobInfo, Mappings, MappingKind};
use crate::raw_allocator::{make_region, OwnedRegion, RawAllocator};

/// A single arena sized to hold every tensor the
/// [`OffsetLifetimeManager`](crate::lifetime::OffsetLifetimeManager) packed into it.
pub struct OffsetPool {
    allocator: Arc<dyn RawAllocator>,
    arena: OwnedRegion,
    blob_info: BlobInfo,
}

impl OffsetPool {
    /// Allocate an arena of `blob_info.size` bytes aligned to `blob_info.alignment`.
    ///
    /// The arena itself is allocated at that alignment (not just the per-tensor offsets
    /// within it) — the upstream design this pool is grounded on allocates the arena with no
    /// alignment request at all and relies on offsets alone, which only produces aligned
    /// tensor addresses if the arena's base happens to already satisfy the alignment. Aligning
    /// the arena allocation itself closes that gap; see `DESIGN.md`.
    pub fn new(allocator: Arc<dyn RawAllocator>, blob_info: BlobInfo) -> Result<Self> {
        let arena = make_region(allocator.clone(), blob_info.size, blob_info.alignment)?;
        Ok(Self { allocator, arena, blob_info })
    }
}

impl MemoryPool for OffsetPool {
    fn acquire(&self, mappings: &Mappings) {
        for mapping in mappings {
            let view = self.arena.extract_subregion(mapping.slot, mapping.size);
            mapping.handle.bind(Binding::Offset(view));
        }
    }

    fn release(&self, mappings: &Mappings) {
        for mapping in mappings {
            mapping.handle.unbind();
        }
    }

    fn mapping_kind(&self) -> MappingKind {
        MappingKind::Offset
    }

    fn duplicate(&self) -> Result<Box<dyn MemoryPool>> {
        Ok(Box::new(Self::new(self.allocator.clone(), self.blob_info)?))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::handle::TensorHandle;
    use crate::managed::Mapping;
    use crate::raw_allocator::{Region, SystemAllocator};

    struct RecordingHandle {
        bound_len: AtomicUsize,
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

    #[test]
    fn acquire_binds_handle_to_window_at_offset() {
        let allocator: Arc<dyn RawAllocator> = Arc::new(SystemAllocator::new());
        let pool = OffsetPool::new(allocator, BlobInfo { size: 256, alignment: 32, owners: 2 }).unwrap();

        let handle = Arc::new(RecordingHandle { bound_len: AtomicUsize::new(0) });
        let mappings: Mappings = vec![Mapping { handle: handle.clone(), slot: 32, size: 100 }];

        pool.acquire(&mappings);
        assert_eq!(handle.bound_len.load(Ordering::SeqCst), 100);

        pool.release(&mappings);
        assert_eq!(handle.bound_len.load(Ordering::SeqCst), 0);
    }
}
