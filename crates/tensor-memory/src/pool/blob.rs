//! Blob variant: one physical region per class of non-overlapping tensors.

use std::sync::Arc;

use super::MemoryPool;
use crate::error::Result;
use crate::handle::Binding;
use crate::managed::{BlobInfo, Mappings, MappingKind};
use crate::raw_allocator::{make_region, OwnedRegion, RawAllocator};

/// A pool of independently-allocated blobs, one per [`BlobInfo`] entry a
/// [`BlobLifetimeManager`](crate::lifetime::BlobLifetimeManager) computed.
pub struct BlobPool {
    allocator: Arc<dyn RawAllocator>,
    blobs: Vec<OwnedRegion>,
    blob_info: Vec<BlobInfo>,
}

impl BlobPool {
    /// Allocate one region per entry in `blob_info`.
    pub fn new(allocator: Arc<dyn RawAllocator>, blob_info: Vec<BlobInfo>) -> Result<Self> {
        let blobs = blob_info
            .iter()
            .map(|bi| make_region(allocator.clone(), bi.size, bi.alignment))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { allocator, blobs, blob_info })
    }
}

impl MemoryPool for BlobPool {
    fn acquire(&self, mappings: &Mappings) {
        for mapping in mappings {
            mapping.handle.bind(Binding::Region(&self.blobs[mapping.slot]));
        }
    }

    fn release(&self, mappings: &Mappings) {
        for mapping in mappings {
            mapping.handle.unbind();
        }
    }

    fn mapping_kind(&self) -> MappingKind {
        MappingKind::Blob
    }

    fn duplicate(&self) -> Result<Box<dyn MemoryPool>> {
        Ok(Box::new(Self::new(self.allocator.clone(), self.blob_info.clone())?))
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
    fn acquire_binds_each_handle_to_its_slot_region() {
        let allocator: Arc<dyn RawAllocator> = Arc::new(SystemAllocator::new());
        let blob_info = vec![BlobInfo { size: 128, alignment: 16, owners: 1 }, BlobInfo { size: 64, alignment: 8, owners: 1 }];
        let pool = BlobPool::new(allocator, blob_info).unwrap();

        let handle = Arc::new(RecordingHandle { bound_len: AtomicUsize::new(0) });
        let mappings: Mappings = vec![Mapping { handle: handle.clone(), slot: 1, size: 64 }];

        pool.acquire(&mappings);
        assert_eq!(handle.bound_len.load(Ordering::SeqCst), 64);

        pool.release(&mappings);
        assert_eq!(handle.bound_len.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn duplicate_allocates_independent_storage() {
        let allocator: Arc<dyn RawAllocator> = Arc::new(SystemAllocator::new());
        let pool = BlobPool::new(allocator, vec![BlobInfo { size: 32, alignment: 8, owners: 1 }]).unwrap();
        let dup = pool.duplicate().unwrap();
        assert_eq!(dup.mapping_kind(), MappingKind::Blob);
    }
}
