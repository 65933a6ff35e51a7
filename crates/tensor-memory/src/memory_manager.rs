//! Facade tying one lifetime manager to a pool manager: plan once, then populate enough
//! interchangeable pools for concurrent execution.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{MemoryError, Result};
use crate::lifetime::LifetimeManager;
use crate::pool_manager::PoolManager;
use crate::raw_allocator::RawAllocator;

/// Owns a lifetime manager and the pool manager it feeds.
///
/// [`MemoryGroup`](crate::group::MemoryGroup)s register themselves and their tensors against
/// this manager's lifetime manager during planning, then call
/// [`populate`](MemoryManager::populate) once every group involved has finished planning to
/// turn the computed layout into leasable pools.
pub struct MemoryManager {
    lifetime_manager: Mutex<Box<dyn LifetimeManager>>,
    pool_manager: PoolManager,
    allocator: Arc<dyn RawAllocator>,
}

impl MemoryManager {
    /// Build a facade around `lifetime_manager`, allocating pools through `allocator`.
    pub fn new(lifetime_manager: Box<dyn LifetimeManager>, allocator: Arc<dyn RawAllocator>) -> Self {
        Self { lifetime_manager: Mutex::new(lifetime_manager), pool_manager: PoolManager::new(), allocator }
    }

    /// Build `num_pools` pools from the layout computed so far and hand them to the pool
    /// manager.
    ///
    /// Requires every tensor registered with the lifetime manager to be finalized and the pool
    /// manager to currently be empty — calling this twice without an intervening
    /// [`clear`](MemoryManager::clear) is a programming error. `num_pools` is clamped to at
    /// least one: a manager with zero pools could never lease one out.
    pub fn populate(&self, num_pools: usize) -> Result<()> {
        let lifetime_manager = self.lifetime_manager.lock();
        if !lifetime_manager.all_finalized() {
            return Err(MemoryError::NotFinalized);
        }
        if self.pool_manager.num_pools() != 0 {
            return Err(MemoryError::PoolBusy);
        }

        let num_pools = num_pools.max(1);
        let template = match lifetime_manager.create_pool(self.allocator.clone()) {
            Ok(template) => template,
            Err(err) => {
                #[cfg(feature = "logging")]
                nebula_log::warn!(%err, "populate failed to allocate template pool");
                return Err(err);
            }
        };
        for _ in 0..num_pools - 1 {
            self.pool_manager.register_pool(template.duplicate()?)?;
        }
        self.pool_manager.register_pool(template)?;
        #[cfg(feature = "logging")]
        nebula_log::debug!(num_pools, "populate succeeded");
        Ok(())
    }

    /// Discard every pool the manager currently holds.
    ///
    /// Returns [`MemoryError::PoolBusy`] if any pool is leased out — callers must finish
    /// executing before clearing.
    pub fn clear(&self) -> Result<()> {
        let result = self.pool_manager.clear_pools();
        #[cfg(feature = "logging")]
        nebula_log::debug!(ok = result.is_ok(), "clear");
        result
    }

    /// Lock access to the underlying lifetime manager.
    ///
    /// Exposed so [`MemoryGroup`](crate::group::MemoryGroup) can drive planning directly;
    /// application code normally has no reason to reach through this.
    pub fn lifetime_manager(&self) -> &Mutex<Box<dyn LifetimeManager>> {
        &self.lifetime_manager
    }

    /// The pool manager backing this facade.
    pub fn pool_manager(&self) -> &PoolManager {
        &self.pool_manager
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::handle::{Binding, TensorHandle};
    use crate::lifetime::BlobLifetimeManager;
    use crate::managed::TensorId;
    use crate::raw_allocator::SystemAllocator;

    struct NoopHandle;
    impl TensorHandle for NoopHandle {
        fn bind(&self, _binding: Binding<'_>) {}
        fn unbind(&self) {}
    }

    #[test]
    fn populate_requires_all_finalized() {
        let allocator: Arc<dyn RawAllocator> = Arc::new(SystemAllocator::new());
        let manager = MemoryManager::new(Box::new(BlobLifetimeManager::new()), allocator);

        manager.lifetime_manager().lock().start_lifetime(TensorId::from_ref(&1u8));
        assert!(matches!(manager.populate(2), Err(MemoryError::NotFinalized)));
    }

    #[test]
    fn populate_builds_requested_pool_count() {
        let allocator: Arc<dyn RawAllocator> = Arc::new(SystemAllocator::new());
        let manager = MemoryManager::new(Box::new(BlobLifetimeManager::new()), allocator);

        {
            let mut lm = manager.lifetime_manager().lock();
            let id = TensorId::from_ref(&1u8);
            lm.start_lifetime(id);
            lm.end_lifetime(id, Arc::new(NoopHandle), 64, 8);
        }

        manager.populate(3).unwrap();
        assert_eq!(manager.pool_manager().num_pools(), 3);
    }

    #[test]
    fn populate_twice_without_clear_fails() {
        let allocator: Arc<dyn RawAllocator> = Arc::new(SystemAllocator::new());
        let manager = MemoryManager::new(Box::new(BlobLifetimeManager::new()), allocator);

        {
            let mut lm = manager.lifetime_manager().lock();
            let id = TensorId::from_ref(&1u8);
            lm.start_lifetime(id);
            lm.end_lifetime(id, Arc::new(NoopHandle), 64, 8);
        }

        manager.populate(1).unwrap();
        assert!(matches!(manager.populate(1), Err(MemoryError::PoolBusy)));
        manager.clear().unwrap();
    }
}
