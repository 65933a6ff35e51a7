//! Leases planned pools out to concurrent executors.
//!
//! A single planning pass produces one layout; [`MemoryManager::populate`](crate::memory_manager::MemoryManager::populate)
//! turns it into `num_pools` interchangeable [`MemoryPool`] instances so that many executions of
//! the same graph can run concurrently, each against its own physical storage. `lock_pool`/
//! `unlock_pool` hand pools out and back; a caller that asks for one while all are leased blocks
//! until another caller returns one.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

use crate::error::{MemoryError, Result};
use crate::pool::MemoryPool;

/// Pool of interchangeable [`MemoryPool`] instances, leased out one at a time per executor.
///
/// The upstream design this is grounded on pairs a hand-rolled counting semaphore with a
/// mutex-protected free/occupied list, keeping the semaphore's count in sync with the free
/// list's length by hand on every mutation. This keeps only the free list and a plain occupied
/// counter: the list's own length already *is* the count of available pools, so
/// [`Condvar::wait`] on the same mutex that guards the list does the semaphore's job without a
/// second piece of state that could drift out of sync with the first.
pub struct PoolManager {
    free: Mutex<Vec<Box<dyn MemoryPool>>>,
    occupied: AtomicUsize,
    not_empty: Condvar,
    #[cfg(feature = "stats")]
    leases_total: AtomicUsize,
}

impl PoolManager {
    /// An empty manager. Call [`register_pool`](PoolManager::register_pool) before leasing.
    pub fn new() -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            occupied: AtomicUsize::new(0),
            not_empty: Condvar::new(),
            #[cfg(feature = "stats")]
            leases_total: AtomicUsize::new(0),
        }
    }

    /// Block until a pool is available, then remove it from the free list and return it.
    ///
    /// Panics if no pools have ever been registered.
    pub fn lock_pool(&self) -> Box<dyn MemoryPool> {
        let mut free = self.free.lock();
        assert!(
            !free.is_empty() || self.occupied.load(Ordering::Acquire) > 0,
            "haven't set up any pools"
        );
        #[cfg(feature = "logging")]
        if free.is_empty() {
            nebula_log::debug!("lock_pool blocked, no free pool");
        }
        while free.is_empty() {
            self.not_empty.wait(&mut free);
        }
        let pool = free.remove(0);
        self.occupied.fetch_add(1, Ordering::AcqRel);
        #[cfg(feature = "stats")]
        self.leases_total.fetch_add(1, Ordering::Relaxed);
        pool
    }

    /// Return a pool previously obtained from [`lock_pool`](PoolManager::lock_pool).
    pub fn unlock_pool(&self, pool: Box<dyn MemoryPool>) {
        let mut free = self.free.lock();
        free.push(pool);
        self.occupied.fetch_sub(1, Ordering::AcqRel);
        self.not_empty.notify_one();
        #[cfg(feature = "logging")]
        nebula_log::debug!(free = free.len(), "pool returned");
    }

    /// Add a pool to the managed set.
    ///
    /// Returns [`MemoryError::PoolBusy`] if any pool is currently leased out — registering while
    /// pools are in flight would let a caller observe a set whose members aren't all the same
    /// layout.
    pub fn register_pool(&self, pool: Box<dyn MemoryPool>) -> Result<()> {
        let mut free = self.free.lock();
        if self.occupied.load(Ordering::Acquire) != 0 {
            return Err(MemoryError::PoolBusy);
        }
        free.push(pool);
        self.not_empty.notify_one();
        #[cfg(feature = "logging")]
        nebula_log::debug!(free = free.len(), "registered pool");
        Ok(())
    }

    /// Remove and return one free pool, or `None` if the managed set is empty.
    ///
    /// Returns [`MemoryError::PoolBusy`] if any pool is currently leased out.
    pub fn release_pool(&self) -> Result<Option<Box<dyn MemoryPool>>> {
        let mut free = self.free.lock();
        if self.occupied.load(Ordering::Acquire) != 0 {
            return Err(MemoryError::PoolBusy);
        }
        Ok(free.pop())
    }

    /// Discard every managed pool.
    ///
    /// Returns [`MemoryError::PoolBusy`] if any pool is currently leased out.
    pub fn clear_pools(&self) -> Result<()> {
        let mut free = self.free.lock();
        if self.occupied.load(Ordering::Acquire) != 0 {
            return Err(MemoryError::PoolBusy);
        }
        free.clear();
        Ok(())
    }

    /// Total number of pools managed, free or leased.
    pub fn num_pools(&self) -> usize {
        self.free.lock().len() + self.occupied.load(Ordering::Acquire)
    }

    /// Snapshot of lease activity since construction.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> PoolManagerStats {
        let free = self.free.lock();
        PoolManagerStats {
            free: free.len(),
            occupied: self.occupied.load(Ordering::Acquire),
            leases_total: self.leases_total.load(Ordering::Relaxed),
        }
    }
}

impl Default for PoolManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time lease counters for a [`PoolManager`].
#[cfg(feature = "stats")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolManagerStats {
    /// Pools currently available to lease.
    pub free: usize,
    /// Pools currently leased out.
    pub occupied: usize,
    /// Total number of successful `lock_pool` calls since construction.
    pub leases_total: usize,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Barrier;

    use super::*;
    use crate::managed::MappingKind;
    use crate::pool::BlobPool;
    use crate::raw_allocator::{RawAllocator, SystemAllocator};

    fn test_pool() -> Box<dyn MemoryPool> {
        let allocator: Arc<dyn RawAllocator> = Arc::new(SystemAllocator::new());
        Box::new(BlobPool::new(allocator, vec![]).unwrap())
    }

    #[test]
    fn register_then_lock_then_unlock_round_trips() {
        let pm = PoolManager::new();
        pm.register_pool(test_pool()).unwrap();
        assert_eq!(pm.num_pools(), 1);

        let pool = pm.lock_pool();
        assert_eq!(pool.mapping_kind(), MappingKind::Blob);
        pm.unlock_pool(pool);
        assert_eq!(pm.num_pools(), 1);
    }

    #[cfg(feature = "stats")]
    #[test]
    fn stats_track_leases_total_across_reuse() {
        let pm = PoolManager::new();
        pm.register_pool(test_pool()).unwrap();

        let pool = pm.lock_pool();
        pm.unlock_pool(pool);
        let pool = pm.lock_pool();
        pm.unlock_pool(pool);

        let stats = pm.stats();
        assert_eq!(stats.free, 1);
        assert_eq!(stats.occupied, 0);
        assert_eq!(stats.leases_total, 2);
    }

    #[test]
    fn register_pool_rejects_while_leased() {
        let pm = PoolManager::new();
        pm.register_pool(test_pool()).unwrap();
        let pool = pm.lock_pool();
        assert!(matches!(pm.register_pool(test_pool()), Err(MemoryError::PoolBusy)));
        pm.unlock_pool(pool);
    }

    #[test]
    fn clear_pools_rejects_while_leased() {
        let pm = PoolManager::new();
        pm.register_pool(test_pool()).unwrap();
        let pool = pm.lock_pool();
        assert!(matches!(pm.clear_pools(), Err(MemoryError::PoolBusy)));
        pm.unlock_pool(pool);
        assert!(pm.clear_pools().is_ok());
        assert_eq!(pm.num_pools(), 0);
    }

    /// Scenario S6 / property 8: lock_pool blocks until a pool is returned rather than handing
    /// the same pool to two callers at once.
    #[test]
    fn lock_pool_blocks_until_a_pool_is_returned() {
        let pm = Arc::new(PoolManager::new());
        pm.register_pool(test_pool()).unwrap();
        let first = pm.lock_pool();

        let barrier = Arc::new(Barrier::new(2));
        let pm2 = pm.clone();
        let barrier2 = barrier.clone();
        let handle = std::thread::spawn(move || {
            barrier2.wait();
            let pool = pm2.lock_pool();
            pm2.unlock_pool(pool);
        });

        barrier.wait();
        std::thread::sleep(std::time::Duration::from_millis(20));
        pm.unlock_pool(first);
        handle.join().unwrap();
    }
}
