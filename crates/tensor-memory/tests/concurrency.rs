//! Exercises `PoolManager` leasing from real OS threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tensor_memory::{BlobInfo, BlobPool, MemoryPool, PoolManager, SystemAllocator};

fn make_pool() -> Box<dyn MemoryPool> {
    let allocator: Arc<dyn tensor_memory::RawAllocator> = Arc::new(SystemAllocator::new());
    Box::new(BlobPool::new(allocator, vec![BlobInfo { size: 64, alignment: 8, owners: 1 }]).unwrap())
}

/// Scenario S6 / property 8: the pool manager never hands the same pool to two leaseholders,
/// and the number of concurrently-held leases never exceeds the registered pool count.
#[test]
fn concurrent_threads_never_exceed_registered_pool_count() {
    const NUM_POOLS: usize = 3;
    const NUM_THREADS: usize = 8;
    const ITERATIONS_PER_THREAD: usize = 50;

    let manager = Arc::new(PoolManager::new());
    for _ in 0..NUM_POOLS {
        manager.register_pool(make_pool()).unwrap();
    }

    let concurrent = Arc::new(AtomicUsize::new(0));
    let max_observed = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let manager = manager.clone();
            let concurrent = concurrent.clone();
            let max_observed = max_observed.clone();
            std::thread::spawn(move || {
                for _ in 0..ITERATIONS_PER_THREAD {
                    let pool = manager.lock_pool();
                    let in_flight = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                    max_observed.fetch_max(in_flight, Ordering::SeqCst);
                    std::thread::yield_now();
                    concurrent.fetch_sub(1, Ordering::SeqCst);
                    manager.unlock_pool(pool);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(max_observed.load(Ordering::SeqCst) <= NUM_POOLS);
    assert_eq!(manager.num_pools(), NUM_POOLS);
}
