//! Error types for the tensor memory manager.
//!
//! Only [`MemoryError::AllocFailed`] is meant to be recovered from by a caller
//! (reduce sizes, [`clear`](crate::memory_manager::MemoryManager::clear) and retry). Every
//! other variant names a contract violation and is raised via `panic!` at the call site rather
//! than returned as an `Err` — see the variant docs.

use crate::managed::{MappingKind, TensorId};

/// Errors produced by the raw allocator, lifetime managers, pools, and the memory manager facade.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// The raw allocator could not satisfy a request for `size` bytes aligned to `alignment`.
    ///
    /// The only variant a caller can recover from: reduce the requested sizes, call
    /// [`clear`](crate::memory_manager::MemoryManager::clear), and retry.
    #[error("raw allocator failed to satisfy request of {size} bytes aligned to {alignment}")]
    AllocFailed {
        /// Requested size in bytes.
        size: usize,
        /// Requested alignment in bytes.
        alignment: usize,
    },

    /// `start_lifetime` was called for a tensor that already has an active lifetime.
    #[error("tensor {id:?} already has an active lifetime")]
    DuplicateStart {
        /// The tensor identity that was already active.
        id: TensorId,
    },

    /// `end_lifetime` was called for a tensor that was never started.
    #[error("end_lifetime called for unknown tensor {id:?}")]
    UnknownId {
        /// The tensor identity that was never registered.
        id: TensorId,
    },

    /// An operation that requires all registered tensors to be finalized was called too early.
    #[error("operation requires all registered tensors to be finalized")]
    NotFinalized,

    /// A pool-manager operation that requires an empty occupied list was attempted while pools
    /// are leased out.
    #[error("pool operation attempted while one or more pools are leased")]
    PoolBusy,

    /// A pool and a mapping of incompatible kinds were paired.
    #[error("pool and mapping have incompatible kinds: pool={pool_kind:?}, mapping={mapping_kind:?}")]
    KindMismatch {
        /// The kind the pool accepts.
        pool_kind: MappingKind,
        /// The kind the mapping was produced as.
        mapping_kind: MappingKind,
    },

    /// An operation that requires a raw allocator was called without one.
    #[error("operation requires a non-null raw allocator")]
    NullAllocator,
}

/// Convenience alias used throughout the crate's recoverable entry points.
pub type Result<T> = std::result::Result<T, MemoryError>;
