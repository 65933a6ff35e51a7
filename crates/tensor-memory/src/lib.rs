//! Tensor memory planning and pooling for a multi-backend inference graph runtime.
//!
//! A graph runtime builds one of these per backend (CPU, OpenCL, GLES, ...) to turn "which
//! tensors are live at the same time" into a small number of physical allocations those tensors
//! share across repeated executions, instead of allocating fresh storage on every run.
//!
//! The pieces, roughly bottom-up:
//! - [`raw_allocator`] — where bytes actually come from.
//! - [`pool`] — owns allocated storage and binds tensor handles to slots in it.
//! - [`lifetime`] — watches tensor lifetimes across a planning pass and computes the smallest
//!   layout ([`managed::BlobInfo`] list or single arena) that keeps every live tensor disjoint.
//! - [`pool_manager`] — leases out `num_pools` interchangeable copies of one computed layout.
//! - [`memory_manager`] — the facade gluing a lifetime manager to a pool manager.
//! - [`group`] — the user-facing API: wrap tensors in a [`group::MemoryGroup`], `manage`/
//!   `finalize_memory` them during planning, `acquire`/`release` around execution.

mod config;
mod error;
mod group;
mod handle;
mod lifetime;
mod managed;
mod memory_manager;
mod pool;
mod pool_manager;
mod raw_allocator;
mod target;

pub use config::Config;
pub use error::{MemoryError, Result};
pub use group::{MemoryGroup, ScopedMemoryGroup};
pub use handle::{Binding, TensorHandle};
pub use lifetime::{BlobLifetimeManager, LifetimeManager, OffsetLifetimeManager};
pub use managed::{BlobInfo, GroupId, Mapping, Mappings, MappingKind, TensorId};
pub use memory_manager::MemoryManager;
pub use pool::{BlobPool, MemoryPool, OffsetPool};
pub use pool_manager::PoolManager;
pub use raw_allocator::{OwnedRegion, RawAllocator, Region, RegionView, SystemAllocator};
pub use target::Target;

#[cfg(feature = "stats")]
pub use pool_manager::PoolManagerStats;
