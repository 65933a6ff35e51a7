//! Backend identifiers.

/// Identifies which backend a memory manager or raw allocator is configured for.
///
/// The core itself is backend-agnostic; this enum only exists so configuration
/// and diagnostics can name which backend a given [`MemoryManager`](crate::memory_manager::MemoryManager)
/// instance was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Plain host memory, backed by [`SystemAllocator`](crate::raw_allocator::SystemAllocator).
    Cpu,
    /// OpenCL device memory. Backend-specific allocator supplied by the caller.
    Cl,
    /// GLES compute shader storage. Backend-specific allocator supplied by the caller.
    Gles,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Target::Cpu => "cpu",
            Target::Cl => "cl",
            Target::Gles => "gles",
        };
        f.write_str(name)
    }
}
