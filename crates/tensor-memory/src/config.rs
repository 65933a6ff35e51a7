//! Options a caller supplies when wiring a [`MemoryManager`](crate::memory_manager::MemoryManager)
//! into a backend, as opposed to the layout decisions this crate computes itself.

/// Backend-facing configuration.
///
/// None of these fields are interpreted by the planning or pooling logic in this crate — they
/// are carried through as inert data for the backend that owns the raw allocator and the tensor
/// handles to read back. `num_threads` and `tuner_file` in particular are never read here; a
/// backend that schedules kernels or tunes kernel variants consumes them directly.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether the backend should attach a [`MemoryManager`](crate::memory_manager::MemoryManager)
    /// to groups it creates at all. `false` lets a backend construct
    /// [`MemoryGroup`](crate::group::MemoryGroup)s with no manager, where `manage`/`finalize_memory`
    /// are no-ops and tensors keep whatever storage they already have.
    pub use_memory_manager: bool,

    /// Number of worker threads a backend should run kernels on. Unrelated to the number of
    /// pools a [`MemoryManager::populate`](crate::memory_manager::MemoryManager::populate) call
    /// builds, which a caller chooses independently based on how many concurrent executions it
    /// actually wants.
    pub num_threads: usize,

    /// Path to a backend-specific kernel tuning file, if any.
    pub tuner_file: Option<std::path::PathBuf>,
}

impl Config {
    /// Read configuration from `TENSOR_MEMORY_*` environment variables, falling back to
    /// [`Default`] for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("TENSOR_MEMORY_USE_MEMORY_MANAGER") {
            config.use_memory_manager = value != "0" && !value.eq_ignore_ascii_case("false");
        }
        if let Ok(value) = std::env::var("TENSOR_MEMORY_NUM_THREADS") {
            if let Ok(parsed) = value.parse() {
                config.num_threads = parsed;
            }
        }
        if let Ok(value) = std::env::var("TENSOR_MEMORY_TUNER_FILE") {
            config.tuner_file = Some(std::path::PathBuf::from(value));
        }

        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { use_memory_manager: true, num_threads: 1, tuner_file: None }
    }
}
