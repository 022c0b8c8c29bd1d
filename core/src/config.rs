//! Application constants.
//!
//! Centralizes memory limits, file names, IPC limits, and env vars so the rest
//! of the crate stays decoupled from concrete values.

/// Smallest heap a profile override may request (MB).
pub const MIN_MEMORY_MB: u32 = 1024;

/// Largest heap a 32-bit Java runtime can reliably address (MB).
pub const MAX_MEMORY_32BIT_MB: u32 = 1536;

/// Slider step for the memory override (MB).
pub const MEMORY_STEP_MB: u32 = 512;

/// Labeled reference points for the slider. Rendering hints only.
pub const MEMORY_MARKS: [u32; 4] = [2048, 4096, 8192, 16384];

/// Global default heap when settings do not name one (MB).
pub const DEFAULT_JAVA_MEMORY_MB: u32 = 4096;

/// Per-profile configuration record file name.
pub const PROFILE_CONFIG_FILENAME: &str = "config.json";

/// Launcher-wide settings file name (in the data root).
pub const SETTINGS_FILENAME: &str = "settings.json";

/// Directory under the data root holding one folder per profile.
pub const INSTANCES_DIRNAME: &str = "instances";

/// Max pending IPC responses before dropping new ones (backpressure).
pub const MAX_PENDING_IPC: usize = 256;

/// Number of worker threads for blocking IPC commands (disk I/O, java probing).
pub const IPC_WORKER_POOL_SIZE: usize = 4;

/// Env var: overrides the data root directory.
pub const ENV_DATA_DIR: &str = "INSTANCE_HOST_DATA_DIR";

/// Env var: java executable whose addressing width bounds the heap.
pub const ENV_JAVA: &str = "INSTANCE_HOST_JAVA";
