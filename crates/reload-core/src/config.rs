//! Centralized configuration for the reload core.
//!
//! Constants for the on-disk data container, the install step and the build
//! pipeline. Runtime options live on [`crate::ReloadSchedulerBuilder`].

/// Layout of the data container read by the default loader.
pub struct DataFileConfig;

impl DataFileConfig {
    /// Container format version written after the magic marker.
    pub const FORMAT_VERSION: u16 = 1;
    pub const FORMAT_VERSION_LEN: usize = 2;
    pub const VERSION_LEN_FIELD: usize = 4;
    pub const PAYLOAD_LEN_FIELD: usize = 8;
    /// SHA-256 digest appended to every container.
    pub const CHECKSUM_LEN: usize = 32;
    /// Upper bound on the embedded data version string.
    pub const MAX_VERSION_LEN: usize = 256;
}

/// Atomic install settings.
pub struct InstallConfig;

impl InstallConfig {
    /// Prefix of the temp file created next to the install target.
    pub const TEMP_PREFIX: &'static str = ".reload-install-";
    pub const TEMP_SUFFIX: &'static str = ".tmp";
    /// Extension appended to the target when keeping the previous file.
    pub const BACKUP_EXTENSION: &'static str = "bak";
}

/// Build pipeline settings.
pub struct PipelineConfig;

impl PipelineConfig {
    /// Name given to background build threads.
    pub const BUILD_THREAD_NAME: &'static str = "reload-build";
}
