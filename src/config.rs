//! Configuration for fieldstore
//!
//! Centralized configuration with sensible defaults.

use crate::error::{Result, StoreError};

/// Main configuration for reader and writer sessions
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Naming Configuration
    // -------------------------------------------------------------------------
    /// Partition used when a layer is written without an explicit partition
    pub default_partition: String,

    // -------------------------------------------------------------------------
    // Writer Configuration
    // -------------------------------------------------------------------------
    /// What `create` does when the target file already exists
    pub create_mode: CreateMode,

    /// fsync the archive when the writer closes
    pub sync_on_close: bool,

    // -------------------------------------------------------------------------
    // Reader Configuration
    // -------------------------------------------------------------------------
    /// Validate the data block CRC32 when opening an archive
    pub verify_checksums: bool,
}

/// File creation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreateMode {
    /// Truncate any existing file
    #[default]
    Overwrite,

    /// Refuse to create the file if the path already exists
    FailOnExisting,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_partition: "default".to_string(),
            create_mode: CreateMode::Overwrite,
            sync_on_close: true,
            verify_checksums: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the partition used by `write_default_layer`
    pub fn default_partition(mut self, name: impl Into<String>) -> Self {
        self.config.default_partition = name.into();
        self
    }

    /// Set the file creation mode
    pub fn create_mode(mut self, mode: CreateMode) -> Self {
        self.config.create_mode = mode;
        self
    }

    /// Enable or disable fsync on close
    pub fn sync_on_close(mut self, sync: bool) -> Self {
        self.config.sync_on_close = sync;
        self
    }

    /// Enable or disable CRC validation on open
    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.config.verify_checksums = verify;
        self
    }

    /// Build the config, rejecting an empty default partition name
    pub fn build(self) -> Result<Config> {
        if self.config.default_partition.is_empty() {
            return Err(StoreError::Config(
                "default partition name must not be empty".to_string(),
            ));
        }
        Ok(self.config)
    }
}
