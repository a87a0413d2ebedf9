//! Field Writer
//!
//! Write session: creates an archive and writes layers into it.

use std::path::{Path, PathBuf};

use crate::archive::{ArchiveWrite, ArchiveWriter, GroupHandle};
use crate::config::{Config, CreateMode};
use crate::error::{Result, StoreError};
use crate::field::{DataType, Field, Metadata, MetadataValue, Vec3};

use super::dispatch;
use super::registry::Registry;
use super::{ATTR_GROUP_MEMBERSHIP, ATTR_METADATA, ATTR_VERSION};

/// Writes fields to a new file
///
/// Data reaches disk in full when the writer is closed (explicitly or on
/// drop). After `close()` every write fails with `NotOpen`.
pub struct FieldWriter {
    /// Session configuration
    config: Config,

    /// Path of the file being written
    path: PathBuf,

    /// Partition/layer bookkeeping for this session
    registry: Registry,

    /// Open archive; `None` once closed
    archive: Option<ArchiveWriter>,
}

impl FieldWriter {
    /// Create a file with default configuration and the given mode
    pub fn create(path: impl AsRef<Path>, mode: CreateMode) -> Result<Self> {
        let config = Config {
            create_mode: mode,
            ..Config::default()
        };
        Self::create_with_config(path, config)
    }

    /// Create a file using `config.create_mode`
    pub fn create_with_config(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let path = path.as_ref();
        let mut archive = ArchiveWriter::create(path, config.create_mode)?;
        archive.write_value(GroupHandle::ROOT, ATTR_VERSION, crate::VERSION)?;

        tracing::info!("Created {} ({:?})", path.display(), config.create_mode);

        Ok(Self {
            config,
            path: path.to_path_buf(),
            registry: Registry::new(),
            archive: Some(archive),
        })
    }

    // =========================================================================
    // Writing Layers
    // =========================================================================

    /// Write a layer to a partition, creating the partition if needed
    ///
    /// Returns the internal partition name the layer was stored under.
    pub fn write_layer<T: DataType>(
        &mut self,
        partition_name: &str,
        layer_name: &str,
        field: &Field<T>,
    ) -> Result<String> {
        let archive = self.archive.as_mut().ok_or(StoreError::NotOpen)?;
        dispatch::write_field(
            &mut self.registry,
            archive,
            partition_name,
            layer_name,
            Some(field),
        )
    }

    /// Write a layer to the configured default partition
    pub fn write_default_layer<T: DataType>(
        &mut self,
        layer_name: &str,
        field: &Field<T>,
    ) -> Result<String> {
        let partition = self.config.default_partition.clone();
        self.write_layer(&partition, layer_name, field)
    }

    /// Write a layer using the field's own `name` and `attribute`
    pub fn write_field<T: DataType>(&mut self, field: &Field<T>) -> Result<String> {
        self.write_layer(&field.name, &field.attribute, field)
    }

    /// Write a scalar layer; vector element types are rejected
    pub fn write_scalar_layer<T: DataType>(
        &mut self,
        partition_name: &str,
        layer_name: &str,
        field: &Field<T>,
    ) -> Result<String> {
        if T::COMPONENTS != 1 {
            return Err(StoreError::UnsupportedArity(T::COMPONENTS));
        }
        self.write_layer(partition_name, layer_name, field)
    }

    /// Write a vector layer with component type `S`
    pub fn write_vector_layer<S>(
        &mut self,
        partition_name: &str,
        layer_name: &str,
        field: &Field<Vec3<S>>,
    ) -> Result<String>
    where
        Vec3<S>: DataType,
    {
        self.write_layer(partition_name, layer_name, field)
    }

    // =========================================================================
    // Group Membership & Metadata
    // =========================================================================

    /// Merge group membership tokens; written to disk on close
    pub fn add_group_membership<I, K, V>(&mut self, update: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        self.registry.add_group_membership(update);
    }

    /// Set a file metadata value; written to disk on close
    pub fn set_metadata(&mut self, key: &str, value: impl Into<MetadataValue>) {
        self.registry.set_metadata(key, value);
    }

    pub fn metadata(&self) -> &Metadata {
        self.registry.metadata()
    }

    /// Persist file metadata now
    pub fn write_global_metadata(&mut self) -> Result<()> {
        let archive = self.archive.as_mut().ok_or(StoreError::NotOpen)?;
        archive.write_value(GroupHandle::ROOT, ATTR_METADATA, self.registry.metadata())?;
        self.registry.mark_metadata_clean();
        Ok(())
    }

    /// Persist group membership now
    pub fn write_group_membership(&mut self) -> Result<()> {
        let archive = self.archive.as_mut().ok_or(StoreError::NotOpen)?;
        if self.registry.group_membership().is_empty() {
            return Ok(());
        }
        archive.write_value(
            GroupHandle::ROOT,
            ATTR_GROUP_MEMBERSHIP,
            self.registry.group_membership(),
        )
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Write group membership and pending metadata, then finish the file
    ///
    /// The registry is cleared whether or not finishing succeeds. Closing an
    /// already closed writer is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.archive.is_none() {
            return Ok(());
        }

        let flushed = self.write_group_membership().and_then(|_| {
            if self.registry.changed_metadata().is_empty() {
                Ok(())
            } else {
                self.write_global_metadata()
            }
        });

        let archive = self.archive.take();
        self.registry.clear();
        flushed?;

        if let Some(archive) = archive {
            let summary = archive.finish(self.config.sync_on_close)?;
            tracing::info!(
                "Closed {} ({} groups, {} bytes)",
                summary.path.display(),
                summary.group_count,
                summary.file_size
            );
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.archive.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Partition/layer bookkeeping of this session
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Drop for FieldWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close {}: {}", self.path.display(), e);
        }
    }
}
