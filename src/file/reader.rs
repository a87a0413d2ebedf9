//! Field Reader
//!
//! Read session: opens an archive, rebuilds the partition/layer registry
//! from its group tree and serves typed layer reads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::archive::{ArchiveRead, ArchiveReader};
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::field::{DataType, Field, FieldMapping, Metadata, ProxyField, Vec3};

use super::dispatch;
use super::layer::{Layer, LayerKind};
use super::partition::Partition;
use super::registry::{GroupMembershipMap, Registry};
use super::{ATTR_GROUP_MEMBERSHIP, ATTR_METADATA, ATTR_VERSION};

/// Reads fields from an existing file
///
/// Scanning reads (`read_layers` and friends) return whatever loads
/// successfully and an empty result once the reader is closed.
pub struct FieldReader {
    config: Config,
    path: PathBuf,
    registry: Registry,
    archive: Option<ArchiveReader>,
}

impl FieldReader {
    /// Open a file with default configuration
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, Config::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let path = path.as_ref();
        let archive = ArchiveReader::open(path, config.verify_checksums)?;
        let registry = load_registry(&archive)?;

        tracing::info!(
            "Opened {} ({} partitions, {} groups)",
            path.display(),
            registry.partitions().len(),
            archive.group_count()
        );

        Ok(Self {
            config,
            path: path.to_path_buf(),
            registry,
            archive: Some(archive),
        })
    }

    /// Release the file and forget its hierarchy
    pub fn close(&mut self) {
        if self.archive.take().is_some() {
            tracing::debug!("Closed {}", self.path.display());
        }
        self.registry.clear();
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

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Underlying archive, for raw inspection
    pub fn archive(&self) -> Option<&ArchiveReader> {
        self.archive.as_ref()
    }

    // =========================================================================
    // Hierarchy
    // =========================================================================

    /// Unique external partition names
    pub fn partition_names(&self) -> &[String] {
        self.registry.partition_names()
    }

    pub fn scalar_layer_names(&self, partition_name: &str) -> Vec<&str> {
        self.registry.scalar_layer_names(partition_name)
    }

    pub fn vector_layer_names(&self, partition_name: &str) -> Vec<&str> {
        self.registry.vector_layer_names(partition_name)
    }

    /// Partition by internal name, or the first one of an external name
    pub fn partition(&self, name: &str) -> Option<&Partition> {
        self.registry.partition(name)
    }

    pub fn metadata(&self) -> &Metadata {
        self.registry.metadata()
    }

    pub fn group_membership(&self) -> &GroupMembershipMap {
        self.registry.group_membership()
    }

    // =========================================================================
    // Layer Reads
    // =========================================================================

    /// One layer of an internal partition; the first of same-named layers
    pub fn read_layer<T: DataType>(&self, int_name: &str, layer_name: &str) -> Result<Field<T>> {
        let archive = self.archive.as_ref().ok_or(StoreError::NotOpen)?;
        dispatch::read_layer(&self.registry, archive, int_name, layer_name, 0)
    }

    /// Every layer named `layer_name` with element type `T` (all when empty)
    pub fn read_layers<T: DataType>(&self, layer_name: &str) -> Vec<Field<T>> {
        match &self.archive {
            Some(archive) => dispatch::read_layers(&self.registry, archive, layer_name),
            None => Vec::new(),
        }
    }

    /// Layers named `layer_name` under the external partition `partition_name`
    pub fn read_layers_in<T: DataType>(
        &self,
        partition_name: &str,
        layer_name: &str,
    ) -> Vec<Field<T>> {
        match &self.archive {
            Some(archive) => {
                dispatch::read_layers_in(&self.registry, archive, partition_name, layer_name)
            }
            None => Vec::new(),
        }
    }

    pub fn read_scalar_layers<T: DataType>(&self, layer_name: &str) -> Vec<Field<T>> {
        if T::COMPONENTS != 1 {
            return Vec::new();
        }
        self.read_layers(layer_name)
    }

    /// Vector layers with component type `S`
    pub fn read_vector_layers<S>(&self, layer_name: &str) -> Vec<Field<Vec3<S>>>
    where
        Vec3<S>: DataType,
    {
        self.read_layers(layer_name)
    }

    // =========================================================================
    // Proxy Reads
    // =========================================================================

    pub fn read_proxy_layer<T: DataType>(
        &self,
        partition_name: &str,
        layer_name: &str,
        is_vector: bool,
    ) -> Vec<ProxyField<T>> {
        match &self.archive {
            Some(archive) => dispatch::read_proxy_layer(
                &self.registry,
                archive,
                partition_name,
                layer_name,
                is_vector,
            ),
            None => Vec::new(),
        }
    }

    pub fn read_proxy_scalar_layers<T: DataType>(&self, layer_name: &str) -> Vec<ProxyField<T>> {
        self.read_proxies(layer_name, false)
    }

    pub fn read_proxy_vector_layers<T: DataType>(&self, layer_name: &str) -> Vec<ProxyField<T>> {
        self.read_proxies(layer_name, true)
    }

    fn read_proxies<T: DataType>(&self, layer_name: &str, is_vector: bool) -> Vec<ProxyField<T>> {
        match &self.archive {
            Some(archive) => {
                dispatch::read_proxy_layers(&self.registry, archive, layer_name, is_vector)
            }
            None => Vec::new(),
        }
    }
}

// =============================================================================
// Hierarchy Loading
// =============================================================================

/// Rebuild a registry from the group tree of an archive
///
/// Root children are internal partitions; their `scalar`/`vector` children
/// are layers, kept in stored order.
fn load_registry<A: ArchiveRead>(archive: &A) -> Result<Registry> {
    let root = archive.root();
    let mut registry = Registry::new();

    if let Some(version) = archive.read_value::<String>(root, ATTR_VERSION)? {
        tracing::debug!("Archive written by fieldstore {}", version);
    }

    for entry in archive.list_children(root)? {
        let mapping = FieldMapping::read_from(archive, entry.handle)?;
        let mut partition = Partition::new(entry.name.clone(), Arc::new(mapping));

        for kind in LayerKind::ALL {
            let Some(kind_group) = archive.find_child(entry.handle, kind.group_name())? else {
                continue;
            };
            for layer in archive.list_children(kind_group)? {
                partition.add_layer(kind, Layer::new(layer.name, entry.name.as_str()));
            }
        }

        tracing::debug!(
            "Loaded partition {} ({} layers)",
            partition.name,
            partition.layer_count()
        );
        registry.insert_partition(partition)?;
    }

    if let Some(membership) = archive.read_value::<GroupMembershipMap>(root, ATTR_GROUP_MEMBERSHIP)? {
        registry.add_group_membership(membership);
    }
    if let Some(metadata) = archive.read_value::<Metadata>(root, ATTR_METADATA)? {
        registry.load_metadata(metadata);
    }

    Ok(registry)
}
