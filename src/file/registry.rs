//! Namespace Registry
//!
//! Partition and layer bookkeeping shared by readers and writers. The
//! registry knows nothing about how data gets to or from disk.
//!
//! ## Naming
//! Users address partitions by an external name. Internally every partition
//! is stored as `external.N`: fields written under the same external name
//! share a partition when their mappings compare equal, otherwise the next
//! unused `N` is minted.
//!
//! ```text
//!  external "fire" ──┬── fire.0   (mapping M1)   density, temperature
//!                    └── fire.1   (mapping M2)   density
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::field::{FieldMapping, Metadata, MetadataValue};

use super::layer::{Layer, LayerKind};
use super::partition::Partition;

/// Group id → space-separated `internalPartition:layer` tokens
pub type GroupMembershipMap = BTreeMap<String, String>;

/// Partitions, name translation, group membership and file metadata
#[derive(Debug, Default)]
pub struct Registry {
    /// Partitions in creation (or load) order
    partitions: Vec<Partition>,
    /// Unique external names, first-seen order
    partition_names: Vec<String>,
    /// External name → internal names, creation order
    int_partitions: HashMap<String, Vec<String>>,
    /// External name → next unused suffix
    partition_counts: HashMap<String, u32>,
    /// Accumulated group membership
    group_membership: GroupMembershipMap,
    /// File-level metadata
    metadata: Metadata,
    /// Metadata keys changed since the last flush
    changed_metadata: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every partition, membership entry and metadata value
    pub fn clear(&mut self) {
        self.partitions.clear();
        self.partition_names.clear();
        self.int_partitions.clear();
        self.partition_counts.clear();
        self.group_membership.clear();
        self.metadata.clear();
        self.changed_metadata.clear();
    }

    // =========================================================================
    // Partition Lookup
    // =========================================================================

    /// Partition by internal name, or the first partition of an external name
    pub fn partition(&self, name: &str) -> Option<&Partition> {
        if let Some(p) = self.partitions.iter().find(|p| p.name == name) {
            return Some(p);
        }
        let first = self.int_partitions.get(name)?.first()?;
        self.partitions.iter().find(|p| &p.name == first)
    }

    /// Partition by exact internal name
    pub fn int_partition(&self, int_name: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.name == int_name)
    }

    pub(crate) fn partition_mut(&mut self, int_name: &str) -> Option<&mut Partition> {
        self.partitions.iter_mut().find(|p| p.name == int_name)
    }

    /// All partitions in registry order
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Unique external partition names, first-seen order
    pub fn partition_names(&self) -> &[String] {
        &self.partition_names
    }

    /// Internal partition names in registry order
    pub fn int_partition_names(&self) -> Vec<&str> {
        self.partitions.iter().map(|p| p.name.as_str()).collect()
    }

    /// Internal names minted for an external name, creation order
    pub fn int_partitions_of(&self, external: &str) -> &[String] {
        self.int_partitions
            .get(external)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of internal partitions behind an external name
    pub fn num_int_partitions(&self, external: &str) -> usize {
        self.int_partitions_of(external).len()
    }

    // =========================================================================
    // Layer Enumeration
    // =========================================================================

    /// Layers of `kind`, optionally limited to one external partition name
    ///
    /// Partitions are visited in registry order and layers in insertion
    /// order, so repeated calls return identical sequences.
    pub fn layers(&self, kind: LayerKind, external: Option<&str>) -> Vec<&Layer> {
        self.partitions
            .iter()
            .filter(|p| external.map_or(true, |e| strip_unique_suffix(&p.name) == e))
            .flat_map(|p| p.layers(kind).iter())
            .collect()
    }

    /// Scalar layer names across every internal partition of `external`
    pub fn scalar_layer_names(&self, external: &str) -> Vec<&str> {
        self.layer_names(LayerKind::Scalar, external)
    }

    /// Vector layer names across every internal partition of `external`
    pub fn vector_layer_names(&self, external: &str) -> Vec<&str> {
        self.layer_names(LayerKind::Vector, external)
    }

    /// Scalar layer names of one internal partition
    pub fn int_scalar_layer_names(&self, int_name: &str) -> Vec<&str> {
        self.partitions
            .iter()
            .find(|p| p.name == int_name)
            .map(Partition::scalar_layer_names)
            .unwrap_or_default()
    }

    /// Vector layer names of one internal partition
    pub fn int_vector_layer_names(&self, int_name: &str) -> Vec<&str> {
        self.partitions
            .iter()
            .find(|p| p.name == int_name)
            .map(Partition::vector_layer_names)
            .unwrap_or_default()
    }

    fn layer_names(&self, kind: LayerKind, external: &str) -> Vec<&str> {
        self.layers(kind, Some(external))
            .into_iter()
            .map(Layer::name)
            .collect()
    }

    // =========================================================================
    // Partition Naming
    // =========================================================================

    /// Internal name for a field, registering a new partition if needed
    ///
    /// Returns the first partition of `external` whose mapping equals
    /// `mapping`; otherwise mints the next suffix and registers a partition
    /// sharing `mapping`.
    pub fn resolve_or_create(
        &mut self,
        external: &str,
        layer: &str,
        mapping: &Arc<FieldMapping>,
    ) -> Result<String> {
        validate_name("partition", external)?;
        validate_name("layer", layer)?;

        if let Some(existing) = self.find_int_partition(external, mapping) {
            return Ok(existing.to_string());
        }

        let name = self.next_int_partition_name(external);
        self.insert_partition(Partition::new(name.clone(), Arc::clone(mapping)))?;
        Ok(name)
    }

    /// Existing internal partition of `external` with an equal mapping
    pub fn find_int_partition(&self, external: &str, mapping: &FieldMapping) -> Option<&str> {
        self.int_partitions_of(external)
            .iter()
            .filter_map(|int_name| self.partitions.iter().find(|p| &p.name == int_name))
            .find(|p| *p.mapping == *mapping)
            .map(|p| p.name.as_str())
    }

    /// Internal name the next new partition of `external` would get
    pub fn next_int_partition_name(&self, external: &str) -> String {
        let mut index = self.partition_counts.get(external).copied().unwrap_or(0);
        let mut name = make_int_partition_name(external, index);
        // Loaded files may already hold a partition with this name
        while self.partitions.iter().any(|p| p.name == name) {
            index += 1;
            name = make_int_partition_name(external, index);
        }
        name
    }

    /// Register a partition under its internal name
    pub fn insert_partition(&mut self, partition: Partition) -> Result<()> {
        validate_name("partition", &partition.name)?;
        if self.partitions.iter().any(|p| p.name == partition.name) {
            return Err(StoreError::InvalidName(format!(
                "partition '{}' is already registered",
                partition.name
            )));
        }

        let external = strip_unique_suffix(&partition.name).to_string();
        let next = match unique_suffix(&partition.name) {
            Some(n) => n.saturating_add(1),
            None => 0,
        };
        let count = self.partition_counts.entry(external.clone()).or_insert(0);
        *count = (*count).max(next);

        if !self.partition_names.contains(&external) {
            self.partition_names.push(external.clone());
        }
        self.int_partitions
            .entry(external)
            .or_default()
            .push(partition.name.clone());
        self.partitions.push(partition);
        Ok(())
    }

    /// Append a layer record to an internal partition
    pub fn add_layer(&mut self, int_name: &str, kind: LayerKind, layer_name: &str) -> Result<()> {
        validate_name("layer", layer_name)?;
        let partition = self
            .partition_mut(int_name)
            .ok_or_else(|| StoreError::MissingGroup(format!("partition '{}'", int_name)))?;
        partition.add_layer(kind, Layer::new(layer_name, int_name));
        Ok(())
    }

    // =========================================================================
    // Group Membership
    // =========================================================================

    /// Merge membership tokens, appending to existing entries
    ///
    /// Tokens are not de-duplicated.
    pub fn add_group_membership<I, K, V>(&mut self, update: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        for (group, tokens) in update {
            let tokens = tokens.as_ref().trim();
            if tokens.is_empty() {
                continue;
            }
            let entry = self.group_membership.entry(group.into()).or_default();
            if !entry.is_empty() {
                entry.push(' ');
            }
            entry.push_str(tokens);
        }
    }

    pub fn group_membership(&self) -> &GroupMembershipMap {
        &self.group_membership
    }

    /// Tokens recorded for one group id, in merge order
    pub fn group_members(&self, group: &str) -> Vec<&str> {
        self.group_membership
            .get(group)
            .map(|tokens| tokens.split_whitespace().collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Set a file metadata value and fire the change hook
    pub fn set_metadata(&mut self, key: &str, value: impl Into<MetadataValue>) {
        self.metadata.set(key, value);
        self.metadata_has_changed(key);
    }

    /// Remove a file metadata value and fire the change hook
    pub fn remove_metadata(&mut self, key: &str) -> Option<MetadataValue> {
        let removed = self.metadata.remove(key);
        if removed.is_some() {
            self.metadata_has_changed(key);
        }
        removed
    }

    /// Change hook, called after every metadata mutation
    pub fn metadata_has_changed(&mut self, name: &str) {
        tracing::trace!("File metadata changed: {}", name);
        if !self.changed_metadata.iter().any(|k| k == name) {
            self.changed_metadata.push(name.to_string());
        }
    }

    /// Keys changed since the metadata was last persisted
    pub fn changed_metadata(&self) -> &[String] {
        &self.changed_metadata
    }

    pub(crate) fn mark_metadata_clean(&mut self) {
        self.changed_metadata.clear();
    }

    /// Install metadata loaded from disk without firing the hook
    pub(crate) fn load_metadata(&mut self, metadata: Metadata) {
        self.metadata = metadata;
        self.changed_metadata.clear();
    }
}

impl fmt::Display for Registry {
    /// Partition/layer hierarchy, one partition per block
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for partition in &self.partitions {
            writeln!(
                f,
                "{} ({})",
                partition.name,
                strip_unique_suffix(&partition.name)
            )?;
            writeln!(f, "  mapping: {}", partition.mapping.type_name())?;
            for kind in LayerKind::ALL {
                for layer in partition.layers(kind) {
                    writeln!(f, "  {}: {}", kind, layer.name())?;
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Naming Rules
// =============================================================================

/// Reject empty names
pub fn validate_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidName(format!(
            "{} name must not be empty",
            what
        )));
    }
    Ok(())
}

/// Internal partition name for suffix `index`
pub fn make_int_partition_name(external: &str, index: u32) -> String {
    format!("{}.{}", external, index)
}

/// External name of an internal partition name
///
/// Removes one trailing `.N` (N = one or more ASCII digits) and nothing else.
/// Internal names always carry exactly one such suffix, so
/// `strip_unique_suffix(&make_int_partition_name(e, n)) == e` for any `e`,
/// even one that itself ends in `.digits`. Names without a suffix are
/// returned unchanged.
pub fn strip_unique_suffix(name: &str) -> &str {
    match split_suffix(name) {
        Some((external, _)) => external,
        None => name,
    }
}

/// Numeric suffix of an internal partition name
pub fn unique_suffix(name: &str) -> Option<u32> {
    split_suffix(name).and_then(|(_, digits)| digits.parse().ok())
}

fn split_suffix(name: &str) -> Option<(&str, &str)> {
    let dot = name.rfind('.')?;
    let digits = &name[dot + 1..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((&name[..dot], digits))
}
