//! Type Dispatch
//!
//! Read and write paths written once, generic over the element type and the
//! archive backend. Nothing here keeps a runtime table of element types:
//! the type is a static parameter of each call.
//!
//! ## Failure policy
//! - Writing one field is all-or-nothing: on any fault the groups created
//!   for it are discarded and the registry is left untouched.
//! - Scanning reads are best-effort: a layer that fails to load (missing
//!   data, different element type, corrupt bytes) is skipped.

use std::collections::HashMap;
use std::sync::Arc;

use crate::archive::{ArchiveRead, ArchiveWrite, GroupHandle};
use crate::error::{Result, StoreError};
use crate::field::{DataType, Field, ProxyField};

use super::layer::LayerKind;
use super::partition::Partition;
use super::registry::{strip_unique_suffix, validate_name, Registry};

// =============================================================================
// Write Path
// =============================================================================

/// Write one field as layer `layer_name` of external partition `partition_name`
///
/// `None` stands for an absent field object and is rejected with
/// `NullField`. Returns the internal partition name the field landed in.
pub fn write_field<T: DataType, A: ArchiveWrite>(
    registry: &mut Registry,
    archive: &mut A,
    partition_name: &str,
    layer_name: &str,
    field: Option<&Field<T>>,
) -> Result<String> {
    validate_name("partition", partition_name)?;
    validate_name("layer", layer_name)?;
    let field = field.ok_or(StoreError::NullField)?;
    let kind = LayerKind::of::<T>()?;

    // Plan the partition without touching the registry
    let existing = registry
        .find_int_partition(partition_name, field.mapping())
        .map(str::to_string);
    let is_new = existing.is_none();
    let int_name = existing.unwrap_or_else(|| registry.next_int_partition_name(partition_name));

    let mut created = None;
    if let Err(e) = write_layer_groups(
        archive,
        &int_name,
        is_new,
        kind,
        layer_name,
        field,
        &mut created,
    ) {
        if let Some(group) = created {
            if let Err(discard) = archive.discard_group(group) {
                tracing::warn!(
                    "Failed to discard {} after write fault: {}",
                    archive.group_path(group),
                    discard
                );
            }
        }
        tracing::debug!(
            "Write of {}/{}/{} failed: {}",
            int_name,
            kind,
            layer_name,
            e
        );
        return Err(e);
    }

    if is_new {
        registry.insert_partition(Partition::new(int_name.clone(), Arc::clone(field.mapping())))?;
    }
    registry.add_layer(&int_name, kind, layer_name)?;

    tracing::debug!(
        "Wrote {} layer {}/{}/{}",
        T::TYPE_NAME,
        int_name,
        kind,
        layer_name
    );
    Ok(int_name)
}

/// Create the groups for one layer and serialize the field into them
///
/// `created` receives the outermost group made by this call, which is the
/// one to discard on failure.
fn write_layer_groups<T: DataType, A: ArchiveWrite>(
    archive: &mut A,
    int_name: &str,
    is_new: bool,
    kind: LayerKind,
    layer_name: &str,
    field: &Field<T>,
    created: &mut Option<GroupHandle>,
) -> Result<()> {
    let root = archive.root();

    let partition_group = if is_new {
        let group = archive.create_group(root, int_name)?;
        *created = Some(group);
        field.mapping().write_to(archive, group)?;
        group
    } else {
        archive
            .find_child(root, int_name)
            .ok_or_else(|| StoreError::MissingGroup(int_name.to_string()))?
    };

    let kind_group = match archive.find_child(partition_group, kind.group_name()) {
        Some(group) => group,
        None => {
            let group = archive.create_group(partition_group, kind.group_name())?;
            created.get_or_insert(group);
            group
        }
    };

    let layer_group = archive.create_group(kind_group, layer_name)?;
    created.get_or_insert(layer_group);

    field.write_to(archive, layer_group)
}

// =============================================================================
// Read Path
// =============================================================================

/// One layer selected by a query
struct LayerTarget<'r> {
    partition: &'r str,
    layer: &'r str,
    /// Index among same-named layers of the partition
    occurrence: usize,
}

/// Layers of `kind` matching the optional partition and layer filters
fn matching_layers<'r>(
    registry: &'r Registry,
    kind: LayerKind,
    partition: Option<&str>,
    layer: Option<&str>,
) -> Vec<LayerTarget<'r>> {
    let mut seen: HashMap<(&str, &str), usize> = HashMap::new();
    let mut targets = Vec::new();

    for record in registry.layers(kind, partition) {
        let count = seen.entry((record.parent(), record.name())).or_insert(0);
        let occurrence = *count;
        *count += 1;

        if layer.map_or(true, |name| name == record.name()) {
            targets.push(LayerTarget {
                partition: record.parent(),
                layer: record.name(),
                occurrence,
            });
        }
    }
    targets
}

/// Group holding the `occurrence`-th layer named `layer_name`
fn locate_layer<A: ArchiveRead>(
    archive: &A,
    int_name: &str,
    kind: LayerKind,
    layer_name: &str,
    occurrence: usize,
) -> Result<GroupHandle> {
    let root = archive.root();
    let partition = archive
        .find_child(root, int_name)?
        .ok_or_else(|| StoreError::MissingGroup(int_name.to_string()))?;
    let kind_group = archive
        .find_child(partition, kind.group_name())?
        .ok_or_else(|| StoreError::MissingGroup(format!("{}/{}", int_name, kind)))?;

    archive
        .list_children(kind_group)?
        .into_iter()
        .filter(|child| child.name == layer_name)
        .nth(occurrence)
        .map(|child| child.handle)
        .ok_or_else(|| StoreError::MissingGroup(format!("{}/{}/{}", int_name, kind, layer_name)))
}

/// Read one layer of an internal partition
///
/// `occurrence` selects among layers sharing a name (0 = first written).
pub fn read_layer<T: DataType, A: ArchiveRead>(
    registry: &Registry,
    archive: &A,
    int_name: &str,
    layer_name: &str,
    occurrence: usize,
) -> Result<Field<T>> {
    let kind = LayerKind::of::<T>()?;
    let partition = registry
        .int_partition(int_name)
        .ok_or_else(|| StoreError::MissingGroup(format!("partition '{}'", int_name)))?;

    let group = locate_layer(archive, int_name, kind, layer_name, occurrence)?;
    let mut field = Field::<T>::read_from(archive, group, Arc::clone(&partition.mapping))?;
    field.name = strip_unique_suffix(int_name).to_string();
    field.attribute = layer_name.to_string();
    Ok(field)
}

/// Every layer of T's kind named `layer_name` (all layers when empty)
pub fn read_layers<T: DataType, A: ArchiveRead>(
    registry: &Registry,
    archive: &A,
    layer_name: &str,
) -> Vec<Field<T>> {
    let layer = (!layer_name.is_empty()).then_some(layer_name);
    collect_fields(registry, archive, None, layer)
}

/// Layers named `layer_name` in the partitions of external name `partition_name`
///
/// Either name empty yields an empty result without touching the archive.
pub fn read_layers_in<T: DataType, A: ArchiveRead>(
    registry: &Registry,
    archive: &A,
    partition_name: &str,
    layer_name: &str,
) -> Vec<Field<T>> {
    if partition_name.is_empty() || layer_name.is_empty() {
        return Vec::new();
    }
    collect_fields(registry, archive, Some(partition_name), Some(layer_name))
}

fn collect_fields<T: DataType, A: ArchiveRead>(
    registry: &Registry,
    archive: &A,
    partition: Option<&str>,
    layer: Option<&str>,
) -> Vec<Field<T>> {
    let kind = match LayerKind::of::<T>() {
        Ok(kind) => kind,
        Err(e) => {
            tracing::debug!("Cannot read {} layers: {}", T::TYPE_NAME, e);
            return Vec::new();
        }
    };

    matching_layers(registry, kind, partition, layer)
        .into_iter()
        .filter_map(|target| {
            match read_layer::<T, A>(
                registry,
                archive,
                target.partition,
                target.layer,
                target.occurrence,
            ) {
                Ok(field) => Some(field),
                Err(e) => {
                    tracing::debug!(
                        "Skipping layer {}/{}/{}: {}",
                        target.partition,
                        kind,
                        target.layer,
                        e
                    );
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// Proxy Path
// =============================================================================

/// Proxies for layers named `layer_name` in external partition `partition_name`
///
/// Only structure is read. Either name empty yields an empty result.
pub fn read_proxy_layer<T: DataType, A: ArchiveRead>(
    registry: &Registry,
    archive: &A,
    partition_name: &str,
    layer_name: &str,
    is_vector: bool,
) -> Vec<ProxyField<T>> {
    if partition_name.is_empty() || layer_name.is_empty() {
        return Vec::new();
    }
    collect_proxies(
        registry,
        archive,
        Some(partition_name),
        Some(layer_name),
        is_vector,
    )
}

/// Proxies for every layer named `layer_name` (all layers when empty)
pub fn read_proxy_layers<T: DataType, A: ArchiveRead>(
    registry: &Registry,
    archive: &A,
    layer_name: &str,
    is_vector: bool,
) -> Vec<ProxyField<T>> {
    let layer = (!layer_name.is_empty()).then_some(layer_name);
    collect_proxies(registry, archive, None, layer, is_vector)
}

fn collect_proxies<T: DataType, A: ArchiveRead>(
    registry: &Registry,
    archive: &A,
    partition: Option<&str>,
    layer: Option<&str>,
    is_vector: bool,
) -> Vec<ProxyField<T>> {
    let kind = if is_vector {
        LayerKind::Vector
    } else {
        LayerKind::Scalar
    };

    matching_layers(registry, kind, partition, layer)
        .into_iter()
        .filter_map(|target| {
            match read_proxy::<T, A>(registry, archive, kind, &target) {
                Ok(proxy) => Some(proxy),
                Err(e) => {
                    tracing::debug!(
                        "Skipping proxy {}/{}/{}: {}",
                        target.partition,
                        kind,
                        target.layer,
                        e
                    );
                    None
                }
            }
        })
        .collect()
}

fn read_proxy<T: DataType, A: ArchiveRead>(
    registry: &Registry,
    archive: &A,
    kind: LayerKind,
    target: &LayerTarget<'_>,
) -> Result<ProxyField<T>> {
    let partition = registry
        .int_partition(target.partition)
        .ok_or_else(|| StoreError::MissingGroup(format!("partition '{}'", target.partition)))?;

    let group = locate_layer(
        archive,
        target.partition,
        kind,
        target.layer,
        target.occurrence,
    )?;
    let mut proxy = ProxyField::<T>::read_from(archive, group, Arc::clone(&partition.mapping))?;
    proxy.name = strip_unique_suffix(target.partition).to_string();
    proxy.attribute = target.layer.to_string();
    Ok(proxy)
}
