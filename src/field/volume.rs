//! Field value objects
//!
//! A [`Field`] is a named volume of typed voxels plus the mapping that places
//! it in world space.

use std::sync::Arc;

use crate::archive::{ArchiveRead, ArchiveWrite, GroupHandle};
use crate::error::{Result, StoreError};

use super::storage::{DenseStorage, FieldStorage, SparseStorage};
use super::{Box3i, DataType, FieldMapping, Metadata};

// Attribute keys on a layer group
pub(crate) const ATTR_CLASS: &str = "class";
pub(crate) const ATTR_DATA_TYPE: &str = "data_type";
pub(crate) const ATTR_COMPONENTS: &str = "components";
pub(crate) const ATTR_EXTENTS: &str = "extents";
pub(crate) const ATTR_DATA_WINDOW: &str = "data_window";
pub(crate) const ATTR_METADATA: &str = "metadata";
pub(crate) const ATTR_PAYLOAD: &str = "payload";

/// A named volume of voxels of type `T`
#[derive(Debug, Clone, PartialEq)]
pub struct Field<T: DataType> {
    /// Partition name the field is written to by `FieldWriter::write_field`
    pub name: String,
    /// Layer name the field is written to by `FieldWriter::write_field`
    pub attribute: String,
    mapping: Arc<FieldMapping>,
    extents: Box3i,
    data_window: Box3i,
    storage: FieldStorage<T>,
    metadata: Metadata,
}

impl<T: DataType> Field<T> {
    /// Dense field covering `[0, res - 1]` with a null mapping
    pub fn dense(resolution: [i32; 3]) -> Self {
        let extents = Box3i::from_resolution(resolution);
        Self::dense_with_window(extents, extents)
    }

    /// Dense field whose data window may differ from its extents
    pub fn dense_with_window(extents: Box3i, data_window: Box3i) -> Self {
        let storage = FieldStorage::Dense(DenseStorage::new(window_size(&data_window)));
        Self::from_parts(extents, data_window, storage)
    }

    /// Sparse field covering `[0, res - 1]`, blocks of side `2^block_order`
    pub fn sparse(resolution: [i32; 3], block_order: u8) -> Self {
        let extents = Box3i::from_resolution(resolution);
        let storage =
            FieldStorage::Sparse(SparseStorage::new(window_size(&extents), block_order));
        Self::from_parts(extents, extents, storage)
    }

    fn from_parts(extents: Box3i, data_window: Box3i, storage: FieldStorage<T>) -> Self {
        Self {
            name: String::new(),
            attribute: String::new(),
            mapping: Arc::new(FieldMapping::null().with_extents(&extents)),
            extents,
            data_window,
            storage,
            metadata: Metadata::new(),
        }
    }

    /// Set partition and layer names used by `FieldWriter::write_field`
    pub fn with_names(mut self, name: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.name = name.into();
        self.attribute = attribute.into();
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn extents(&self) -> Box3i {
        self.extents
    }

    pub fn data_window(&self) -> Box3i {
        self.data_window
    }

    pub fn mapping(&self) -> &Arc<FieldMapping> {
        &self.mapping
    }

    /// Replace the mapping; it is rebound to this field's extents
    pub fn set_mapping(&mut self, mapping: FieldMapping) {
        self.mapping = Arc::new(mapping.with_extents(&self.extents));
    }

    pub fn storage(&self) -> &FieldStorage<T> {
        &self.storage
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn class_name(&self) -> &'static str {
        self.storage.class_name()
    }

    pub fn data_type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    pub fn components(&self) -> u8 {
        T::COMPONENTS
    }

    // =========================================================================
    // Voxel Access
    // =========================================================================

    /// Value at voxel `(i, j, k)`; `None` outside the data window
    pub fn value(&self, i: i32, j: i32, k: i32) -> Option<T> {
        self.local(i, j, k).map(|local| self.storage.value(local))
    }

    /// Store a value at voxel `(i, j, k)`
    pub fn set_value(&mut self, i: i32, j: i32, k: i32, value: T) -> Result<()> {
        let local = self
            .local(i, j, k)
            .ok_or(StoreError::OutOfBounds(i, j, k))?;
        self.storage.set_value(local, value);
        Ok(())
    }

    /// Set every voxel of the data window to `value`
    pub fn fill(&mut self, value: T) {
        self.storage.fill(value);
    }

    fn local(&self, i: i32, j: i32, k: i32) -> Option<[usize; 3]> {
        if !self.data_window.contains(i, j, k) {
            return None;
        }
        let min = self.data_window.min;
        Some([
            (i - min[0]) as usize,
            (j - min[1]) as usize,
            (k - min[2]) as usize,
        ])
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Serialize the field into a layer group
    ///
    /// The mapping is not written here; it belongs to the partition.
    pub fn write_to<A: ArchiveWrite>(&self, archive: &mut A, group: GroupHandle) -> Result<()> {
        archive.write_value(group, ATTR_CLASS, self.class_name())?;
        archive.write_value(group, ATTR_DATA_TYPE, T::TYPE_NAME)?;
        archive.write_value(group, ATTR_COMPONENTS, &T::COMPONENTS)?;
        archive.write_value(group, ATTR_EXTENTS, &self.extents)?;
        archive.write_value(group, ATTR_DATA_WINDOW, &self.data_window)?;
        archive.write_value(group, ATTR_METADATA, &self.metadata)?;
        archive.write_value(group, ATTR_PAYLOAD, &self.storage)?;
        Ok(())
    }

    /// Deserialize a field from a layer group
    ///
    /// Fails with `TypeMismatch` when the stored element type is not `T`.
    pub fn read_from<A: ArchiveRead>(
        archive: &A,
        group: GroupHandle,
        mapping: Arc<FieldMapping>,
    ) -> Result<Self> {
        let stored: String = archive.require_value(group, ATTR_DATA_TYPE)?;
        if stored != T::TYPE_NAME {
            return Err(StoreError::TypeMismatch {
                expected: T::TYPE_NAME,
                found: stored,
            });
        }

        let extents: Box3i = archive.require_value(group, ATTR_EXTENTS)?;
        let data_window: Box3i = archive.require_value(group, ATTR_DATA_WINDOW)?;
        if data_window.checked_volume().is_none() {
            return Err(StoreError::CorruptArchive(format!(
                "Data window on {} is too large",
                archive.group_path(group)
            )));
        }
        let metadata: Metadata = archive.read_value(group, ATTR_METADATA)?.unwrap_or_default();
        let storage: FieldStorage<T> = archive.require_value(group, ATTR_PAYLOAD)?;

        if !storage.is_consistent(window_size(&data_window)) {
            return Err(StoreError::CorruptArchive(format!(
                "Payload on {} does not match its data window",
                archive.group_path(group)
            )));
        }

        Ok(Self {
            name: String::new(),
            attribute: String::new(),
            mapping,
            extents,
            data_window,
            storage,
            metadata,
        })
    }
}

fn window_size(window: &Box3i) -> [usize; 3] {
    let size = window.size();
    [size[0] as usize, size[1] as usize, size[2] as usize]
}
