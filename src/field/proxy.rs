//! Proxy fields
//!
//! Structure-only stand-ins for stored fields. Reading a proxy touches the
//! layer's descriptive attributes but never its payload.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::archive::{ArchiveRead, GroupHandle};
use crate::error::Result;

use super::volume::{ATTR_CLASS, ATTR_DATA_TYPE, ATTR_DATA_WINDOW, ATTR_EXTENTS, ATTR_METADATA};
use super::{Box3i, DataType, FieldMapping, Metadata};

/// Placeholder for a stored field, labelled with element type `T`
///
/// `T` is only a label: the stored element type may differ and is reported
/// by [`ProxyField::stored_type`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyField<T: DataType> {
    pub name: String,
    pub attribute: String,
    mapping: Arc<FieldMapping>,
    extents: Box3i,
    data_window: Box3i,
    metadata: Metadata,
    stored_class: String,
    stored_type: String,
    _marker: PhantomData<T>,
}

impl<T: DataType> ProxyField<T> {
    /// Read the structure of a layer group
    pub fn read_from<A: ArchiveRead>(
        archive: &A,
        group: GroupHandle,
        mapping: Arc<FieldMapping>,
    ) -> Result<Self> {
        Ok(Self {
            name: String::new(),
            attribute: String::new(),
            mapping,
            extents: archive.require_value(group, ATTR_EXTENTS)?,
            data_window: archive.require_value(group, ATTR_DATA_WINDOW)?,
            metadata: archive.read_value(group, ATTR_METADATA)?.unwrap_or_default(),
            stored_class: archive.read_value(group, ATTR_CLASS)?.unwrap_or_default(),
            stored_type: archive.read_value(group, ATTR_DATA_TYPE)?.unwrap_or_default(),
            _marker: PhantomData,
        })
    }

    pub fn extents(&self) -> Box3i {
        self.extents
    }

    pub fn data_window(&self) -> Box3i {
        self.data_window
    }

    pub fn mapping(&self) -> &Arc<FieldMapping> {
        &self.mapping
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Storage class of the stored field ("DenseField", "SparseField")
    pub fn stored_class(&self) -> &str {
        &self.stored_class
    }

    /// Element type name of the stored field
    pub fn stored_type(&self) -> &str {
        &self.stored_type
    }

    /// Element type name this proxy is labelled with
    pub fn data_type_name(&self) -> &'static str {
        T::TYPE_NAME
    }
}
