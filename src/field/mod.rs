//! Field Module
//!
//! Volumetric field value objects and the pieces they are built from.
//!
//! ## Contents
//! - [`DataType`]: element types (scalar or 3-component vector)
//! - [`Field`]: named voxel volume with dense or sparse storage
//! - [`ProxyField`]: payload-less placeholder used for cheap introspection
//! - [`FieldMapping`]: voxel-to-world mapping, compared by value
//! - [`Metadata`]: typed key/value store attached to files and fields

mod data_type;
mod extents;
mod mapping;
mod metadata;
mod proxy;
mod storage;
mod volume;

pub use data_type::{DataType, Vec3};
pub use extents::Box3i;
pub use mapping::{FieldMapping, MappingKind, IDENTITY};
pub use metadata::{Metadata, MetadataValue};
pub use proxy::ProxyField;
pub use storage::{DenseStorage, FieldStorage, SparseBlock, SparseStorage, MAX_BLOCK_ORDER};
pub use volume::Field;
