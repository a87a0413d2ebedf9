//! File Module
//!
//! Partition/layer namespace and the reader and writer sessions built on it.
//!
//! ## Layout
//! ```text
//! /                               version, group_membership, metadata
//! ├── fire.0                      mapping_* attributes
//! │   ├── scalar
//! │   │   ├── density             class, data_type, extents, payload, ...
//! │   │   └── temperature
//! │   └── vector
//! │       └── velocity
//! └── fire.1
//!     └── scalar
//!         └── density
//! ```
//!
//! ## Sessions
//! - [`FieldWriter`]: creates a file, writes layers, persists group
//!   membership and metadata on close
//! - [`FieldReader`]: opens a file, rebuilds the registry, reads layers
//!
//! Each session owns its own [`Registry`]; nothing is shared between
//! sessions.

mod dispatch;
mod layer;
mod partition;
mod reader;
mod registry;
mod writer;

pub use dispatch::{
    read_layer, read_layers, read_layers_in, read_proxy_layer, read_proxy_layers, write_field,
};
pub use layer::{Layer, LayerKind};
pub use partition::Partition;
pub use reader::FieldReader;
pub use registry::{
    make_int_partition_name, strip_unique_suffix, unique_suffix, validate_name,
    GroupMembershipMap, Registry,
};
pub use writer::FieldWriter;

// Root attribute keys
pub(crate) const ATTR_VERSION: &str = "version";
pub(crate) const ATTR_GROUP_MEMBERSHIP: &str = "group_membership";
pub(crate) const ATTR_METADATA: &str = "metadata";
