//! Archive Module
//!
//! Hierarchical container of named groups carrying opaque attribute blobs.
//!
//! ## Responsibilities
//! - Create groups addressed by handle, children kept in creation order
//! - Persist attribute bytes under a group
//! - Discard the groups of a failed write
//! - Load the group tree and serve attribute reads on demand
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic: "F3DA" (4) | Version: u16 (2)                  │
//! │   Groups: u32 (4)   | Attributes: u32 (4)               │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                   │
//! │   attribute value bytes, appended as written            │
//! ├─────────────────────────────────────────────────────────┤
//! │ Index Block (variable)                                  │
//! │   Groups:     [Parent: u32][NameLen: u32][Name]         │
//! │   Attributes: [Group: u32][KeyLen: u32][Offset: u64]    │
//! │               [Len: u32][Key]                           │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (16 bytes)                                       │
//! │   IndexOffset: u64 (8) | DataCRC: u32 (4) | Padding (4) │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Groups are listed in pre-order, so a parent always precedes its children
//! and siblings keep their creation order.

mod reader;
mod walk;
mod writer;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

pub use reader::ArchiveReader;
pub use walk::GroupWalk;
pub use writer::{ArchiveSummary, ArchiveWriter};

// =============================================================================
// Shared Constants (used by writer and reader)
// =============================================================================

/// Magic bytes identifying a fieldstore archive
pub(crate) const MAGIC: &[u8; 4] = b"F3DA";

/// Current archive format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + GroupCount (4) + AttrCount (4) = 14 bytes
pub(crate) const HEADER_SIZE: u64 = 14;

/// Footer size: IndexOffset (8) + DataCRC (4) + Padding (4) = 16 bytes
pub(crate) const FOOTER_SIZE: u64 = 16;

/// Parent id stored for the root group
pub(crate) const NO_PARENT: u32 = u32::MAX;

// =============================================================================
// Group Handles
// =============================================================================

/// Handle to a group inside an open archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupHandle(pub(crate) u32);

impl GroupHandle {
    /// The root group of every archive
    pub const ROOT: GroupHandle = GroupHandle(0);

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A child group as listed by `ArchiveRead::list_children`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub name: String,
    pub handle: GroupHandle,
}

// =============================================================================
// Backend Traits
// =============================================================================

/// Write half of the archive backend
pub trait ArchiveWrite {
    /// Handle of the root group
    fn root(&self) -> GroupHandle {
        GroupHandle::ROOT
    }

    /// Create a new child group. Sibling names may repeat.
    fn create_group(&mut self, parent: GroupHandle, name: &str) -> Result<GroupHandle>;

    /// Store an attribute on a group, replacing any previous value for `key`
    fn write_attribute(&mut self, group: GroupHandle, key: &str, bytes: &[u8]) -> Result<()>;

    /// First live child of `parent` named `name`
    fn find_child(&self, parent: GroupHandle, name: &str) -> Option<GroupHandle>;

    /// Drop a group and everything below it from the archive
    fn discard_group(&mut self, group: GroupHandle) -> Result<()>;

    /// Slash-separated path of a group, for diagnostics
    fn group_path(&self, group: GroupHandle) -> String;

    /// Encode `value` with bincode and store it as an attribute
    fn write_value<V: Serialize + ?Sized>(
        &mut self,
        group: GroupHandle,
        key: &str,
        value: &V,
    ) -> Result<()>
    where
        Self: Sized,
    {
        let bytes = encode(value)?;
        self.write_attribute(group, key, &bytes)
    }
}

/// Read half of the archive backend
pub trait ArchiveRead {
    /// Handle of the root group
    fn root(&self) -> GroupHandle {
        GroupHandle::ROOT
    }

    /// Fetch an attribute's bytes; `Ok(None)` when the key is absent
    fn read_attribute(&self, group: GroupHandle, key: &str) -> Result<Option<Bytes>>;

    /// Children of a group in creation order
    fn list_children(&self, group: GroupHandle) -> Result<Vec<ChildEntry>>;

    /// Slash-separated path of a group, for diagnostics
    fn group_path(&self, group: GroupHandle) -> String;

    /// First child of `parent` named `name`
    fn find_child(&self, parent: GroupHandle, name: &str) -> Result<Option<GroupHandle>> {
        Ok(self
            .list_children(parent)?
            .into_iter()
            .find(|child| child.name == name)
            .map(|child| child.handle))
    }

    /// Decode an attribute with bincode; `Ok(None)` when the key is absent
    fn read_value<V: DeserializeOwned>(&self, group: GroupHandle, key: &str) -> Result<Option<V>>
    where
        Self: Sized,
    {
        match self.read_attribute(group, key)? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Like `read_value`, but a missing key is an error
    fn require_value<V: DeserializeOwned>(&self, group: GroupHandle, key: &str) -> Result<V>
    where
        Self: Sized,
    {
        self.read_value(group, key)?
            .ok_or_else(|| StoreError::MissingAttribute {
                group: self.group_path(group),
                key: key.to_string(),
            })
    }
}

// =============================================================================
// Attribute Encoding
// =============================================================================

/// Encode a value into attribute bytes
pub fn encode<V: Serialize + ?Sized>(value: &V) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Decode attribute bytes into a value
pub fn decode<V: DeserializeOwned>(bytes: &[u8]) -> Result<V> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Join group names into a display path ("/" for the root)
pub(crate) fn join_path<'a>(names: impl DoubleEndedIterator<Item = &'a str>) -> String {
    let parts: Vec<&str> = names.rev().collect();
    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}
