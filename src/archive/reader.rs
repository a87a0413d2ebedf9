//! Archive Reader
//!
//! Opens archive files, loads the group index into memory and reads
//! attribute values on demand.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::{Buf, Bytes};
use parking_lot::Mutex;

use crate::error::{Result, StoreError};

use super::walk::GroupWalk;
use super::{
    join_path, ArchiveRead, ChildEntry, GroupHandle, FOOTER_SIZE, HEADER_SIZE, MAGIC, NO_PARENT,
    VERSION,
};

/// Group as loaded from the index block
pub(super) struct LoadedGroup {
    pub(super) name: String,
    pub(super) parent: Option<GroupHandle>,
    pub(super) children: Vec<GroupHandle>,
    attributes: Vec<AttributeLocation>,
}

struct AttributeLocation {
    key: String,
    offset: u64,
    len: u32,
}

/// Reader for archive files with an in-memory group index
pub struct ArchiveReader {
    /// Path of the open archive
    path: PathBuf,
    /// File handle for attribute reads; the lock lets reads take `&self`
    file: Mutex<BufReader<File>>,
    /// Group tree, indexed by handle
    pub(super) groups: Vec<LoadedGroup>,
}

impl ArchiveReader {
    /// Open an archive for reading
    ///
    /// Loads the entire group index into memory. When `verify_checksums` is
    /// set the data block is read once and checked against the footer CRC.
    pub fn open(path: &Path, verify_checksums: bool) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(StoreError::CorruptArchive(format!(
                "{} is too small to be an archive ({} bytes)",
                path.display(),
                file_size
            )));
        }

        // Read and validate header
        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;
        let mut header = &header[..];

        let mut magic = [0u8; 4];
        header.copy_to_slice(&mut magic);
        if &magic != MAGIC {
            return Err(StoreError::CorruptArchive(format!(
                "Invalid archive magic: expected F3DA, got {:?}",
                magic
            )));
        }

        let version = header.get_u16_le();
        if version != VERSION {
            return Err(StoreError::CorruptArchive(format!(
                "Unsupported archive version: {}",
                version
            )));
        }

        let group_count = header.get_u32_le();
        let attribute_count = header.get_u32_le();

        // Read footer to get index offset
        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;
        let mut footer = &footer[..];
        let index_offset = footer.get_u64_le();
        let data_crc = footer.get_u32_le();

        if index_offset < HEADER_SIZE || index_offset > file_size - FOOTER_SIZE {
            return Err(StoreError::CorruptArchive(format!(
                "Index offset {} out of range",
                index_offset
            )));
        }

        if verify_checksums {
            file.seek(SeekFrom::Start(HEADER_SIZE))?;
            let mut data = vec![0u8; (index_offset - HEADER_SIZE) as usize];
            file.read_exact(&mut data)?;
            let actual = crc32fast::hash(&data);
            if actual != data_crc {
                return Err(StoreError::CorruptArchive(format!(
                    "Data checksum mismatch: expected {:08x}, got {:08x}",
                    data_crc, actual
                )));
            }
        }

        // Load index into memory
        file.seek(SeekFrom::Start(index_offset))?;
        let index_size = file_size - FOOTER_SIZE - index_offset;
        let mut index_data = vec![0u8; index_size as usize];
        file.read_exact(&mut index_data)?;
        let mut index = Bytes::from(index_data);

        let groups = Self::parse_groups(&mut index, group_count)?;
        let groups = Self::parse_attributes(&mut index, attribute_count, groups, index_offset)?;

        if index.has_remaining() {
            return Err(StoreError::CorruptArchive(format!(
                "{} trailing bytes after index",
                index.remaining()
            )));
        }

        file.seek(SeekFrom::Start(0))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(BufReader::new(file)),
            groups,
        })
    }

    /// Path of the open archive
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of groups, root included
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Name of a group (empty for the root)
    pub fn group_name(&self, group: GroupHandle) -> Option<&str> {
        self.groups.get(group.index()).map(|g| g.name.as_str())
    }

    /// Attribute keys stored on a group, in write order
    pub fn attribute_keys(&self, group: GroupHandle) -> Vec<&str> {
        self.groups
            .get(group.index())
            .map(|g| g.attributes.iter().map(|a| a.key.as_str()).collect())
            .unwrap_or_default()
    }

    /// Pre-order walk over every group
    pub fn walk(&self) -> GroupWalk<'_> {
        GroupWalk::new(self)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn parse_groups(index: &mut Bytes, count: u32) -> Result<Vec<LoadedGroup>> {
        // Every entry takes at least 8 bytes; the header count is untrusted
        let capacity = (count as usize).min(index.remaining() / 8);
        let mut groups: Vec<LoadedGroup> = Vec::with_capacity(capacity);

        for id in 0..count {
            ensure_remaining(index, 8, "group entry")?;
            let parent = index.get_u32_le();
            let name_len = index.get_u32_le() as usize;
            ensure_remaining(index, name_len, "group name")?;
            let name = read_string(index, name_len)?;

            let parent = if parent == NO_PARENT {
                if id != 0 {
                    return Err(StoreError::CorruptArchive(format!(
                        "Group {} has no parent but is not the root",
                        id
                    )));
                }
                None
            } else {
                // Pre-order: parents always come first
                if parent >= id {
                    return Err(StoreError::CorruptArchive(format!(
                        "Group {} references parent {} out of order",
                        id, parent
                    )));
                }
                groups[parent as usize].children.push(GroupHandle(id));
                Some(GroupHandle(parent))
            };

            groups.push(LoadedGroup {
                name,
                parent,
                children: Vec::new(),
                attributes: Vec::new(),
            });
        }

        if groups.is_empty() {
            return Err(StoreError::CorruptArchive(
                "Archive has no root group".to_string(),
            ));
        }

        Ok(groups)
    }

    fn parse_attributes(
        index: &mut Bytes,
        count: u32,
        mut groups: Vec<LoadedGroup>,
        data_end: u64,
    ) -> Result<Vec<LoadedGroup>> {
        for _ in 0..count {
            ensure_remaining(index, 20, "attribute entry")?;
            let group = index.get_u32_le() as usize;
            let key_len = index.get_u32_le() as usize;
            let offset = index.get_u64_le();
            let len = index.get_u32_le();
            ensure_remaining(index, key_len, "attribute key")?;
            let key = read_string(index, key_len)?;

            if offset < HEADER_SIZE || offset.saturating_add(len as u64) > data_end {
                return Err(StoreError::CorruptArchive(format!(
                    "Attribute '{}' range {}+{} outside data block",
                    key, offset, len
                )));
            }

            let target = groups.get_mut(group).ok_or_else(|| {
                StoreError::CorruptArchive(format!(
                    "Attribute '{}' references unknown group {}",
                    key, group
                ))
            })?;
            target.attributes.push(AttributeLocation { key, offset, len });
        }
        Ok(groups)
    }

    fn group(&self, group: GroupHandle) -> Result<&LoadedGroup> {
        self.groups
            .get(group.index())
            .ok_or_else(|| StoreError::MissingGroup(format!("handle {}", group.0)))
    }
}

impl ArchiveRead for ArchiveReader {
    fn read_attribute(&self, group: GroupHandle, key: &str) -> Result<Option<Bytes>> {
        let node = self.group(group)?;
        let location = match node.attributes.iter().rev().find(|a| a.key == key) {
            Some(location) => location,
            None => return Ok(None),
        };

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(location.offset))?;
        let mut value = vec![0u8; location.len as usize];
        file.read_exact(&mut value)?;

        Ok(Some(Bytes::from(value)))
    }

    fn list_children(&self, group: GroupHandle) -> Result<Vec<ChildEntry>> {
        let node = self.group(group)?;
        Ok(node
            .children
            .iter()
            .map(|handle| ChildEntry {
                name: self.groups[handle.index()].name.clone(),
                handle: *handle,
            })
            .collect())
    }

    fn group_path(&self, group: GroupHandle) -> String {
        let mut names = Vec::new();
        let mut current = Some(group);
        while let Some(handle) = current {
            match self.groups.get(handle.index()) {
                Some(node) => {
                    if node.parent.is_some() {
                        names.push(node.name.as_str());
                    }
                    current = node.parent;
                }
                None => break,
            }
        }
        join_path(names.into_iter())
    }
}

fn ensure_remaining(index: &Bytes, needed: usize, what: &str) -> Result<()> {
    if index.remaining() < needed {
        return Err(StoreError::CorruptArchive(format!(
            "Truncated index while reading {}",
            what
        )));
    }
    Ok(())
}

fn read_string(index: &mut Bytes, len: usize) -> Result<String> {
    let raw = index.split_to(len);
    String::from_utf8(raw.to_vec())
        .map_err(|e| StoreError::CorruptArchive(format!("Invalid UTF-8 name: {}", e)))
}
