//! Archive Writer
//!
//! Streams attribute values to a new archive file and writes the group index
//! on `finish()`.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::{BufMut, BytesMut};

use crate::config::CreateMode;
use crate::error::{Result, StoreError};

use super::{join_path, ArchiveWrite, GroupHandle, HEADER_SIZE, MAGIC, NO_PARENT, VERSION};

/// In-memory bookkeeping for one group
struct GroupNode {
    name: String,
    parent: Option<GroupHandle>,
    children: Vec<GroupHandle>,
    attributes: Vec<AttributeEntry>,
    discarded: bool,
}

/// Location of an attribute value inside the data block
struct AttributeEntry {
    key: String,
    offset: u64,
    len: u32,
}

/// Summary of a finished archive
#[derive(Debug, Clone)]
pub struct ArchiveSummary {
    /// Path to the archive file
    pub path: PathBuf,
    /// Number of live groups, root included
    pub group_count: u32,
    /// Number of live attributes
    pub attribute_count: u32,
    /// File size in bytes
    pub file_size: u64,
}

/// Builder for new archive files
pub struct ArchiveWriter {
    /// Output file path
    path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Group arena, indexed by handle; slot 0 is the root
    groups: Vec<GroupNode>,
    /// Current write position (end of data block)
    current_offset: u64,
    /// Running CRC hasher for data section
    data_hasher: crc32fast::Hasher,
    /// Set once a data write fails; the offsets no longer match the file
    poisoned: bool,
}

impl ArchiveWriter {
    /// Create a new archive file
    ///
    /// Writes the header immediately. `FailOnExisting` refuses an existing
    /// path and leaves it untouched.
    pub fn create(path: &Path, mode: CreateMode) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.write(true);
        match mode {
            CreateMode::Overwrite => options.create(true).truncate(true),
            CreateMode::FailOnExisting => options.create_new(true),
        };

        let file = options.open(path).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => StoreError::AlreadyExists(path.to_path_buf()),
            _ => StoreError::Io(e),
        })?;

        let mut writer = BufWriter::new(file);

        // Write header (counts are placeholders, updated in finish)
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&0u32.to_le_bytes())?;
        writer.write_all(&0u32.to_le_bytes())?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            groups: vec![GroupNode {
                name: String::new(),
                parent: None,
                children: Vec::new(),
                attributes: Vec::new(),
                discarded: false,
            }],
            current_offset: HEADER_SIZE,
            data_hasher: crc32fast::Hasher::new(),
            poisoned: false,
        })
    }

    /// Path of the archive being written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an earlier write failed, leaving the data block unusable
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Finish building: write index block, footer, and return a summary
    pub fn finish(mut self, sync: bool) -> Result<ArchiveSummary> {
        self.check_poisoned()?;
        let index_offset = self.current_offset;

        // Pre-order over live groups; new ids are assigned in visit order
        let order = self.live_preorder();
        let mut new_ids = vec![NO_PARENT; self.groups.len()];
        for (new_id, handle) in order.iter().enumerate() {
            new_ids[handle.index()] = new_id as u32;
        }

        let mut index = BytesMut::new();
        for handle in &order {
            let node = &self.groups[handle.index()];
            let parent = node
                .parent
                .map(|p| new_ids[p.index()])
                .unwrap_or(NO_PARENT);
            index.put_u32_le(parent);
            index.put_u32_le(node.name.len() as u32);
            index.put_slice(node.name.as_bytes());
        }

        let mut attribute_count: u32 = 0;
        for handle in &order {
            let node = &self.groups[handle.index()];
            for attr in &node.attributes {
                index.put_u32_le(new_ids[handle.index()]);
                index.put_u32_le(attr.key.len() as u32);
                index.put_u64_le(attr.offset);
                index.put_u32_le(attr.len);
                index.put_slice(attr.key.as_bytes());
                attribute_count += 1;
            }
        }
        self.writer.write_all(&index)?;

        // Write footer: index_offset (8) + data_crc (4) + padding (4)
        let data_crc = self.data_hasher.finalize();
        self.writer.write_all(&index_offset.to_le_bytes())?;
        self.writer.write_all(&data_crc.to_le_bytes())?;
        self.writer.write_all(&[0u8; 4])?;
        self.writer.flush()?;

        // Seek back and fill in the header counts
        let group_count = order.len() as u32;
        let mut file = self
            .writer
            .into_inner()
            .map_err(|e| StoreError::Io(e.into_error()))?;
        file.seek(SeekFrom::Start(6))?; // After magic + version
        file.write_all(&group_count.to_le_bytes())?;
        file.write_all(&attribute_count.to_le_bytes())?;
        if sync {
            file.sync_all()?;
        }

        let file_size = file.metadata()?.len();

        tracing::debug!(
            "Finished archive {} ({} groups, {} attributes, {} bytes)",
            self.path.display(),
            group_count,
            attribute_count,
            file_size
        );

        Ok(ArchiveSummary {
            path: self.path,
            group_count,
            attribute_count,
            file_size,
        })
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_poisoned(&self) -> Result<()> {
        if self.poisoned {
            return Err(StoreError::Poisoned(self.path.clone()));
        }
        Ok(())
    }

    fn node(&self, group: GroupHandle) -> Result<&GroupNode> {
        match self.groups.get(group.index()) {
            Some(node) if !node.discarded => Ok(node),
            _ => Err(StoreError::MissingGroup(format!("handle {}", group.0))),
        }
    }

    /// Live groups in pre-order, children in creation order
    fn live_preorder(&self) -> Vec<GroupHandle> {
        let mut order = Vec::with_capacity(self.groups.len());
        let mut stack = vec![GroupHandle::ROOT];
        while let Some(handle) = stack.pop() {
            order.push(handle);
            let node = &self.groups[handle.index()];
            for child in node.children.iter().rev() {
                if !self.groups[child.index()].discarded {
                    stack.push(*child);
                }
            }
        }
        order
    }
}

impl ArchiveWrite for ArchiveWriter {
    fn create_group(&mut self, parent: GroupHandle, name: &str) -> Result<GroupHandle> {
        self.check_poisoned()?;
        self.node(parent)?;
        if name.is_empty() {
            return Err(StoreError::InvalidName(
                "group name must not be empty".to_string(),
            ));
        }

        let handle = GroupHandle(self.groups.len() as u32);
        self.groups.push(GroupNode {
            name: name.to_string(),
            parent: Some(parent),
            children: Vec::new(),
            attributes: Vec::new(),
            discarded: false,
        });
        self.groups[parent.index()].children.push(handle);
        Ok(handle)
    }

    fn write_attribute(&mut self, group: GroupHandle, key: &str, bytes: &[u8]) -> Result<()> {
        self.check_poisoned()?;
        self.node(group)?;
        let len = u32::try_from(bytes.len()).map_err(|_| {
            StoreError::Serialization(format!(
                "attribute '{}' is too large ({} bytes)",
                key,
                bytes.len()
            ))
        })?;

        // A partial write leaves unknown bytes in the data block
        if let Err(e) = self.writer.write_all(bytes) {
            self.poisoned = true;
            tracing::warn!("Archive {} poisoned by failed write: {}", self.path.display(), e);
            return Err(StoreError::Io(e));
        }
        self.data_hasher.update(bytes);

        let entry = AttributeEntry {
            key: key.to_string(),
            offset: self.current_offset,
            len,
        };
        self.current_offset += bytes.len() as u64;

        // Last write wins; the old bytes stay orphaned in the data block
        let attributes = &mut self.groups[group.index()].attributes;
        match attributes.iter_mut().find(|a| a.key == key) {
            Some(existing) => *existing = entry,
            None => attributes.push(entry),
        }
        Ok(())
    }

    fn find_child(&self, parent: GroupHandle, name: &str) -> Option<GroupHandle> {
        let node = self.node(parent).ok()?;
        node.children
            .iter()
            .copied()
            .find(|child| {
                let child_node = &self.groups[child.index()];
                !child_node.discarded && child_node.name == name
            })
    }

    fn discard_group(&mut self, group: GroupHandle) -> Result<()> {
        if group == GroupHandle::ROOT {
            return Err(StoreError::InvalidName(
                "the root group cannot be discarded".to_string(),
            ));
        }
        self.node(group)?;

        // Children are skipped during finish once their ancestor is discarded
        self.groups[group.index()].discarded = true;
        if let Some(parent) = self.groups[group.index()].parent {
            self.groups[parent.index()].children.retain(|c| *c != group);
        }
        Ok(())
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
