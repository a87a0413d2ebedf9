//! Group Walk
//!
//! Pre-order traversal over the groups of an open archive.

use super::reader::ArchiveReader;
use super::GroupHandle;

/// Iterator over `(depth, handle)` pairs, root first at depth 0
pub struct GroupWalk<'a> {
    archive: &'a ArchiveReader,
    stack: Vec<(usize, GroupHandle)>,
}

impl<'a> GroupWalk<'a> {
    pub(super) fn new(archive: &'a ArchiveReader) -> Self {
        Self {
            archive,
            stack: vec![(0, GroupHandle::ROOT)],
        }
    }
}

impl<'a> Iterator for GroupWalk<'a> {
    type Item = (usize, GroupHandle);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, handle) = self.stack.pop()?;
        if let Some(node) = self.archive.groups.get(handle.index()) {
            // Reverse so the first child is visited next
            for child in node.children.iter().rev() {
                self.stack.push((depth + 1, *child));
            }
        }
        Some((depth, handle))
    }
}
