//! Voxel storage variants
//!
//! Dense storage keeps one value per voxel of the data window. Sparse storage
//! splits the window into cubic blocks of side `2^block_order`; a block holds
//! either a single fill value or a full array of voxels.

use serde::{Deserialize, Serialize};

use super::DataType;

/// Storage behind a field, indexed by data-window-relative coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: DataType")]
pub enum FieldStorage<T> {
    Dense(DenseStorage<T>),
    Sparse(SparseStorage<T>),
}

impl<T: DataType> FieldStorage<T> {
    /// Class name recorded on disk
    pub fn class_name(&self) -> &'static str {
        match self {
            FieldStorage::Dense(_) => "DenseField",
            FieldStorage::Sparse(_) => "SparseField",
        }
    }

    pub(crate) fn value(&self, local: [usize; 3]) -> T {
        match self {
            FieldStorage::Dense(dense) => dense.value(local),
            FieldStorage::Sparse(sparse) => sparse.value(local),
        }
    }

    pub(crate) fn set_value(&mut self, local: [usize; 3], value: T) {
        match self {
            FieldStorage::Dense(dense) => dense.set_value(local, value),
            FieldStorage::Sparse(sparse) => sparse.set_value(local, value),
        }
    }

    /// Whether the stored shape matches a data window of `size` voxels
    pub(crate) fn is_consistent(&self, size: [usize; 3]) -> bool {
        match self {
            FieldStorage::Dense(dense) => {
                dense.resolution == size && voxel_count(size) == Some(dense.data.len())
            }
            FieldStorage::Sparse(sparse) => {
                if sparse.block_order > MAX_BLOCK_ORDER {
                    return false;
                }
                let side = sparse.side();
                let block_res = size.map(|s| s.div_ceil(side));
                let block_len = side.pow(3);
                sparse.block_res == block_res
                    && voxel_count(block_res) == Some(sparse.blocks.len())
                    && sparse.blocks.iter().all(|b| match b {
                        SparseBlock::Empty(_) => true,
                        SparseBlock::Allocated(values) => values.len() == block_len,
                    })
            }
        }
    }

    pub(crate) fn fill(&mut self, value: T) {
        match self {
            FieldStorage::Dense(dense) => dense.data.iter_mut().for_each(|v| *v = value),
            FieldStorage::Sparse(sparse) => sparse.fill(value),
        }
    }
}

/// Number of cells in a `size` grid, `None` on overflow
pub(crate) fn voxel_count(size: [usize; 3]) -> Option<usize> {
    size.iter().try_fold(1usize, |acc, &s| acc.checked_mul(s))
}

// =============================================================================
// Dense
// =============================================================================

/// One value per voxel, x varying fastest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: DataType")]
pub struct DenseStorage<T> {
    resolution: [usize; 3],
    data: Vec<T>,
}

impl<T: DataType> DenseStorage<T> {
    pub fn new(resolution: [usize; 3]) -> Self {
        Self {
            resolution,
            data: vec![T::default(); resolution.iter().product()],
        }
    }

    /// Raw voxel values, x varying fastest
    pub fn values(&self) -> &[T] {
        &self.data
    }

    fn offset(&self, local: [usize; 3]) -> usize {
        local[0] + self.resolution[0] * (local[1] + self.resolution[1] * local[2])
    }

    fn value(&self, local: [usize; 3]) -> T {
        self.data[self.offset(local)]
    }

    fn set_value(&mut self, local: [usize; 3], value: T) {
        let offset = self.offset(local);
        self.data[offset] = value;
    }
}

// =============================================================================
// Sparse
// =============================================================================

/// A block of sparse storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: DataType")]
pub enum SparseBlock<T> {
    /// Every voxel of the block has this value
    Empty(T),
    /// One value per voxel of the block
    Allocated(Vec<T>),
}

/// Largest supported block order; blocks are at most `2^15` voxels on a side
pub const MAX_BLOCK_ORDER: u8 = 15;

/// Block-sparse storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: DataType")]
pub struct SparseStorage<T> {
    block_order: u8,
    block_res: [usize; 3],
    blocks: Vec<SparseBlock<T>>,
}

impl<T: DataType> SparseStorage<T> {
    /// Orders above [`MAX_BLOCK_ORDER`] are clamped to it
    pub fn new(resolution: [usize; 3], block_order: u8) -> Self {
        let block_order = block_order.min(MAX_BLOCK_ORDER);
        let side = 1usize << block_order;
        let block_res = [
            resolution[0].div_ceil(side),
            resolution[1].div_ceil(side),
            resolution[2].div_ceil(side),
        ];
        let count = block_res.iter().product();
        Self {
            block_order,
            block_res,
            blocks: vec![SparseBlock::Empty(T::default()); count],
        }
    }

    pub fn block_order(&self) -> u8 {
        self.block_order
    }

    /// Number of blocks along each axis
    pub fn block_res(&self) -> [usize; 3] {
        self.block_res
    }

    /// Number of blocks holding per-voxel data
    pub fn allocated_blocks(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, SparseBlock::Allocated(_)))
            .count()
    }

    fn side(&self) -> usize {
        1 << self.block_order
    }

    fn locate(&self, local: [usize; 3]) -> (usize, usize) {
        let side = self.side();
        let mask = side - 1;
        let b = [
            local[0] >> self.block_order,
            local[1] >> self.block_order,
            local[2] >> self.block_order,
        ];
        let block = b[0] + self.block_res[0] * (b[1] + self.block_res[1] * b[2]);
        let within = (local[0] & mask) + side * ((local[1] & mask) + side * (local[2] & mask));
        (block, within)
    }

    fn value(&self, local: [usize; 3]) -> T {
        let (block, within) = self.locate(local);
        match &self.blocks[block] {
            SparseBlock::Empty(v) => *v,
            SparseBlock::Allocated(values) => values[within],
        }
    }

    fn set_value(&mut self, local: [usize; 3], value: T) {
        let (block, within) = self.locate(local);
        let side = self.side();
        let slot = &mut self.blocks[block];
        if let SparseBlock::Empty(current) = *slot {
            if current == value {
                return;
            }
            *slot = SparseBlock::Allocated(vec![current; side * side * side]);
        }
        if let SparseBlock::Allocated(values) = slot {
            values[within] = value;
        }
    }

    fn fill(&mut self, value: T) {
        self.blocks
            .iter_mut()
            .for_each(|b| *b = SparseBlock::Empty(value));
    }
}
