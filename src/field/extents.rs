//! Integer voxel boxes

use serde::{Deserialize, Serialize};

/// Inclusive integer box in voxel space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Box3i {
    pub min: [i32; 3],
    pub max: [i32; 3],
}

impl Box3i {
    pub const fn new(min: [i32; 3], max: [i32; 3]) -> Self {
        Self { min, max }
    }

    /// Box covering `[0, res - 1]` on each axis
    pub const fn from_resolution(res: [i32; 3]) -> Self {
        Self {
            min: [0, 0, 0],
            max: [res[0] - 1, res[1] - 1, res[2] - 1],
        }
    }

    /// Number of voxels along each axis (0 when empty, saturating at `i32::MAX`)
    pub fn size(&self) -> [i32; 3] {
        let axis = |a: usize| {
            (i64::from(self.max[a]) - i64::from(self.min[a]) + 1).clamp(0, i64::from(i32::MAX))
                as i32
        };
        [axis(0), axis(1), axis(2)]
    }

    pub fn is_empty(&self) -> bool {
        self.size().iter().any(|&s| s == 0)
    }

    /// Total number of voxels
    /// Voxel count, `None` if it does not fit in `usize`
    pub fn checked_volume(&self) -> Option<usize> {
        self.size()
            .iter()
            .try_fold(1usize, |acc, &s| acc.checked_mul(s as usize))
    }

    pub fn volume(&self) -> usize {
        self.checked_volume().unwrap_or(usize::MAX)
    }

    pub fn contains(&self, i: i32, j: i32, k: i32) -> bool {
        i >= self.min[0]
            && i <= self.max[0]
            && j >= self.min[1]
            && j <= self.max[1]
            && k >= self.min[2]
            && k <= self.max[2]
    }
}
