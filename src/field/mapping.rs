//! Spatial mappings
//!
//! A mapping relates a field's voxels to world space. Partitions group fields
//! whose mappings compare equal by value, so the voxel extents a mapping was
//! built for are part of its identity.

use serde::{Deserialize, Serialize};

use crate::archive::{ArchiveRead, ArchiveWrite, GroupHandle};
use crate::error::{Result, StoreError};

use super::Box3i;

/// Row-major 4x4 identity matrix
pub const IDENTITY: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

const NULL_MAPPING: &str = "NullFieldMapping";
const MATRIX_MAPPING: &str = "MatrixFieldMapping";

/// How local space relates to world space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MappingKind {
    /// Local space is world space
    Null,
    /// Row-major local-to-world matrix, applied to column vectors
    Matrix { local_to_world: [f64; 16] },
}

/// Voxel-to-world mapping shared by every field of a partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    kind: MappingKind,
    /// First voxel of the extents this mapping was built for
    origin: [i32; 3],
    /// Voxel count of those extents
    resolution: [i32; 3],
}

impl FieldMapping {
    /// Mapping that places the voxels in the unit cube
    pub fn null() -> Self {
        Self {
            kind: MappingKind::Null,
            origin: [0, 0, 0],
            resolution: [1, 1, 1],
        }
    }

    /// Mapping through a local-to-world matrix
    pub fn matrix(local_to_world: [f64; 16]) -> Self {
        Self {
            kind: MappingKind::Matrix { local_to_world },
            origin: [0, 0, 0],
            resolution: [1, 1, 1],
        }
    }

    /// Uniform scale followed by a translation
    pub fn scale_translate(scale: [f64; 3], translate: [f64; 3]) -> Self {
        let mut m = IDENTITY;
        m[0] = scale[0];
        m[5] = scale[1];
        m[10] = scale[2];
        m[3] = translate[0];
        m[7] = translate[1];
        m[11] = translate[2];
        Self::matrix(m)
    }

    pub fn kind(&self) -> &MappingKind {
        &self.kind
    }

    pub fn origin(&self) -> [i32; 3] {
        self.origin
    }

    pub fn resolution(&self) -> [i32; 3] {
        self.resolution
    }

    /// Name of the mapping variant, as stored on disk
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            MappingKind::Null => NULL_MAPPING,
            MappingKind::Matrix { .. } => MATRIX_MAPPING,
        }
    }

    /// Rebind the mapping to a field's extents
    pub fn set_extents(&mut self, extents: &Box3i) {
        self.origin = extents.min;
        self.resolution = extents.size();
    }

    /// Copy of this mapping bound to `extents`
    pub fn with_extents(mut self, extents: &Box3i) -> Self {
        self.set_extents(extents);
        self
    }

    /// Voxel-space position to local space (the unit cube over the extents)
    pub fn voxel_to_local(&self, p: [f64; 3]) -> [f64; 3] {
        let mut local = [0.0; 3];
        for axis in 0..3 {
            let res = self.resolution[axis].max(1) as f64;
            local[axis] = (p[axis] - self.origin[axis] as f64) / res;
        }
        local
    }

    /// Local-space position to world space
    pub fn local_to_world_point(&self, p: [f64; 3]) -> [f64; 3] {
        match &self.kind {
            MappingKind::Null => p,
            MappingKind::Matrix { local_to_world: m } => {
                let w = m[12] * p[0] + m[13] * p[1] + m[14] * p[2] + m[15];
                let w = if w == 0.0 { 1.0 } else { w };
                [
                    (m[0] * p[0] + m[1] * p[1] + m[2] * p[2] + m[3]) / w,
                    (m[4] * p[0] + m[5] * p[1] + m[6] * p[2] + m[7]) / w,
                    (m[8] * p[0] + m[9] * p[1] + m[10] * p[2] + m[11]) / w,
                ]
            }
        }
    }

    /// Voxel-space position to world space
    pub fn voxel_to_world(&self, p: [f64; 3]) -> [f64; 3] {
        self.local_to_world_point(self.voxel_to_local(p))
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write the mapping as flat attributes on `group`
    pub fn write_to<A: ArchiveWrite>(&self, archive: &mut A, group: GroupHandle) -> Result<()> {
        archive.write_value(group, "mapping_type", self.type_name())?;
        archive.write_value(group, "mapping_origin", &self.origin)?;
        archive.write_value(group, "mapping_resolution", &self.resolution)?;
        if let MappingKind::Matrix { local_to_world } = &self.kind {
            archive.write_value(group, "mapping_local_to_world", local_to_world)?;
        }
        Ok(())
    }

    /// Read a mapping written by [`FieldMapping::write_to`]
    pub fn read_from<A: ArchiveRead>(archive: &A, group: GroupHandle) -> Result<Self> {
        let type_name: String = archive.require_value(group, "mapping_type")?;
        let kind = match type_name.as_str() {
            NULL_MAPPING => MappingKind::Null,
            MATRIX_MAPPING => MappingKind::Matrix {
                local_to_world: archive.require_value(group, "mapping_local_to_world")?,
            },
            other => {
                return Err(StoreError::CorruptArchive(format!(
                    "Unknown mapping type '{}' on {}",
                    other,
                    archive.group_path(group)
                )))
            }
        };

        Ok(Self {
            kind,
            origin: archive.require_value(group, "mapping_origin")?,
            resolution: archive.require_value(group, "mapping_resolution")?,
        })
    }
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self::null()
    }
}
