//! Element types
//!
//! Every field is parameterized by the type of its voxels. The set is open:
//! implement [`DataType`] for a new type and every generic read/write path
//! accepts it.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A voxel element type that can be stored in a field
pub trait DataType:
    Copy + Default + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Name recorded on disk; reads only accept an exact match
    const TYPE_NAME: &'static str;

    /// Number of components: 1 for scalar layers, 3 for vector layers
    const COMPONENTS: u8;
}

/// Three-component vector element
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

impl<T> Vec3<T> {
    pub const fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }
}

impl<T: Copy> Vec3<T> {
    /// Vector with all components set to `v`
    pub const fn splat(v: T) -> Self {
        Self { x: v, y: v, z: v }
    }
}

macro_rules! impl_data_type {
    ($ty:ty, $name:expr, $components:expr) => {
        impl DataType for $ty {
            const TYPE_NAME: &'static str = $name;
            const COMPONENTS: u8 = $components;
        }
    };
}

impl_data_type!(f32, "float", 1);
impl_data_type!(f64, "double", 1);
impl_data_type!(i32, "int", 1);
impl_data_type!(Vec3<f32>, "vec3_float", 3);
impl_data_type!(Vec3<f64>, "vec3_double", 3);
