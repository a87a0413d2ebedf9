//! Layer records
//!
//! A layer is a field with a name. The mapping lives on the partition, so a
//! layer only records where its data is stored.

use std::fmt;

use crate::error::{Result, StoreError};
use crate::field::DataType;

/// Location of one stored field: its name and the internal partition holding it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Layer {
    name: String,
    parent: String,
}

impl Layer {
    pub fn new(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: parent.into(),
        }
    }

    /// Layer name as given by the user
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Internal name of the partition holding the layer
    pub fn parent(&self) -> &str {
        &self.parent
    }
}

/// Whether a layer holds scalar or 3-component vector values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Scalar,
    Vector,
}

impl LayerKind {
    /// Kind selected by an element type's arity
    pub fn of<T: DataType>() -> Result<Self> {
        Self::from_components(T::COMPONENTS)
    }

    pub fn from_components(components: u8) -> Result<Self> {
        match components {
            1 => Ok(LayerKind::Scalar),
            3 => Ok(LayerKind::Vector),
            other => Err(StoreError::UnsupportedArity(other)),
        }
    }

    /// Name of the partition subgroup holding layers of this kind
    pub fn group_name(self) -> &'static str {
        match self {
            LayerKind::Scalar => "scalar",
            LayerKind::Vector => "vector",
        }
    }

    pub const ALL: [LayerKind; 2] = [LayerKind::Scalar, LayerKind::Vector];
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.group_name())
    }
}
