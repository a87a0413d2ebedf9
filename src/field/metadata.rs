//! Metadata store
//!
//! Typed key/value pairs attached to a file or to a single field. Values are
//! carried through to disk untouched.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single metadata value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    Str(String),
    Int(i32),
    Float(f32),
    VecInt([i32; 3]),
    VecFloat([f32; 3]),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Str(s) => write!(f, "\"{}\"", s),
            MetadataValue::Int(v) => write!(f, "{}", v),
            MetadataValue::Float(v) => write!(f, "{}", v),
            MetadataValue::VecInt(v) => write!(f, "({}, {}, {})", v[0], v[1], v[2]),
            MetadataValue::VecFloat(v) => write!(f, "({}, {}, {})", v[0], v[1], v[2]),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::Str(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::Str(v)
    }
}

impl From<i32> for MetadataValue {
    fn from(v: i32) -> Self {
        MetadataValue::Int(v)
    }
}

impl From<f32> for MetadataValue {
    fn from(v: f32) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<[i32; 3]> for MetadataValue {
    fn from(v: [i32; 3]) -> Self {
        MetadataValue::VecInt(v)
    }
}

impl From<[f32; 3]> for MetadataValue {
    fn from(v: [f32; 3]) -> Self {
        MetadataValue::VecFloat(v)
    }
}

/// Ordered key/value metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    values: BTreeMap<String, MetadataValue>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, returning the previous one
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Option<MetadataValue> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<MetadataValue> {
        self.values.remove(key)
    }

    pub fn str_value(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            MetadataValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn int_value(&self, key: &str) -> Option<i32> {
        match self.values.get(key)? {
            MetadataValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn float_value(&self, key: &str) -> Option<f32> {
        match self.values.get(key)? {
            MetadataValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
