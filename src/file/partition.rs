//! Partitions
//!
//! A partition is one mapping plus every layer that shares it.

use std::sync::Arc;

use crate::field::FieldMapping;

use super::layer::{Layer, LayerKind};

/// Partition-level node of a file
///
/// Layer lists are append-only. Adding a layer whose name is already
/// present keeps both; lookups by name return the first one.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Internal (suffixed) name of the partition
    pub name: String,
    /// Mapping shared by every layer of the partition
    pub mapping: Arc<FieldMapping>,
    scalar_layers: Vec<Layer>,
    vector_layers: Vec<Layer>,
}

impl Partition {
    pub fn new(name: impl Into<String>, mapping: Arc<FieldMapping>) -> Self {
        Self {
            name: name.into(),
            mapping,
            scalar_layers: Vec::new(),
            vector_layers: Vec::new(),
        }
    }

    pub fn add_scalar_layer(&mut self, layer: Layer) {
        self.scalar_layers.push(layer);
    }

    pub fn add_vector_layer(&mut self, layer: Layer) {
        self.vector_layers.push(layer);
    }

    pub fn add_layer(&mut self, kind: LayerKind, layer: Layer) {
        match kind {
            LayerKind::Scalar => self.add_scalar_layer(layer),
            LayerKind::Vector => self.add_vector_layer(layer),
        }
    }

    /// First scalar layer named `name`
    pub fn scalar_layer(&self, name: &str) -> Option<&Layer> {
        self.scalar_layers.iter().find(|l| l.name() == name)
    }

    /// First vector layer named `name`
    pub fn vector_layer(&self, name: &str) -> Option<&Layer> {
        self.vector_layers.iter().find(|l| l.name() == name)
    }

    pub fn layer(&self, kind: LayerKind, name: &str) -> Option<&Layer> {
        match kind {
            LayerKind::Scalar => self.scalar_layer(name),
            LayerKind::Vector => self.vector_layer(name),
        }
    }

    pub fn scalar_layers(&self) -> &[Layer] {
        &self.scalar_layers
    }

    pub fn vector_layers(&self) -> &[Layer] {
        &self.vector_layers
    }

    pub fn layers(&self, kind: LayerKind) -> &[Layer] {
        match kind {
            LayerKind::Scalar => &self.scalar_layers,
            LayerKind::Vector => &self.vector_layers,
        }
    }

    /// Scalar layer names in insertion order, duplicates included
    pub fn scalar_layer_names(&self) -> Vec<&str> {
        self.scalar_layers.iter().map(Layer::name).collect()
    }

    /// Vector layer names in insertion order, duplicates included
    pub fn vector_layer_names(&self) -> Vec<&str> {
        self.vector_layers.iter().map(Layer::name).collect()
    }

    /// Total number of layers of both kinds
    pub fn layer_count(&self) -> usize {
        self.scalar_layers.len() + self.vector_layers.len()
    }
}
