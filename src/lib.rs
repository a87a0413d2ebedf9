//! # fieldstore
//!
//! A container file format for named, typed volumetric fields:
//! - Fields grouped into partitions by equal spatial mapping
//! - Scalar and 3-component vector layers of several element types
//! - All-or-nothing writes of a single field
//! - Best-effort scanning reads and payload-free proxy reads
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │               FieldWriter / FieldReader                      │
//! │                   (one file session)                         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Type Dispatch                              │
//! │           (generic over element type + backend)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Registry   │          │   Archive   │
//!   │ (partitions │          │  (groups +  │
//!   │  & layers)  │          │ attributes) │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod archive;
pub mod field;
pub mod file;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StoreError};
pub use config::{Config, CreateMode};
pub use field::{Box3i, DataType, Field, FieldMapping, Metadata, MetadataValue, ProxyField, Vec3};
pub use file::{FieldReader, FieldWriter, LayerKind, Partition, Registry};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of fieldstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
