//! Kiln Core - Foundational types for the Kiln converter
//!
//! This crate provides the types every other Kiln crate depends on:
//! - `KilnError` and the `Result` alias
//! - `ExportTarget` - Supported interchange formats and their capabilities
//! - `MeshObject`, `MaterialHandle` - The imported scene as the pipeline sees it
//! - `NodeId` - Graph-local node identifiers
//! - `ContentHash` - SHA-256 hashing of written outputs

mod error;
mod hash;
mod id;
mod types;

pub use error::{KilnError, Result};
pub use hash::ContentHash;
pub use id::NodeId;
pub use types::{ExportTarget, MaterialHandle, MeshObject, TargetCapabilities};
