//! Kiln Asset - Texture discovery and conversion metadata
//!
//! This crate finds the texture maps that belong to an imported mesh,
//! loads the layered Kiln configuration, and writes the optional
//! `.asset.toml` sidecar describing a finished conversion.

mod config;
mod discovery;
mod sidecar;
mod types;

pub use config::{DiscoveryConfig, ExportConfig, KilnConfig, MaterialConfig};
pub use discovery::{classify, CollisionPolicy, TextureDiscovery, TextureSource};
pub use sidecar::{write_conversion_sidecar, ConversionMeta};
pub use types::{TextureCandidate, TextureRole, TextureSet};
