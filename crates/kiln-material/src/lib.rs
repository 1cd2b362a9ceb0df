//! Kiln Material - PBR material graphs
//!
//! This crate models a shading network as typed nodes and links, builds
//! one from a discovered [`kiln_asset::TextureSet`], and binds the result
//! to imported mesh objects.

mod binder;
mod graph;
mod loader;
mod shader;
mod synth;

pub use binder::bind;
pub use graph::{ColorSpace, GraphError, MaterialGraph, MaterialLink, MaterialNode, Socket};
pub use loader::{FileImageLoader, ImageHandle, ImageLoader};
pub use shader::{BaseShader, MetallicRoughness, ShaderModel};
pub use synth::MaterialSynthesizer;
