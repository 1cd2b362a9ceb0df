//! Export targets and the imported scene

use crate::error::{KilnError, Result};
use std::fmt;
use std::str::FromStr;

/// Interchange formats Kiln can write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportTarget {
    Obj,
    Gltf,
}

/// What a target format can express about a material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetCapabilities {
    /// More than one texture per material
    pub multi_texture: bool,
    /// Occlusion, roughness and metallic routed from separate channels
    pub channel_routing: bool,
    /// Images stored as files next to the primary output
    pub sidecar_images: bool,
}

impl ExportTarget {
    /// Every supported target, in the order they are listed to users
    pub const ALL: [ExportTarget; 2] = [ExportTarget::Obj, ExportTarget::Gltf];

    /// File extension of the primary output file
    pub fn extension(&self) -> &'static str {
        match self {
            ExportTarget::Obj => "obj",
            ExportTarget::Gltf => "gltf",
        }
    }

    pub fn capabilities(&self) -> TargetCapabilities {
        match self {
            ExportTarget::Obj => TargetCapabilities {
                multi_texture: false,
                channel_routing: false,
                sidecar_images: false,
            },
            ExportTarget::Gltf => TargetCapabilities {
                multi_texture: true,
                channel_routing: true,
                sidecar_images: true,
            },
        }
    }

    /// Names accepted by [`ExportTarget::from_str`]
    pub fn supported_names() -> Vec<String> {
        Self::ALL.iter().map(|t| t.extension().to_string()).collect()
    }
}

impl FromStr for ExportTarget {
    type Err = KilnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "obj" => Ok(ExportTarget::Obj),
            "gltf" => Ok(ExportTarget::Gltf),
            _ => Err(KilnError::UnsupportedFormat {
                format: s.to_string(),
                supported: Self::supported_names(),
            }),
        }
    }
}

impl fmt::Display for ExportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Reference to a material held in a mesh object's slot list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaterialHandle(String);

impl MaterialHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// A handle is valid when it names a material
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl fmt::Display for MaterialHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A renderable object produced by mesh ingestion.
///
/// Geometry is stored as a triangle list; `polygon_count` keeps the number
/// of faces in the source file (quads and n-gons count once) for reporting.
/// Texture coordinates use a top-left origin, as glTF does.
#[derive(Debug, Clone, Default)]
pub struct MeshObject {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub polygon_count: usize,
    pub material_slots: Vec<MaterialHandle>,
}

impl MeshObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds of the vertex positions
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = *self.positions.first()?;
        let mut min = first;
        let mut max = first;
        for p in self.positions.iter().skip(1) {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        Some((min, max))
    }
}
