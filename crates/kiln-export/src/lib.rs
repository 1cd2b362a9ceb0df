//! Kiln Export - Scene writers
//!
//! Each export target gets a projection of the material graph onto what the
//! format can express, plus a writer for geometry and material.

mod gltf_export;
mod obj_export;
mod output;
mod projection;

pub use gltf_export::GltfExporter;
pub use obj_export::ObjExporter;
pub use output::{discard, output_path, prepare_output_dir, relative_to};
pub use projection::{project_flat, project_pbr, FlatMaterial, NormalTexture, PbrMaterial};

use kiln_core::{ExportTarget, MeshObject, Result};
use kiln_material::MaterialGraph;
use std::path::{Path, PathBuf};

/// Default quality for re-encoded JPEG textures
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Writes objects and their material in one target format
pub trait SceneExporter {
    fn target(&self) -> ExportTarget;

    /// Write to `path` (the primary output file), returning every file written
    fn export(
        &self,
        objects: &[MeshObject],
        material: &MaterialGraph,
        path: &Path,
    ) -> Result<Vec<PathBuf>>;
}

/// Writer options shared by all targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub jpeg_quality: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// The writer for `target`
pub fn exporter_for(target: ExportTarget, options: &ExportOptions) -> Box<dyn SceneExporter> {
    match target {
        ExportTarget::Obj => Box::new(ObjExporter::new()),
        ExportTarget::Gltf => Box::new(GltfExporter::new(options.jpeg_quality)),
    }
}

/// Export `objects` bound to `material` as `target` at `path`
pub fn export(
    objects: &[MeshObject],
    material: &MaterialGraph,
    target: ExportTarget,
    path: &Path,
    options: &ExportOptions,
) -> Result<Vec<PathBuf>> {
    prepare_output_dir(path)?;
    let written = exporter_for(target, options).export(objects, material, path)?;
    log::info!(
        "Exported {} object(s) as {} to {}",
        objects.len(),
        target,
        path.display()
    );
    Ok(written)
}
