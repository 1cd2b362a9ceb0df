//! Kiln Import - Mesh importers
//!
//! Turns OBJ and glTF/GLB files into [`kiln_core::MeshObject`]s. The
//! conversion pipeline only sees the [`MeshImporter`] trait.

mod gltf_import;
mod obj_import;

pub use gltf_import::import_gltf;
pub use obj_import::import_obj;

use kiln_core::{KilnError, MeshObject, Result};
use std::path::Path;

/// Source of the objects a conversion operates on
pub trait MeshImporter {
    fn import_mesh(&self, path: &Path) -> Result<Vec<MeshObject>>;
}

/// Picks an importer from the file extension
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneImporter;

impl SceneImporter {
    pub const EXTENSIONS: [&'static str; 3] = ["obj", "gltf", "glb"];

    pub fn new() -> Self {
        Self
    }
}

impl MeshImporter for SceneImporter {
    fn import_mesh(&self, path: &Path) -> Result<Vec<MeshObject>> {
        if !path.is_file() {
            return Err(KilnError::Ingestion(format!(
                "Input '{}' is not a file",
                path.display()
            )));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let objects = match ext.as_str() {
            "obj" => import_obj(path)?,
            "gltf" | "glb" => import_gltf(path)?,
            _ => {
                return Err(KilnError::Ingestion(format!(
                    "Cannot import '{}': expected one of {}",
                    path.display(),
                    Self::EXTENSIONS.join(", ")
                )))
            }
        };

        log::info!(
            "Imported {} object(s) from {}",
            objects.len(),
            path.display()
        );
        Ok(objects)
    }
}
