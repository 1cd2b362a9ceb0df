//! glTF/GLB file importer

use kiln_core::{KilnError, MaterialHandle, MeshObject, Result};
use std::path::Path;

/// Import every mesh of a glTF or GLB file.
///
/// The primitives of a mesh are merged into one object; each distinct
/// primitive material becomes a slot, in first-use order.
pub fn import_gltf<P: AsRef<Path>>(path: P) -> Result<Vec<MeshObject>> {
    let path = path.as_ref();
    let (document, buffers, _images) = gltf::import(path)
        .map_err(|e| KilnError::Ingestion(format!("Failed to import glTF: {}", e)))?;

    let mut objects = Vec::new();

    for mesh in document.meshes() {
        let mesh_name = mesh
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));
        let mut object = MeshObject::new(mesh_name);

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "{}: skipping primitive {} ({:?} is not a triangle list)",
                    object.name,
                    primitive.index(),
                    primitive.mode()
                );
                continue;
            }

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .map(|iter| iter.collect())
                .unwrap_or_default();

            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|iter| iter.collect())
                .unwrap_or_default();

            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|iter| iter.into_f32().collect())
                .unwrap_or_default();

            let indices: Vec<u32> = reader
                .read_indices()
                .map(|iter| iter.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());

            let base = object.positions.len() as u32;
            object.polygon_count += indices.len() / 3;
            object.indices.extend(indices.into_iter().map(|i| i + base));

            // Attributes stay aligned with positions even when a primitive lacks them
            if normals.len() == positions.len() {
                object.normals.extend(normals);
            } else {
                object.normals.resize(object.positions.len() + positions.len(), [0.0, 0.0, 1.0]);
            }
            if uvs.len() == positions.len() {
                object.uvs.extend(uvs);
            } else {
                object.uvs.resize(object.positions.len() + positions.len(), [0.0, 0.0]);
            }
            object.positions.extend(positions);

            if let Some(name) = primitive.material().name() {
                let handle = MaterialHandle::new(name);
                if !object.material_slots.contains(&handle) {
                    object.material_slots.push(handle);
                }
            }
        }

        log::debug!(
            "glTF mesh '{}': {} vertices, {} triangles",
            object.name,
            object.positions.len(),
            object.polygon_count
        );
        objects.push(object);
    }

    Ok(objects)
}
