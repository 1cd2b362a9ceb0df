//! Wavefront OBJ importer

use kiln_core::{KilnError, MaterialHandle, MeshObject, Result};
use std::path::Path;

/// Import every object of an OBJ file.
///
/// Faces are kept as authored while loading so the source polygon count is
/// known, then fan-triangulated into the object's index list. Texture
/// coordinates are flipped to a top-left origin.
pub fn import_obj<P: AsRef<Path>>(path: P) -> Result<Vec<MeshObject>> {
    let path = path.as_ref();
    let load_options = tobj::LoadOptions {
        single_index: true,
        triangulate: false,
        ..Default::default()
    };

    let (models, materials) = tobj::load_obj(path, &load_options)
        .map_err(|e| KilnError::Ingestion(format!("Failed to import OBJ: {}", e)))?;

    let materials = materials.unwrap_or_else(|e| {
        log::warn!("{}: material library not loaded ({})", path.display(), e);
        Vec::new()
    });

    let mut objects = Vec::with_capacity(models.len());
    for (i, model) in models.into_iter().enumerate() {
        let mesh = model.mesh;
        let name = if model.name.is_empty() {
            format!("object_{}", i)
        } else {
            model.name
        };

        let (indices, polygon_count) = triangulate(&mesh.indices, &mesh.face_arities);

        let mut object = MeshObject::new(name);
        object.positions = mesh
            .positions
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();
        object.normals = mesh
            .normals
            .chunks_exact(3)
            .map(|n| [n[0], n[1], n[2]])
            .collect();
        object.uvs = mesh
            .texcoords
            .chunks_exact(2)
            .map(|t| [t[0], 1.0 - t[1]])
            .collect();
        object.indices = indices;
        object.polygon_count = polygon_count;

        if let Some(material) = mesh.material_id.and_then(|id| materials.get(id)) {
            object
                .material_slots
                .push(MaterialHandle::new(material.name.clone()));
        }

        log::debug!(
            "OBJ object '{}': {} vertices, {} polygons",
            object.name,
            object.positions.len(),
            object.polygon_count
        );
        objects.push(object);
    }

    Ok(objects)
}

/// Fan-triangulate polygons; empty `arities` means the faces are triangles
fn triangulate(indices: &[u32], arities: &[u32]) -> (Vec<u32>, usize) {
    if arities.is_empty() {
        return (indices.to_vec(), indices.len() / 3);
    }

    let mut triangles = Vec::with_capacity(indices.len());
    let mut start = 0usize;
    for &arity in arities {
        let face = &indices[start..start + arity as usize];
        for k in 1..face.len().saturating_sub(1) {
            triangles.extend_from_slice(&[face[0], face[k], face[k + 1]]);
        }
        start += arity as usize;
    }
    (triangles, arities.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD_AND_TRIANGLE: &str = "\
mtllib scene.mtl
o Panel
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
usemtl Painted
f 1 2 3 4
o Wedge
v 2 0 0
v 3 0 0
v 2 1 0
f 5 6 7
";

    const MTL: &str = "\
newmtl Painted
Kd 0.5 0.5 0.5
";

    #[test]
    fn test_import_counts_source_polygons() {
        let dir = std::env::temp_dir().join(format!("kiln_obj_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scene.obj");
        std::fs::write(&path, QUAD_AND_TRIANGLE).unwrap();
        std::fs::write(dir.join("scene.mtl"), MTL).unwrap();

        let objects = import_obj(&path).unwrap();
        assert_eq!(objects.len(), 2);

        let panel = &objects[0];
        assert_eq!(panel.name, "Panel");
        assert_eq!(panel.polygon_count, 1);
        assert_eq!(panel.triangle_count(), 2);
        assert_eq!(panel.material_slots, vec![MaterialHandle::new("Painted")]);

        let wedge = &objects[1];
        assert_eq!(wedge.polygon_count, 1);
        assert_eq!(wedge.triangle_count(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_material_library_is_not_fatal() {
        let dir = std::env::temp_dir().join(format!("kiln_obj_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scene.obj");
        std::fs::write(&path, QUAD_AND_TRIANGLE).unwrap();

        let objects = import_obj(&path).unwrap();
        assert_eq!(objects.len(), 2);
        assert!(objects[0].material_slots.is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_fan_triangulation() {
        let (tris, polys) = triangulate(&[0, 1, 2, 3, 4, 5, 6, 7, 8], &[5, 4]);
        assert_eq!(polys, 2);
        assert_eq!(tris, vec![0, 1, 2, 0, 2, 3, 0, 3, 4, 5, 6, 7, 5, 7, 8]);
    }
}
