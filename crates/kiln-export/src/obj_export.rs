//! Wavefront OBJ + MTL writer

use crate::output::{discard, relative_to};
use crate::projection::{project_flat, FlatMaterial};
use crate::SceneExporter;
use kiln_core::{ExportTarget, KilnError, MeshObject, Result};
use kiln_material::MaterialGraph;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes `<name>.obj` and a `<name>.mtl` holding the flat material
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjExporter;

impl ObjExporter {
    pub fn new() -> Self {
        Self
    }
}

impl SceneExporter for ObjExporter {
    fn target(&self) -> ExportTarget {
        ExportTarget::Obj
    }

    fn export(
        &self,
        objects: &[MeshObject],
        material: &MaterialGraph,
        path: &Path,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        match write_scene(objects, material, path, &mut written) {
            Ok(()) => Ok(written),
            Err(e) => {
                discard(&written);
                Err(e)
            }
        }
    }
}

fn write_scene(
    objects: &[MeshObject],
    material: &MaterialGraph,
    path: &Path,
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    let flat = project_flat(material);
    let mtl_path = path.with_extension("mtl");
    let out_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mtl_name = mtl_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    written.push(path.to_path_buf());
    written.push(mtl_path.clone());

    write_file(&mtl_path, |w| write_mtl(w, &flat, out_dir))?;
    write_file(path, |w| {
        writeln!(w, "# Kiln {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(w, "mtllib {}", mtl_name)?;
        let mut offsets = VertexOffsets::default();
        for object in objects {
            offsets = write_object(&mut *w, offsets, object)?;
        }
        Ok(())
    })?;

    log::debug!("Wrote {} ({} object(s))", path.display(), objects.len());
    Ok(())
}

fn write_file<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let to_export_error =
        |e: io::Error| KilnError::Export(format!("Cannot write '{}': {}", path.display(), e));
    let file = File::create(path).map_err(to_export_error)?;
    let mut writer = BufWriter::new(file);
    body(&mut writer).map_err(to_export_error)?;
    writer.flush().map_err(to_export_error)
}

fn write_mtl(mut w: impl Write, material: &FlatMaterial, out_dir: &Path) -> io::Result<()> {
    let [r, g, b, a] = material.base_color;
    writeln!(w, "newmtl {}", material.name)?;
    writeln!(w, "Kd {} {} {}", r, g, b)?;
    writeln!(w, "d {}", a)?;
    writeln!(w, "Pr {}", material.roughness)?;
    writeln!(w, "Pm {}", material.metallic)?;
    if let Some(diffuse) = &material.diffuse_map {
        let relative = relative_to(diffuse, out_dir);
        writeln!(w, "map_Kd {}", relative.to_string_lossy().replace('\\', "/"))?;
    }
    Ok(())
}

/// Number of `v`, `vt` and `vn` records already written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct VertexOffsets {
    positions: usize,
    uvs: usize,
    normals: usize,
}

/// Write one object, returning the offsets for the next one
fn write_object(
    mut w: impl Write,
    offsets: VertexOffsets,
    object: &MeshObject,
) -> io::Result<VertexOffsets> {
    writeln!(w, "o {}", object.name)?;

    for [x, y, z] in &object.positions {
        writeln!(w, "v {} {} {}", x, y, z)?;
    }

    let has_uvs = object.uvs.len() == object.positions.len() && !object.uvs.is_empty();
    if has_uvs {
        for [u, v] in &object.uvs {
            writeln!(w, "vt {} {}", u, 1.0 - v)?;
        }
    }

    let has_normals = object.normals.len() == object.positions.len() && !object.normals.is_empty();
    if has_normals {
        for [x, y, z] in &object.normals {
            writeln!(w, "vn {} {} {}", x, y, z)?;
        }
    }

    if let Some(slot) = object.material_slots.first() {
        writeln!(w, "usemtl {}", slot)?;
    }

    for tri in object.indices.chunks_exact(3) {
        write!(w, "f")?;
        for &i in tri {
            let i = i as usize;
            let v = offsets.positions + i + 1;
            match (has_uvs, has_normals) {
                (true, true) => write!(w, " {}/{}/{}", v, offsets.uvs + i + 1, offsets.normals + i + 1)?,
                (true, false) => write!(w, " {}/{}", v, offsets.uvs + i + 1)?,
                (false, true) => write!(w, " {}//{}", v, offsets.normals + i + 1)?,
                (false, false) => write!(w, " {}", v)?,
            }
        }
        writeln!(w)?;
    }

    Ok(VertexOffsets {
        positions: offsets.positions + object.positions.len(),
        uvs: offsets.uvs + if has_uvs { object.uvs.len() } else { 0 },
        normals: offsets.normals + if has_normals { object.normals.len() } else { 0 },
    })
}
