//! glTF 2.0 writer, "separate" layout
//!
//! Produces `<name>.gltf` (JSON), `<name>.bin` (geometry, omitted when no
//! object has any) and one JPEG per referenced texture, all in the same
//! directory. Objects without vertices or indices are skipped.

use crate::output::discard;
use crate::projection::{project_pbr, PbrMaterial};
use crate::SceneExporter;
use gltf::json as gj;
use image::codecs::jpeg::JpegEncoder;
use kiln_core::{ExportTarget, KilnError, MeshObject, Result};
use kiln_material::MaterialGraph;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct GltfExporter {
    jpeg_quality: u8,
}

impl GltfExporter {
    /// `jpeg_quality` is clamped to 1..=100
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    fn write_scene(
        &self,
        objects: &[MeshObject],
        material: &MaterialGraph,
        path: &Path,
        written: &mut Vec<PathBuf>,
    ) -> Result<()> {
        let out_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let bin_path = path.with_extension("bin");
        written.push(path.to_path_buf());

        let pbr = project_pbr(material);

        let mut image_uris = BTreeMap::new();
        for texture in pbr.textures() {
            let jpeg_path = out_dir.join(jpeg_name(&texture));
            written.push(jpeg_path.clone());
            encode_jpeg(&texture, &jpeg_path, self.jpeg_quality)?;
            image_uris.insert(texture, file_name(&jpeg_path));
        }

        let mut ctx = ExportContext::new();
        let material_index = ctx.build_material(&pbr, &image_uris);
        let material_name = material.handle();
        for object in objects {
            if object.positions.is_empty() || object.indices.is_empty() {
                log::warn!("Skipping '{}': no geometry to export", object.name);
                continue;
            }
            let bound = object.material_slots.first() == Some(&material_name);
            ctx.build_mesh(object, bound.then_some(material_index));
        }

        if ctx.buffer_data.is_empty() {
            ctx.finalize(None);
        } else {
            ctx.finalize(Some(file_name(&bin_path).as_str()));
            written.push(bin_path.clone());
            std::fs::write(&bin_path, &ctx.buffer_data).map_err(|e| write_error(&bin_path, e))?;
        }
        let json = serde_json::to_string_pretty(&ctx.root)
            .map_err(|e| KilnError::Export(format!("glTF JSON serialization failed: {}", e)))?;
        std::fs::write(path, json).map_err(|e| write_error(path, e))?;

        log::debug!(
            "Wrote {} ({} bytes of geometry, {} image(s))",
            path.display(),
            ctx.buffer_data.len(),
            image_uris.len()
        );
        Ok(())
    }
}

impl SceneExporter for GltfExporter {
    fn target(&self) -> ExportTarget {
        ExportTarget::Gltf
    }

    fn export(
        &self,
        objects: &[MeshObject],
        material: &MaterialGraph,
        path: &Path,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        match self.write_scene(objects, material, path, &mut written) {
            Ok(()) => Ok(written),
            Err(e) => {
                discard(&written);
                Err(e)
            }
        }
    }
}

struct ExportContext {
    root: gj::Root,
    buffer_data: Vec<u8>,
}

impl ExportContext {
    fn new() -> Self {
        let mut root = gj::Root::default();
        root.asset.generator = Some(format!("Kiln {}", env!("CARGO_PKG_VERSION")));
        Self {
            root,
            buffer_data: Vec::new(),
        }
    }

    fn build_material(&mut self, pbr: &PbrMaterial, image_uris: &BTreeMap<PathBuf, String>) -> u32 {
        let base_color_texture = pbr
            .base_color_texture
            .as_ref()
            .and_then(|p| self.texture_info(p, image_uris));
        let metallic_roughness_texture = pbr
            .metallic_roughness_texture
            .as_ref()
            .and_then(|p| self.texture_info(p, image_uris));

        let normal_texture = pbr.normal_texture.as_ref().and_then(|normal| {
            let info = self.texture_info(&normal.path, image_uris)?;
            Some(gj::material::NormalTexture {
                index: info.index,
                scale: normal.strength,
                tex_coord: 0,
                extensions: None,
                extras: Default::default(),
            })
        });

        let occlusion_texture = pbr.occlusion_texture.as_ref().and_then(|p| {
            let info = self.texture_info(p, image_uris)?;
            Some(gj::material::OcclusionTexture {
                index: info.index,
                strength: gj::material::StrengthFactor(1.0),
                tex_coord: 0,
                extensions: None,
                extras: Default::default(),
            })
        });

        let pbr_json = gj::material::PbrMetallicRoughness {
            base_color_factor: gj::material::PbrBaseColorFactor(pbr.base_color_factor),
            base_color_texture,
            metallic_factor: gj::material::StrengthFactor(pbr.metallic_factor),
            roughness_factor: gj::material::StrengthFactor(pbr.roughness_factor),
            metallic_roughness_texture,
            extensions: None,
            extras: Default::default(),
        };

        let index = self.root.materials.len() as u32;
        self.root.materials.push(gj::Material {
            name: Some(pbr.name.clone()),
            alpha_cutoff: None,
            alpha_mode: gj::validation::Checked::Valid(gj::material::AlphaMode::Opaque),
            double_sided: false,
            pbr_metallic_roughness: pbr_json,
            normal_texture,
            occlusion_texture,
            emissive_texture: None,
            emissive_factor: gj::material::EmissiveFactor([0.0, 0.0, 0.0]),
            extensions: None,
            extras: Default::default(),
        });
        index
    }

    /// One image and texture per distinct file
    fn texture_info(
        &mut self,
        path: &Path,
        image_uris: &BTreeMap<PathBuf, String>,
    ) -> Option<gj::texture::Info> {
        let uri = image_uris.get(path)?;

        let existing = self
            .root
            .images
            .iter()
            .position(|image| image.uri.as_deref() == Some(uri.as_str()));
        let texture_index = match existing {
            Some(i) => i as u32,
            None => {
                let image_index = self.root.images.len() as u32;
                self.root.images.push(gj::Image {
                    buffer_view: None,
                    mime_type: None,
                    name: Some(uri.clone()),
                    uri: Some(uri.clone()),
                    extensions: None,
                    extras: Default::default(),
                });
                let texture_index = self.root.textures.len() as u32;
                self.root.textures.push(gj::Texture {
                    name: None,
                    sampler: None,
                    source: gj::Index::new(image_index),
                    extensions: None,
                    extras: Default::default(),
                });
                texture_index
            }
        };

        Some(gj::texture::Info {
            index: gj::Index::new(texture_index),
            tex_coord: 0,
            extensions: None,
            extras: Default::default(),
        })
    }

    fn build_mesh(&mut self, object: &MeshObject, material: Option<u32>) {
        let vertex_count = object.positions.len() as u32;
        let mut attributes = BTreeMap::new();

        let (min, max) = match object.bounds() {
            Some((min, max)) => (Some(json_vec3(min)), Some(json_vec3(max))),
            None => (None, None),
        };
        let view = self.push_buffer_view(
            &f32_bytes(object.positions.iter().flatten()),
            Some(gj::buffer::Target::ArrayBuffer),
        );
        let accessor = self.push_accessor(
            view,
            vertex_count,
            gj::accessor::ComponentType::F32,
            gj::accessor::Type::Vec3,
            min,
            max,
        );
        attributes.insert(
            gj::validation::Checked::Valid(gj::mesh::Semantic::Positions),
            gj::Index::new(accessor),
        );

        if !object.normals.is_empty() && object.normals.len() == object.positions.len() {
            let view = self.push_buffer_view(
                &f32_bytes(object.normals.iter().flatten()),
                Some(gj::buffer::Target::ArrayBuffer),
            );
            let accessor = self.push_accessor(
                view,
                vertex_count,
                gj::accessor::ComponentType::F32,
                gj::accessor::Type::Vec3,
                None,
                None,
            );
            attributes.insert(
                gj::validation::Checked::Valid(gj::mesh::Semantic::Normals),
                gj::Index::new(accessor),
            );
        }

        if !object.uvs.is_empty() && object.uvs.len() == object.positions.len() {
            let view = self.push_buffer_view(
                &f32_bytes(object.uvs.iter().flatten()),
                Some(gj::buffer::Target::ArrayBuffer),
            );
            let accessor = self.push_accessor(
                view,
                vertex_count,
                gj::accessor::ComponentType::F32,
                gj::accessor::Type::Vec2,
                None,
                None,
            );
            attributes.insert(
                gj::validation::Checked::Valid(gj::mesh::Semantic::TexCoords(0)),
                gj::Index::new(accessor),
            );
        }

        let index_bytes: Vec<u8> = object
            .indices
            .iter()
            .flat_map(|i| i.to_le_bytes())
            .collect();
        let view = self.push_buffer_view(&index_bytes, Some(gj::buffer::Target::ElementArrayBuffer));
        let indices = self.push_accessor(
            view,
            object.indices.len() as u32,
            gj::accessor::ComponentType::U32,
            gj::accessor::Type::Scalar,
            None,
            None,
        );

        let primitive = gj::mesh::Primitive {
            attributes,
            extensions: None,
            extras: Default::default(),
            indices: Some(gj::Index::new(indices)),
            material: material.map(gj::Index::new),
            mode: gj::validation::Checked::Valid(gj::mesh::Mode::Triangles),
            targets: None,
        };

        let mesh_index = self.root.meshes.len() as u32;
        self.root.meshes.push(gj::Mesh {
            name: Some(object.name.clone()),
            primitives: vec![primitive],
            weights: None,
            extensions: None,
            extras: Default::default(),
        });

        self.root.nodes.push(gj::Node {
            name: Some(object.name.clone()),
            camera: None,
            children: None,
            mesh: Some(gj::Index::new(mesh_index)),
            skin: None,
            translation: None,
            rotation: None,
            scale: None,
            matrix: None,
            weights: None,
            extensions: None,
            extras: Default::default(),
        });
    }

    fn align_buffer(&mut self) {
        while self.buffer_data.len() % 4 != 0 {
            self.buffer_data.push(0);
        }
    }

    fn push_buffer_view(&mut self, data: &[u8], target: Option<gj::buffer::Target>) -> u32 {
        self.align_buffer();
        let offset = self.buffer_data.len();
        self.buffer_data.extend_from_slice(data);
        let view_idx = self.root.buffer_views.len() as u32;
        self.root.buffer_views.push(gj::buffer::View {
            buffer: gj::Index::new(0),
            byte_offset: Some(gj::validation::USize64(offset as u64)),
            byte_length: gj::validation::USize64(data.len() as u64),
            byte_stride: None,
            target: target.map(gj::validation::Checked::Valid),
            name: None,
            extensions: None,
            extras: Default::default(),
        });
        view_idx
    }

    fn push_accessor(
        &mut self,
        buffer_view: u32,
        count: u32,
        component_type: gj::accessor::ComponentType,
        type_: gj::accessor::Type,
        min: Option<gj::Value>,
        max: Option<gj::Value>,
    ) -> u32 {
        let acc_idx = self.root.accessors.len() as u32;
        self.root.accessors.push(gj::Accessor {
            buffer_view: Some(gj::Index::new(buffer_view)),
            byte_offset: Some(gj::validation::USize64(0)),
            count: gj::validation::USize64(count as u64),
            component_type: gj::validation::Checked::Valid(gj::accessor::GenericComponentType(
                component_type,
            )),
            type_: gj::validation::Checked::Valid(type_),
            min,
            max,
            normalized: false,
            name: None,
            sparse: None,
            extensions: None,
            extras: Default::default(),
        });
        acc_idx
    }

    /// Add the buffer, when there is geometry, and a default scene holding
    /// every node
    fn finalize(&mut self, bin_uri: Option<&str>) {
        if let Some(uri) = bin_uri {
            self.align_buffer();
            self.root.buffers.push(gj::Buffer {
                byte_length: gj::validation::USize64(self.buffer_data.len() as u64),
                name: None,
                uri: Some(uri.to_string()),
                extensions: None,
                extras: Default::default(),
            });
        }

        let nodes = (0..self.root.nodes.len() as u32).map(gj::Index::new).collect();
        self.root.scenes.push(gj::Scene {
            name: None,
            nodes,
            extensions: None,
            extras: Default::default(),
        });
        self.root.scene = Some(gj::Index::new(0));
    }
}

fn encode_jpeg(source: &Path, dest: &Path, quality: u8) -> Result<()> {
    let image = image::open(source).map_err(|e| {
        KilnError::Export(format!("Cannot read texture '{}': {}", source.display(), e))
    })?;
    // JPEG has no alpha channel
    let rgb = image.to_rgb8();

    let file = File::create(dest).map_err(|e| write_error(dest, e))?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, quality)
        .encode_image(&rgb)
        .map_err(|e| KilnError::Export(format!("JPEG encoding of '{}' failed: {}", dest.display(), e)))?;
    writer.flush().map_err(|e| write_error(dest, e))?;
    log::debug!("Re-encoded {} as {}", source.display(), dest.display());
    Ok(())
}

/// `<source stem>.jpg`
fn jpeg_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "texture".to_string());
    format!("{}.jpg", stem)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn write_error(path: &Path, e: std::io::Error) -> KilnError {
    KilnError::Export(format!("Cannot write '{}': {}", path.display(), e))
}

fn f32_bytes<'a>(values: impl Iterator<Item = &'a f32>) -> Vec<u8> {
    values.flat_map(|v| v.to_le_bytes()).collect()
}

fn json_vec3(v: [f32; 3]) -> gj::Value {
    gj::Value::from(v.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_asset::{TextureCandidate, TextureRole, TextureSet};
    use kiln_core::MaterialHandle;
    use kiln_material::{FileImageLoader, MaterialSynthesizer, MetallicRoughness};

    fn quad(name: &str) -> MeshObject {
        let mut object = MeshObject::new(name);
        object.positions = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        object.normals = vec![[0.0, 0.0, 1.0]; 4];
        object.uvs = vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
        object.indices = vec![0, 1, 2, 0, 2, 3];
        object.polygon_count = 1;
        object
    }

    fn textured_graph(dir: &Path) -> MaterialGraph {
        let mut textures = TextureSet::new();
        for (file, role) in [
            ("brick_albedo.png", TextureRole::Albedo),
            ("brick_normal.png", TextureRole::Normal),
            ("brick_orm.png", TextureRole::Orm),
        ] {
            let path = dir.join(file);
            image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 120, 80, 255]))
                .save(&path)
                .unwrap();
            textures.insert(TextureCandidate::new(path, role));
        }

        MaterialSynthesizer::new(&FileImageLoader)
            .synthesize("brick", &textures, &MetallicRoughness::new().with_occlusion(true))
            .unwrap()
    }

    #[test]
    fn test_export_fully_wired_graph() {
        let dir = std::env::temp_dir().join(format!("kiln_gltf_export_test_{}", uuid::Uuid::new_v4()));
        let out_dir = dir.join("converted");
        std::fs::create_dir_all(&out_dir).unwrap();
        let graph = textured_graph(&dir);

        let mut objects = vec![quad("Wall"), quad("Floor")];
        for object in &mut objects {
            object.material_slots.push(MaterialHandle::new("brick"));
        }

        let output = out_dir.join("wall_converted.gltf");
        let written = GltfExporter::new(90).export(&objects, &graph, &output).unwrap();

        assert_eq!(written[0], output);
        assert_eq!(written[1], out_dir.join("wall_converted.bin"));
        for jpg in ["brick_albedo.jpg", "brick_normal.jpg", "brick_orm.jpg"] {
            assert!(written.contains(&out_dir.join(jpg)), "missing {}", jpg);
            assert!(out_dir.join(jpg).is_file());
        }

        // Loads buffers and decodes every image
        let (document, buffers, images) = gltf::import(&output).unwrap();
        assert_eq!(document.meshes().count(), 2);
        assert_eq!(images.len(), 3);
        assert!(!buffers.is_empty());

        let material = document.materials().next().unwrap();
        assert_eq!(material.name(), Some("brick"));
        let pbr = material.pbr_metallic_roughness();
        assert!(pbr.base_color_texture().is_some());
        assert!(pbr.metallic_roughness_texture().is_some());
        assert!(material.normal_texture().is_some());
        let occlusion = material.occlusion_texture().unwrap();
        assert_eq!(
            occlusion.texture().index(),
            pbr.metallic_roughness_texture().unwrap().texture().index()
        );

        for mesh in document.meshes() {
            let primitive = mesh.primitives().next().unwrap();
            assert_eq!(primitive.material().index(), Some(0));
            let reader = primitive.reader(|b| Some(&buffers[b.index()]));
            assert_eq!(reader.read_indices().unwrap().into_u32().count(), 6);
        }

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_export_untextured() {
        let dir = std::env::temp_dir().join(format!("kiln_gltf_export_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let graph = MaterialGraph::new("plain", kiln_material::BaseShader::default());

        let output = dir.join("plain_converted.gltf");
        let written = GltfExporter::new(90).export(&[quad("Tile")], &graph, &output).unwrap();
        assert_eq!(written.len(), 2);

        let (document, _, images) = gltf::import(&output).unwrap();
        assert!(images.is_empty());
        let primitive = document.meshes().next().unwrap().primitives().next().unwrap();
        // Unbound object carries no material reference
        assert_eq!(primitive.material().index(), None);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_texture_is_export_error() {
        let dir = std::env::temp_dir().join(format!("kiln_gltf_export_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let graph = textured_graph(&dir);
        std::fs::remove_file(dir.join("brick_albedo.png")).unwrap();

        let output = dir.join("out_converted.gltf");
        let result = GltfExporter::new(90).export(&[quad("Wall")], &graph, &output);
        assert!(matches!(result, Err(KilnError::Export(_))));
        assert!(!output.exists());
        assert!(!dir.join("out_converted.bin").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_objects_are_skipped() {
        let dir = std::env::temp_dir().join(format!("kiln_gltf_export_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let graph = MaterialGraph::new("plain", kiln_material::BaseShader::default());

        let output = dir.join("mixed_converted.gltf");
        let objects = vec![MeshObject::new("Empty"), quad("Tile")];
        GltfExporter::new(90).export(&objects, &graph, &output).unwrap();

        let (document, buffers, _) = gltf::import(&output).unwrap();
        assert_eq!(document.meshes().count(), 1);
        assert_eq!(document.nodes().next().unwrap().name(), Some("Tile"));
        for accessor in document.accessors() {
            assert!(accessor.count() > 0);
        }
        assert_eq!(buffers.len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_no_geometry_writes_no_buffer() {
        let dir = std::env::temp_dir().join(format!("kiln_gltf_export_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let graph = MaterialGraph::new("plain", kiln_material::BaseShader::default());

        let output = dir.join("empty_converted.gltf");
        let written = GltfExporter::new(90)
            .export(&[MeshObject::new("Empty")], &graph, &output)
            .unwrap();

        assert_eq!(written, vec![output.clone()]);
        assert!(!dir.join("empty_converted.bin").exists());
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert!(json.get("buffers").map_or(true, |b| b.as_array().unwrap().is_empty()));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_jpeg_name() {
        assert_eq!(jpeg_name(Path::new("/t/Rock_Normal.PNG")), "Rock_Normal.jpg");
    }
}
