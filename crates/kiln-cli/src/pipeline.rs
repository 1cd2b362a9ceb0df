//! One conversion: ingest, discover, synthesize, bind, export

use kiln_asset::{write_conversion_sidecar, ConversionMeta, KilnConfig, TextureSet, TextureSource};
use kiln_core::{ExportTarget, KilnError, MeshObject, Result};
use kiln_export::{discard, output_path, ExportOptions};
use kiln_import::MeshImporter;
use kiln_material::{bind, ImageLoader, MaterialSynthesizer, ShaderModel};
use std::path::{Path, PathBuf};

/// What to convert and into which format
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub input: PathBuf,
    /// Format name as given by the user, validated before any other work
    pub format: String,
}

impl ConversionRequest {
    pub fn new(input: impl Into<PathBuf>, format: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            format: format.into(),
        }
    }
}

/// Outcome of a successful conversion
#[derive(Debug)]
pub struct ConversionReport {
    pub target: ExportTarget,
    pub object_count: usize,
    pub polygon_count: usize,
    pub textures: TextureSet,
    /// Every file written, primary output first
    pub outputs: Vec<PathBuf>,
    pub sidecar: Option<PathBuf>,
}

/// Drives the conversion stages over injected collaborators
pub struct Pipeline<'a> {
    importer: &'a dyn MeshImporter,
    textures: &'a dyn TextureSource,
    loader: &'a dyn ImageLoader,
    shader: &'a dyn ShaderModel,
    material_name: String,
    export_dir: String,
    options: ExportOptions,
    sidecar: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        importer: &'a dyn MeshImporter,
        textures: &'a dyn TextureSource,
        loader: &'a dyn ImageLoader,
        shader: &'a dyn ShaderModel,
    ) -> Self {
        let defaults = KilnConfig::default();
        Self {
            importer,
            textures,
            loader,
            shader,
            material_name: defaults.material.name,
            export_dir: defaults.export.directory,
            options: ExportOptions::default(),
            sidecar: defaults.export.sidecar,
        }
    }

    /// Take material naming and export settings from `config`
    pub fn with_config(mut self, config: &KilnConfig) -> Self {
        self.material_name = config.material.name.clone();
        self.export_dir = config.export.directory.clone();
        self.options.jpeg_quality = config.export.jpeg_quality;
        self.sidecar = config.export.sidecar;
        self
    }

    pub fn run(&self, request: &ConversionRequest) -> Result<ConversionReport> {
        let target: ExportTarget = request.format.parse()?;
        let input = request.input.as_path();
        log::info!("Converting {} to {}", input.display(), target);

        let mut objects = self.importer.import_mesh(input)?;

        let input = resolve_input(input)?;
        let texture_root = input.parent().unwrap_or_else(|| Path::new("."));
        let textures = self.textures.discover(texture_root)?;
        if textures.is_empty() {
            log::warn!(
                "No texture maps found under {}; material keeps base shader defaults",
                texture_root.display()
            );
        }

        let graph = MaterialSynthesizer::new(self.loader).synthesize(
            &self.material_name,
            &textures,
            self.shader,
        )?;
        let bound = bind(&graph.handle(), &mut objects)?;
        log::debug!("Bound '{}' to {} object(s)", graph.name(), bound);

        if !target.capabilities().channel_routing {
            log::info!("{} keeps base color only; other texture maps are dropped", target);
        }

        let output = output_path(&input, target, &self.export_dir)?;
        let outputs = kiln_export::export(&objects, &graph, target, &output, &self.options)?;

        let polygon_count = objects.iter().map(|o| o.polygon_count).sum();

        let sidecar = if self.sidecar {
            match write_sidecar(&input, &output, target, &objects, &textures, &outputs) {
                Ok(path) => Some(path),
                Err(e) => {
                    discard(&outputs);
                    return Err(e);
                }
            }
        } else {
            None
        };

        Ok(ConversionReport {
            target,
            object_count: objects.len(),
            polygon_count,
            textures,
            outputs,
            sidecar,
        })
    }
}

/// The input file, with its directory made absolute so texture paths can
/// be expressed relative to the output
fn resolve_input(input: &Path) -> Result<PathBuf> {
    let file_name = input.file_name().ok_or_else(|| {
        KilnError::Ingestion(format!("'{}' does not name a file", input.display()))
    })?;
    let dir = match input.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let dir = std::fs::canonicalize(dir).map_err(|e| {
        KilnError::Discovery(format!("Failed to resolve {}: {}", dir.display(), e))
    })?;
    Ok(dir.join(file_name))
}

fn write_sidecar(
    input: &Path,
    output: &Path,
    target: ExportTarget,
    objects: &[MeshObject],
    textures: &TextureSet,
    outputs: &[PathBuf],
) -> Result<PathBuf> {
    let polygon_count = objects.iter().map(|o| o.polygon_count).sum();
    let mut meta = ConversionMeta::for_output(
        output,
        input,
        target.extension(),
        objects.len(),
        polygon_count,
    )?;
    for texture in textures.iter() {
        meta.textures.insert(
            texture.role().as_str().to_string(),
            texture.path().to_string_lossy().to_string(),
        );
    }
    meta.outputs = outputs
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect();
    let dir = output.parent().unwrap_or_else(|| Path::new("."));
    write_conversion_sidecar(&meta, dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_asset::{TextureDiscovery, TextureRole};
    use kiln_import::SceneImporter;
    use kiln_material::{FileImageLoader, MetallicRoughness};
    use std::cell::Cell;

    /// Fixed objects with the given source polygon counts
    struct StubImporter {
        polygons: Vec<usize>,
    }

    impl MeshImporter for StubImporter {
        fn import_mesh(&self, _path: &Path) -> Result<Vec<MeshObject>> {
            Ok(self
                .polygons
                .iter()
                .enumerate()
                .map(|(i, &count)| {
                    let mut object = MeshObject::new(format!("part_{}", i));
                    object.positions = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
                    object.indices = vec![0, 1, 2];
                    object.polygon_count = count;
                    object
                })
                .collect())
        }
    }

    /// Counts discovery passes before delegating
    struct CountingSource {
        inner: TextureDiscovery,
        calls: Cell<usize>,
    }

    impl TextureSource for CountingSource {
        fn discover(&self, root: &Path) -> Result<TextureSet> {
            self.calls.set(self.calls.get() + 1);
            self.inner.discover(root)
        }
    }

    fn counting_source() -> CountingSource {
        CountingSource {
            inner: TextureDiscovery::new(["png"]),
            calls: Cell::new(0),
        }
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kiln_pipeline_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::canonicalize(&dir).unwrap()
    }

    #[test]
    fn test_end_to_end_gltf() {
        let dir = temp_dir();
        image::RgbaImage::new(4, 4).save(dir.join("foo_albedo.png")).unwrap();
        image::RgbaImage::new(4, 4)
            .save_with_format(dir.join("bar_normal.PNG"), image::ImageFormat::Png)
            .unwrap();

        let importer = StubImporter {
            polygons: vec![100, 150],
        };
        let source = counting_source();
        let shader = MetallicRoughness::new();
        let pipeline = Pipeline::new(&importer, &source, &FileImageLoader, &shader);

        let report = pipeline
            .run(&ConversionRequest::new(dir.join("crate.obj"), "gltf"))
            .unwrap();

        assert_eq!(report.target, ExportTarget::Gltf);
        assert_eq!(report.object_count, 2);
        assert_eq!(report.polygon_count, 250);
        assert_eq!(source.calls.get(), 1);
        assert!(report.textures.albedo().is_some());
        assert_eq!(
            report.textures.normal().map(|t| t.file_name()),
            Some("bar_normal.PNG")
        );
        assert!(report.textures.orm().is_none());

        let expected = dir.join("converted").join("crate_converted.gltf");
        assert_eq!(report.outputs[0], expected);
        assert!(expected.is_file());
        assert!(dir.join("converted").join("foo_albedo.jpg").is_file());
        assert!(dir.join("converted").join("bar_normal.jpg").is_file());
        assert!(report.sidecar.is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unsupported_format_skips_discovery() {
        let dir = temp_dir();
        let importer = StubImporter {
            polygons: vec![10],
        };
        let source = counting_source();
        let shader = MetallicRoughness::new();
        let pipeline = Pipeline::new(&importer, &source, &FileImageLoader, &shader);

        let result = pipeline.run(&ConversionRequest::new(dir.join("crate.obj"), "fbx"));

        assert!(matches!(result, Err(KilnError::UnsupportedFormat { .. })));
        assert_eq!(source.calls.get(), 0);
        assert!(!dir.join("converted").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_format_is_case_insensitive() {
        let dir = temp_dir();
        let importer = StubImporter {
            polygons: vec![1],
        };
        let source = counting_source();
        let shader = MetallicRoughness::new();
        let pipeline = Pipeline::new(&importer, &source, &FileImageLoader, &shader);

        let report = pipeline
            .run(&ConversionRequest::new(dir.join("a.obj"), "OBJ"))
            .unwrap();
        assert_eq!(report.target, ExportTarget::Obj);
        assert!(dir.join("converted").join("a_converted.obj").is_file());
        assert!(dir.join("converted").join("a_converted.mtl").is_file());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_obj_file_with_config_and_sidecar() {
        let dir = temp_dir();
        std::fs::write(
            dir.join("gold.obj"),
            "o Bar\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
        )
        .unwrap();
        let tex_dir = dir.join("textures");
        std::fs::create_dir_all(&tex_dir).unwrap();
        image::RgbaImage::new(4, 4).save(tex_dir.join("gold_orm.png")).unwrap();

        let mut config = KilnConfig::default();
        config.material.name = "gold".to_string();
        config.export.directory = "out".to_string();
        config.export.sidecar = true;

        let importer = SceneImporter::new();
        let discovery = config.texture_discovery();
        let shader = MetallicRoughness::new();
        let pipeline =
            Pipeline::new(&importer, &discovery, &FileImageLoader, &shader).with_config(&config);

        let report = pipeline
            .run(&ConversionRequest::new(dir.join("gold.obj"), "obj"))
            .unwrap();
        assert_eq!(report.object_count, 1);
        assert_eq!(report.polygon_count, 1);
        assert_eq!(
            report.textures.get(TextureRole::Orm).map(|t| t.file_name()),
            Some("gold_orm.png")
        );

        let obj = std::fs::read_to_string(dir.join("out").join("gold_converted.obj")).unwrap();
        assert!(obj.contains("usemtl gold"));

        let sidecar = report.sidecar.unwrap();
        assert_eq!(sidecar, dir.join("out").join("gold_converted.asset.toml"));
        let text = std::fs::read_to_string(&sidecar).unwrap();
        assert!(text.contains("polygon_count = 1"));
        assert!(text.contains("gold_orm.png"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_ingestion_failure_writes_nothing() {
        let dir = temp_dir();
        let importer = SceneImporter::new();
        let source = counting_source();
        let shader = MetallicRoughness::new();
        let pipeline = Pipeline::new(&importer, &source, &FileImageLoader, &shader);

        let result = pipeline.run(&ConversionRequest::new(dir.join("missing.obj"), "obj"));
        assert!(matches!(result, Err(KilnError::Ingestion(_))));
        assert_eq!(source.calls.get(), 0);
        assert!(!dir.join("converted").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_relative_input_links_albedo_from_output_dir() {
        let dir = temp_dir();
        let assets = dir.join("assets");
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(assets.join("gold.obj"), "o Bar\nv 0 0 0\nv 1 0 0\nv 1 1 0\nf 1 2 3\n")
            .unwrap();
        image::RgbaImage::new(4, 4).save(assets.join("gold_albedo.png")).unwrap();

        let cwd = std::fs::canonicalize(std::env::current_dir().unwrap()).unwrap();
        let input = kiln_export::relative_to(&assets.join("gold.obj"), &cwd);
        assert!(input.is_relative());

        let importer = SceneImporter::new();
        let discovery = KilnConfig::default().texture_discovery();
        let shader = MetallicRoughness::new();
        let pipeline = Pipeline::new(&importer, &discovery, &FileImageLoader, &shader);

        let report = pipeline.run(&ConversionRequest::new(&input, "obj")).unwrap();
        assert!(report.textures.albedo().unwrap().path().is_absolute());

        let out_dir = assets.join("converted");
        let mtl = std::fs::read_to_string(out_dir.join("gold_converted.mtl")).unwrap();
        let map = mtl
            .lines()
            .find_map(|line| line.strip_prefix("map_Kd "))
            .unwrap();
        assert_eq!(map, "../gold_albedo.png");
        assert!(out_dir.join(map).is_file());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_sidecar_failure_removes_outputs() {
        let dir = temp_dir();
        // A directory where the sidecar file should go makes the write fail
        std::fs::create_dir_all(dir.join("converted").join("crate_converted.asset.toml")).unwrap();

        let importer = StubImporter {
            polygons: vec![4],
        };
        let source = counting_source();
        let shader = MetallicRoughness::new();
        let mut config = KilnConfig::default();
        config.export.sidecar = true;
        let pipeline =
            Pipeline::new(&importer, &source, &FileImageLoader, &shader).with_config(&config);

        let result = pipeline.run(&ConversionRequest::new(dir.join("crate.obj"), "obj"));
        assert!(result.is_err());
        assert!(!dir.join("converted").join("crate_converted.obj").exists());
        assert!(!dir.join("converted").join("crate_converted.mtl").exists());

        std::fs::remove_dir_all(&dir).ok();
    }
}
