//! Layered configuration system
//!
//! Config is loaded with three layers of precedence (highest wins):
//! 1. Environment variables: `KILN_TEXTURE_EXTENSIONS`, `KILN_JPEG_QUALITY`
//! 2. Project-local: `.kiln/config.toml`
//! 3. Global: `~/.kiln/config.toml`
//!
//! Command-line flags are applied on top by the binary.

use crate::discovery::{CollisionPolicy, TextureDiscovery};
use kiln_core::{ExportTarget, KilnError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Texture discovery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub on_collision: CollisionPolicy,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            on_collision: CollisionPolicy::default(),
        }
    }
}

impl DiscoveryConfig {
    /// Build the discovery pass described by this config
    pub fn discovery(&self) -> TextureDiscovery {
        TextureDiscovery::new(&self.extensions).with_policy(self.on_collision)
    }
}

/// Material synthesis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialConfig {
    #[serde(default = "default_material_name")]
    pub name: String,
    /// Route the ORM red channel into an occlusion input
    #[serde(default)]
    pub wire_occlusion: bool,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            name: default_material_name(),
            wire_occlusion: false,
        }
    }
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Subdirectory of the input directory that receives the output
    #[serde(default = "default_export_directory")]
    pub directory: String,
    /// Format used when none is given on the command line
    #[serde(default = "default_format")]
    pub default_format: String,
    /// JPEG quality for re-encoded glTF textures (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Write a `.asset.toml` sidecar next to the output
    #[serde(default)]
    pub sidecar: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: default_export_directory(),
            default_format: default_format(),
            jpeg_quality: default_jpeg_quality(),
            sidecar: false,
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["png".to_string()]
}
fn default_material_name() -> String {
    "kiln_material".to_string()
}
fn default_export_directory() -> String {
    "converted".to_string()
}
fn default_format() -> String {
    "obj".to_string()
}
fn default_jpeg_quality() -> u8 {
    90
}

/// One config file. Keys that are present override lower layers, even
/// when they hold the default value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct ConfigLayer {
    #[serde(default)]
    discovery: DiscoveryLayer,
    #[serde(default)]
    material: MaterialLayer,
    #[serde(default)]
    export: ExportLayer,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct DiscoveryLayer {
    extensions: Option<Vec<String>>,
    on_collision: Option<CollisionPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct MaterialLayer {
    name: Option<String>,
    wire_occlusion: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct ExportLayer {
    directory: Option<String>,
    default_format: Option<String>,
    jpeg_quality: Option<u8>,
    sidecar: Option<bool>,
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KilnConfig {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub material: MaterialConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl KilnConfig {
    /// Load config with layered precedence: global < project < env vars
    pub fn load() -> Result<Self> {
        let mut config = KilnConfig::default();

        // Layer 1: Global config (~/.kiln/config.toml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                config.merge(global);
            }
        }

        // Layer 2: Project-local config (.kiln/config.toml)
        let local_path = PathBuf::from(".kiln/config.toml");
        if local_path.exists() {
            let local = Self::load_file(&local_path)?;
            config.merge(local);
        }

        // Layer 3: Environment variable overrides
        config.apply_env_overrides()?;
        config.validate()?;

        log::debug!("Loaded config: {:?}", config);
        Ok(config)
    }

    /// Load config from a specific file path only, plus env overrides
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config = KilnConfig::default();
        config.merge(Self::load_file(path)?);
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".kiln").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<ConfigLayer> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            KilnError::Config(format!("Failed to parse config {}: {}", path.display(), e))
        })
    }

    /// Overlay every key the layer sets
    fn merge(&mut self, layer: ConfigLayer) {
        let ConfigLayer {
            discovery,
            material,
            export,
        } = layer;

        if let Some(extensions) = discovery.extensions {
            self.discovery.extensions = extensions;
        }
        if let Some(policy) = discovery.on_collision {
            self.discovery.on_collision = policy;
        }
        if let Some(name) = material.name {
            self.material.name = name;
        }
        if let Some(wire) = material.wire_occlusion {
            self.material.wire_occlusion = wire;
        }
        if let Some(directory) = export.directory {
            self.export.directory = directory;
        }
        if let Some(format) = export.default_format {
            self.export.default_format = format;
        }
        if let Some(quality) = export.jpeg_quality {
            self.export.jpeg_quality = quality;
        }
        if let Some(sidecar) = export.sidecar {
            self.export.sidecar = sidecar;
        }
    }

    /// Discovery pass for this config; the export directory is never walked
    pub fn texture_discovery(&self) -> TextureDiscovery {
        self.discovery
            .discovery()
            .with_excluded_dir(&self.export.directory)
    }

    /// The format used when none is requested explicitly
    pub fn default_target(&self) -> Result<ExportTarget> {
        self.export.default_format.parse()
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(list) = std::env::var("KILN_TEXTURE_EXTENSIONS") {
            let extensions: Vec<String> = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !extensions.is_empty() {
                self.discovery.extensions = extensions;
            }
        }
        if let Ok(quality) = std::env::var("KILN_JPEG_QUALITY") {
            self.export.jpeg_quality = quality.trim().parse().map_err(|_| {
                KilnError::Config(format!("KILN_JPEG_QUALITY must be 1-100, got '{}'", quality))
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.discovery.extensions.is_empty() {
            return Err(KilnError::Config(
                "discovery.extensions must list at least one extension".to_string(),
            ));
        }
        if !(1..=100).contains(&self.export.jpeg_quality) {
            return Err(KilnError::Config(format!(
                "export.jpeg_quality must be 1-100, got {}",
                self.export.jpeg_quality
            )));
        }
        if self.export.directory.trim().is_empty() {
            return Err(KilnError::Config(
                "export.directory must not be empty".to_string(),
            ));
        }
        self.default_target()?;
        Ok(())
    }
}
