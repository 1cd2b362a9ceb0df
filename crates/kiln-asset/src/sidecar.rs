//! `.asset.toml` sidecar describing a finished conversion

use kiln_core::{ContentHash, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Metadata recorded for a converted asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub hash: String,
    pub source_path: String,
    pub format: String,
    pub object_count: usize,
    pub polygon_count: usize,
    /// Texture path per role that fed the material
    #[serde(default)]
    pub textures: BTreeMap<String, String>,
    /// Every file the export wrote
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl ConversionMeta {
    /// Describe `primary_output`, hashing its current contents
    pub fn for_output(
        primary_output: &Path,
        source_path: &Path,
        format: &str,
        object_count: usize,
        polygon_count: usize,
    ) -> Result<Self> {
        let hash = ContentHash::from_file(primary_output)?;
        let name = primary_output
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string();

        Ok(Self {
            name,
            asset_type: "mesh".to_string(),
            hash: hash.to_prefixed_hex(),
            source_path: source_path.to_string_lossy().to_string(),
            format: format.to_string(),
            object_count,
            polygon_count,
            textures: BTreeMap::new(),
            outputs: vec![primary_output.to_string_lossy().to_string()],
        })
    }
}

/// Write `<name>.asset.toml` into `dir`, returning the sidecar path
pub fn write_conversion_sidecar(meta: &ConversionMeta, dir: &Path) -> Result<PathBuf> {
    #[derive(Serialize)]
    struct Sidecar<'a> {
        asset: &'a ConversionMeta,
    }

    std::fs::create_dir_all(dir)?;
    let sidecar_path = dir.join(format!("{}.asset.toml", meta.name));
    let toml_str = toml::to_string_pretty(&Sidecar { asset: meta })?;
    std::fs::write(&sidecar_path, toml_str)?;
    log::debug!("Wrote sidecar {}", sidecar_path.display());
    Ok(sidecar_path)
}
