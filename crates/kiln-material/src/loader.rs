//! Image loading for texture sample nodes

use kiln_core::{KilnError, Result};
use std::path::{Path, PathBuf};

/// A texture file that has been opened and probed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    path: PathBuf,
    width: u32,
    height: u32,
}

impl ImageHandle {
    pub fn new(path: PathBuf, width: u32, height: u32) -> Self {
        Self {
            path,
            width,
            height,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Loads images referenced by sample nodes
pub trait ImageLoader {
    fn load_image(&self, path: &Path) -> Result<ImageHandle>;
}

/// Reads the image header from disk; pixels are decoded later, at export.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageLoader;

impl ImageLoader for FileImageLoader {
    fn load_image(&self, path: &Path) -> Result<ImageHandle> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            KilnError::GraphSynthesis(format!("Failed to load image {}: {}", path.display(), e))
        })?;
        log::debug!("Loaded image {} ({}x{})", path.display(), width, height);
        Ok(ImageHandle::new(path.to_path_buf(), width, height))
    }
}
