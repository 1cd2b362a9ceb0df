//! Output location convention

use kiln_core::{ExportTarget, KilnError, Result};
use std::path::{Component, Path, PathBuf};

/// `<input dir>/<directory>/<input stem>_converted.<ext>`
pub fn output_path(input: &Path, target: ExportTarget, directory: &str) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            KilnError::Export(format!("Cannot derive an output name from '{}'", input.display()))
        })?;

    let parent = match input.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    Ok(parent
        .join(directory)
        .join(format!("{}_converted.{}", stem, target.extension())))
}

/// Create the directory that will hold `output`
pub fn prepare_output_dir(output: &Path) -> Result<()> {
    let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    std::fs::create_dir_all(dir).map_err(|e| {
        KilnError::Export(format!(
            "Cannot create output directory '{}': {}",
            dir.display(),
            e
        ))
    })
}

/// Remove whatever a failed export managed to write
pub fn discard(paths: &[PathBuf]) {
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => log::debug!("Removed partial output {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove partial output {}: {}", path.display(), e),
        }
    }
}

/// Express `path` relative to `base` when both are absolute; otherwise
/// return `path` unchanged
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    if !path.is_absolute() || !base.is_absolute() {
        return path.to_path_buf();
    }

    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();

    // Different roots (e.g. drive letters) have no relative form
    if path_parts.first() != base_parts.first() {
        return path.to_path_buf();
    }

    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part.as_os_str());
    }
    relative
}
