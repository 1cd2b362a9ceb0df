//! Zip bundles: a mesh and its texture maps delivered as one archive

use kiln_core::{KilnError, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Directory a bundle is unpacked into: `<archive dir>/<archive stem>/`
pub fn extract_dir(archive: &Path) -> Result<PathBuf> {
    let stem = archive
        .file_stem()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            KilnError::Ingestion(format!("'{}' does not name a bundle", archive.display()))
        })?;
    Ok(parent_dir(archive).join(stem))
}

/// `<archive dir>/<archive stem>_converted.zip`
pub fn package_path(archive: &Path) -> Result<PathBuf> {
    let dir = extract_dir(archive)?;
    let mut name = dir.file_name().unwrap_or_default().to_os_string();
    name.push("_converted.zip");
    Ok(dir.with_file_name(name))
}

/// Unpack `archive` into `dest` and return the mesh at the bundle root.
///
/// Existing files in `dest` are overwritten. Exactly one `.obj` must sit
/// directly in `dest`; meshes in subdirectories are not considered.
pub fn extract_bundle(archive: &Path, dest: &Path) -> Result<PathBuf> {
    let file = File::open(archive).map_err(|e| {
        KilnError::Ingestion(format!("Cannot open bundle {}: {}", archive.display(), e))
    })?;
    let mut zip = ZipArchive::new(file).map_err(|e| {
        KilnError::Ingestion(format!("{} is not a zip archive: {}", archive.display(), e))
    })?;

    fs::create_dir_all(dest).map_err(|e| {
        KilnError::Ingestion(format!("Cannot create {}: {}", dest.display(), e))
    })?;
    zip.extract(dest).map_err(|e| {
        KilnError::Ingestion(format!("Failed to extract {}: {}", archive.display(), e))
    })?;
    log::info!(
        "Extracted {} entr{} from {} into {}",
        zip.len(),
        if zip.len() == 1 { "y" } else { "ies" },
        archive.display(),
        dest.display()
    );

    root_mesh(dest)
}

fn root_mesh(dir: &Path) -> Result<PathBuf> {
    let entries = fs::read_dir(dir).map_err(|e| {
        KilnError::Ingestion(format!("Cannot read {}: {}", dir.display(), e))
    })?;

    let mut meshes = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| KilnError::Ingestion(format!("Cannot read {}: {}", dir.display(), e)))?
            .path();
        let is_obj = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("obj"));
        if is_obj && path.is_file() {
            meshes.push(path);
        }
    }
    meshes.sort();

    match meshes.len() {
        1 => Ok(meshes.remove(0)),
        0 => Err(KilnError::Ingestion(format!(
            "No .obj file at the root of {}",
            dir.display()
        ))),
        n => Err(KilnError::Ingestion(format!(
            "{} .obj files at the root of {}; a bundle must hold exactly one",
            n,
            dir.display()
        ))),
    }
}

/// Write `files` into a new zip at `archive`, each under its file name.
///
/// A partially written archive is removed on failure.
pub fn package_outputs(files: &[PathBuf], archive: &Path) -> Result<PathBuf> {
    match write_archive(files, archive) {
        Ok(()) => {
            log::info!("Packaged {} file(s) into {}", files.len(), archive.display());
            Ok(archive.to_path_buf())
        }
        Err(e) => {
            kiln_export::discard(&[archive.to_path_buf()]);
            Err(e)
        }
    }
}

fn write_archive(files: &[PathBuf], archive: &Path) -> Result<()> {
    let file = File::create(archive).map_err(|e| package_error(archive, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                KilnError::Export(format!("'{}' has no file name to package", path.display()))
            })?;
        let data = fs::read(path).map_err(|e| package_error(path, e))?;
        zip.start_file(name, options)
            .map_err(|e| package_error(archive, e))?;
        zip.write_all(&data).map_err(|e| package_error(archive, e))?;
    }

    let mut writer = zip.finish().map_err(|e| package_error(archive, e))?;
    writer.flush().map_err(|e| package_error(archive, e))?;
    Ok(())
}

fn package_error(path: &Path, e: impl std::fmt::Display) -> KilnError {
    KilnError::Export(format!("Packaging failed at {}: {}", path.display(), e))
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}
