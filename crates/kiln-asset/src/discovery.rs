//! Texture discovery by filename heuristics

use crate::types::{TextureCandidate, TextureRole, TextureSet};
use kiln_core::{KilnError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Substrings that identify a role, checked in priority order.
///
/// `normal` must be tested before `orm` since every "normal" filename also
/// contains "orm".
const ROLE_PATTERNS: [(&str, TextureRole); 3] = [
    ("albedo", TextureRole::Albedo),
    ("normal", TextureRole::Normal),
    ("orm", TextureRole::Orm),
];

/// What to do when two files classify into the same role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// The file visited last replaces the earlier one
    #[default]
    LastWins,
    /// Fail with `AmbiguousTexture`
    Error,
}

/// Anything that can produce a [`TextureSet`] for a directory
pub trait TextureSource {
    fn discover(&self, root: &Path) -> Result<TextureSet>;
}

/// Classify a filename by case-insensitive substring match
pub fn classify(file_name: &str) -> TextureRole {
    let lower = file_name.to_lowercase();
    ROLE_PATTERNS
        .iter()
        .find(|(pattern, _)| lower.contains(pattern))
        .map(|(_, role)| *role)
        .unwrap_or(TextureRole::Unclassified)
}

/// Walks a directory tree and classifies image files by name.
///
/// Entries are visited in file-name order within each directory, so the
/// "last one wins" rule picks the same file on every platform. Symlinked
/// directories are not followed. Candidate paths are absolute.
#[derive(Debug, Clone)]
pub struct TextureDiscovery {
    extensions: Vec<String>,
    policy: CollisionPolicy,
    /// Directories under the root that are never walked
    excluded: Vec<PathBuf>,
}

impl Default for TextureDiscovery {
    fn default() -> Self {
        Self::new(["png"])
    }
}

impl TextureDiscovery {
    /// Create a discovery pass accepting the given extensions (without dots)
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
            policy: CollisionPolicy::LastWins,
            excluded: Vec::new(),
        }
    }

    /// Skip `dir` (relative to the discovery root), e.g. the export directory
    pub fn with_excluded_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded.push(dir.into());
        self
    }

    pub fn with_policy(mut self, policy: CollisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_lowercase();
                self.extensions.iter().any(|accepted| *accepted == e)
            })
            .unwrap_or(false)
    }

    fn scan_directory(&self, set: &mut TextureSet, dir: &Path, skip: &[PathBuf]) -> Result<()> {
        let mut entries = fs::read_dir(dir)
            .map_err(|e| {
                KilnError::Discovery(format!("Failed to read {}: {}", dir.display(), e))
            })?
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| {
                KilnError::Discovery(format!("Failed to list {}: {}", dir.display(), e))
            })?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| {
                KilnError::Discovery(format!("Failed to inspect {}: {}", path.display(), e))
            })?;

            if file_type.is_dir() {
                if skip.contains(&path) {
                    log::debug!("Skipping excluded directory {}", path.display());
                } else {
                    self.scan_directory(set, &path, skip)?;
                }
                continue;
            }
            if file_type.is_symlink() && path.is_dir() {
                log::debug!("Not following directory link {}", path.display());
                continue;
            }
            if !path.is_file() || !self.accepts(&path) {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().to_string();
            let role = classify(&file_name);
            if role == TextureRole::Unclassified {
                log::debug!("Skipping unclassified image {}", path.display());
                continue;
            }

            log::debug!("Found {} texture {}", role, path.display());
            let candidate = TextureCandidate::new(path, role);
            if let Some(previous) = set.get(role) {
                if self.policy == CollisionPolicy::Error {
                    return Err(KilnError::AmbiguousTexture {
                        role: role.to_string(),
                        first: previous.path().display().to_string(),
                        second: candidate.path().display().to_string(),
                    });
                }
                log::warn!(
                    "Multiple {} textures; {} replaces {}",
                    role,
                    candidate.file_name(),
                    previous.file_name()
                );
            }
            set.insert(candidate);
        }

        Ok(())
    }
}

impl TextureSource for TextureDiscovery {
    fn discover(&self, root: &Path) -> Result<TextureSet> {
        if !root.is_dir() {
            return Err(KilnError::Discovery(format!(
                "Texture directory not found: {}",
                root.display()
            )));
        }
        let root = fs::canonicalize(root).map_err(|e| {
            KilnError::Discovery(format!("Failed to resolve {}: {}", root.display(), e))
        })?;
        let skip: Vec<PathBuf> = self.excluded.iter().map(|dir| root.join(dir)).collect();

        let mut set = TextureSet::new();
        self.scan_directory(&mut set, &root, &skip)?;
        log::info!(
            "Discovered {} texture(s) under {}",
            set.len(),
            root.display()
        );
        Ok(set)
    }
}
