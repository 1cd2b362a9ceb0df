//! Texture role definitions

use std::fmt;
use std::path::{Path, PathBuf};

/// What a texture map feeds in a PBR material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRole {
    Albedo,
    Normal,
    /// Packed occlusion (R), roughness (G), metallic (B)
    Orm,
    Unclassified,
}

impl TextureRole {
    /// Roles that occupy a slot in a [`TextureSet`]
    pub const SLOTTED: [TextureRole; 3] = [TextureRole::Albedo, TextureRole::Normal, TextureRole::Orm];

    pub fn as_str(&self) -> &'static str {
        match self {
            TextureRole::Albedo => "albedo",
            TextureRole::Normal => "normal",
            TextureRole::Orm => "orm",
            TextureRole::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for TextureRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified texture file found during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureCandidate {
    path: PathBuf,
    file_name: String,
    role: TextureRole,
}

impl TextureCandidate {
    pub fn new(path: impl Into<PathBuf>, role: TextureRole) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            path,
            file_name,
            role,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn role(&self) -> TextureRole {
        self.role
    }
}

/// At most one texture per slotted role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureSet {
    albedo: Option<TextureCandidate>,
    normal: Option<TextureCandidate>,
    orm: Option<TextureCandidate>,
}

impl TextureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a candidate in its role's slot, returning the one it replaced.
    ///
    /// Unclassified candidates are discarded.
    pub fn insert(&mut self, candidate: TextureCandidate) -> Option<TextureCandidate> {
        match self.slot_mut(candidate.role) {
            Some(slot) => slot.replace(candidate),
            None => None,
        }
    }

    pub fn get(&self, role: TextureRole) -> Option<&TextureCandidate> {
        match role {
            TextureRole::Albedo => self.albedo.as_ref(),
            TextureRole::Normal => self.normal.as_ref(),
            TextureRole::Orm => self.orm.as_ref(),
            TextureRole::Unclassified => None,
        }
    }

    pub fn albedo(&self) -> Option<&TextureCandidate> {
        self.albedo.as_ref()
    }

    pub fn normal(&self) -> Option<&TextureCandidate> {
        self.normal.as_ref()
    }

    pub fn orm(&self) -> Option<&TextureCandidate> {
        self.orm.as_ref()
    }

    /// Filled slots in albedo, normal, orm order
    pub fn iter(&self) -> impl Iterator<Item = &TextureCandidate> {
        [&self.albedo, &self.normal, &self.orm]
            .into_iter()
            .filter_map(|slot| slot.as_ref())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot_mut(&mut self, role: TextureRole) -> Option<&mut Option<TextureCandidate>> {
        match role {
            TextureRole::Albedo => Some(&mut self.albedo),
            TextureRole::Normal => Some(&mut self.normal),
            TextureRole::Orm => Some(&mut self.orm),
            TextureRole::Unclassified => None,
        }
    }
}
