//! Error types for Kiln

use thiserror::Error;

/// The main error type for Kiln operations
#[derive(Debug, Error)]
pub enum KilnError {
    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("Ambiguous {role} texture: {first} and {second} both match")]
    AmbiguousTexture {
        role: String,
        first: String,
        second: String,
    },

    #[error("Graph synthesis error: {0}")]
    GraphSynthesis(String),

    #[error("Unsupported output format '{format}' (supported: {})", supported.join(", "))]
    UnsupportedFormat {
        format: String,
        supported: Vec<String>,
    },

    #[error("Export error: {0}")]
    Export(String),

    #[error("Import error: {0}")]
    Ingestion(String),

    #[error("Invalid material handle: {0}")]
    InvalidMaterialHandle(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),
}

/// Result type alias for Kiln operations
pub type Result<T> = std::result::Result<T, KilnError>;

impl From<toml::de::Error> for KilnError {
    fn from(err: toml::de::Error) -> Self {
        KilnError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for KilnError {
    fn from(err: toml::ser::Error) -> Self {
        KilnError::TomlSerError(err.to_string())
    }
}
