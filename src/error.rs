//! Error types shared by the emitter and the build validator.

use std::path::PathBuf;

/// Failures while writing native-image metadata.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// Output directory or an artifact could not be created or written.
    #[error("failed to write {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An artifact could not be rendered as JSON.
    #[error("failed to render {artifact}: {source}")]
    Render {
        artifact: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures while loading an externally supplied inventory.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("failed to read inventory at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse inventory at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A class, pattern, or resource entry was blank.
    #[error("inventory list `{list}` contains an empty entry at index {index}")]
    EmptyName { list: &'static str, index: usize },
}

/// Fatal validator conditions raised before any build step runs.
#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    #[error("project marker {} not found; run from the project root", path.display())]
    Precondition { path: PathBuf },
}
