//! Error types for configuration and preset operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from configuration I/O and preset operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the (comment-stripped) config JSON.
    #[error("failed to parse config '{path}': {source}")]
    ParseJson {
        /// Path of the malformed file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to create the config directory.
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize the config.
    #[error("failed to serialize config: {0}")]
    Marshal(#[source] serde_json::Error),

    /// Failed to write the config file.
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Named preset does not exist.
    #[error("preset not found: {0}")]
    PresetNotFound(String),

    /// A preset with that name already exists.
    #[error("preset already exists: {0}")]
    PresetExists(String),

    /// Reorder indices fall outside the preset's chain.
    #[error("invalid index {from} -> {to} for chain of length {len}")]
    PresetInvalidIndex {
        /// Source index of the move.
        from: usize,
        /// Destination index of the move.
        to: usize,
        /// Length of the chain the indices were checked against.
        len: usize,
    },
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }
}
