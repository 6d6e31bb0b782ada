//! Error types for effect loading.

use std::path::PathBuf;
use thiserror::Error;

use crate::dsl::DslError;

/// Errors from walking the effects directory or loading effect files.
///
/// Per-file read and parse failures are recoverable — the loader logs and
/// skips them. A duplicate display name aborts the whole load, leaving any
/// previously active registry intact.
#[derive(Debug, Error)]
pub enum EffectError {
    /// Failed to walk the effects directory.
    #[error("failed to walk effects directory '{path}': {source}")]
    WalkDir {
        /// Directory being scanned.
        path: PathBuf,
        /// Underlying walk error.
        #[source]
        source: walkdir::Error,
    },

    /// Failed to read an effect file.
    #[error("failed to read effect file '{path}': {source}")]
    ReadFile {
        /// Path of the unreadable file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse an effect file.
    #[error("failed to parse effect file '{path}': {source}")]
    Parse {
        /// Path of the malformed file.
        path: PathBuf,
        /// Parse diagnostic.
        #[source]
        source: DslError,
    },

    /// Two effect files share a display name.
    #[error("duplicate effect name: {0}")]
    DuplicateName(String),
}
