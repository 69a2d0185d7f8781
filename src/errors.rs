//! Typed error hierarchy for regen.
//!
//! Two enums cover the two places where failures are reported rather than
//! folded into a step outcome:
//! - `RegenError`: configuration and tree discovery failures, raised before
//!   any step runs
//! - `CheckpointError`: checkpoint file I/O

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a run before the traversal starts.
#[derive(Debug, Error)]
pub enum RegenError {
    #[error("SDK directory not found at {path}")]
    SdkDirMissing { path: PathBuf },

    #[error("Failed to list directory {path}: {source}")]
    ListDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown step '{name}'. Configured steps: {known}")]
    UnknownStep { name: String, known: String },

    #[error("Pipeline has no steps configured")]
    EmptyPipeline,

    #[error("Duplicate step name '{0}' in pipeline")]
    DuplicateStep(String),

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),
}

/// Errors from reading or writing the checkpoint file.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Failed to read checkpoint file at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write checkpoint file at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove checkpoint file at {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
