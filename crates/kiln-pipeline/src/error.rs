//! Errors raised by task bodies.

use std::path::PathBuf;

use kiln_server::ServerError;

use crate::lint::LintViolation;

/// Errors that can occur while running a pipeline task.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Source directory not found: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("Invalid glob '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to include into {}: {message}", .path.display())]
    Include { path: PathBuf, message: String },

    #[error("Markup lint found {} error(s)", .violations.len())]
    Lint { violations: Vec<LintViolation> },

    #[error("Failed to compile {}: {message}", .path.display())]
    Compile { path: PathBuf, message: String },

    #[error("Failed to minify {}: {message}", .path.display())]
    Minify { path: PathBuf, message: String },

    #[error("Failed to bundle {}: {message}", .path.display())]
    Bundle { path: PathBuf, message: String },

    #[error("Failed to optimize {}: {message}", .path.display())]
    Image { path: PathBuf, message: String },

    #[error(transparent)]
    Server(#[from] ServerError),
}

impl PipelineError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Write {
            path: path.into(),
            source,
        }
    }
}
