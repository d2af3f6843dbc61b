//! Error Types
//!
//! Library-level failures: reading files, parsing configuration and
//! producing wire bodies. Validation failures inside a workflow are
//! reported as [`TaskError`](crate::workflow::TaskError) data instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::marshalling::Format;

/// Errors raised by the library outside of workflow execution.
#[derive(Debug, Error)]
pub enum CafeError {
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("{model} does not support the {format} format")]
    UnsupportedFormat { model: &'static str, format: Format },
}

impl CafeError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, CafeError>;
