//! Error types for the front end.

use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::Stage;

/// Failures that stop a compilation or prevent it from starting.
///
/// Recoverable problems in the source text are never reported here; they are
/// recorded in [`crate::Diagnostics`] instead.
#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("fatal {stage} error at {file}:{line}:{column}: {message}")]
    Fatal {
        stage: Stage,
        file: String,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type FrontendResult<T> = Result<T, FrontendError>;
