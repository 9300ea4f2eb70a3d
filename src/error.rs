use std::path::PathBuf;

use thiserror::Error;

use crate::lite::format::FormatError;

/// Errors surfaced by training, model persistence, conversion and inference.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model file {}: {source}", path.display())]
    ModelParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported model file (format {format:?}, version {version})")]
    UnsupportedModel { format: String, version: u32 },

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("shape mismatch: expected {expected} values, found {found}")]
    Shape { expected: usize, found: usize },

    #[error("inference file error: {0}")]
    Format(#[from] FormatError),

    #[error("interpreter error: {0}")]
    Interpreter(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
