//! Error types for the CLI

use std::path::PathBuf;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the input document failed
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The input or output YAML could not be (de)serialized
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON output could not be serialized
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The spec was rejected by the validation pass
    #[error(transparent)]
    Validation(#[from] clusterspec_common::Error),

    /// Validation errors were already reported to the user
    #[error("cluster spec rejected with {0} error(s)")]
    Rejected(usize),

    /// The document parsed but is not a cluster spec
    #[error("invalid cluster document: {0}")]
    InvalidDocument(String),
}

impl Error {
    /// Create an I/O error for `path`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid document error
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Error::InvalidDocument(message.into())
    }
}
