use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the filesystem-facing parts of the linker.
///
/// Matching never fails; only discovery walks, scoped lookups, deletes and
/// moves can return one of these.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Unable to find {kind} at {path}")]
    NotFound { kind: &'static str, path: PathBuf },

    #[error("{path} is neither a raw file nor a sidecar")]
    Unsupported { path: PathBuf },

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Entity is no longer part of the graph")]
    UnknownEntity,
}

impl LinkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LinkError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
