//! Error types for dtlink operations.
//!
//! Malformed documents never surface here: they produce diagnostics on the
//! [`Runtime`](crate::runtime::Runtime). [`DtLinkError`] covers the cases
//! where a resolution pass cannot run at all.

use std::{io, path::PathBuf};

use thiserror::Error;

/// The main error type for dtlink operations.
#[derive(Debug, Error)]
pub enum DtLinkError {
    /// I/O failure outside the source files, such as reading a
    /// configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A file the context needs could not be read.
    #[error("source file `{}` is not available: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DtLinkError {
    /// Create a `SourceUnavailable` error for `path`.
    pub fn source_unavailable(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            source,
        }
    }
}
