//! Error types for marker persistence

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the marker store.
///
/// Only write-side failures are represented: a claim that could not be
/// recorded must not be silently trusted. Read/parse failures and process
/// probe failures are absorbed locally and never reach the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// No platform application data directory could be resolved.
    #[error("no application data directory available on this platform")]
    NoDataDir,

    /// The marker's parent directory could not be created.
    #[error("failed to create marker directory {path:?}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The marker file could not be written.
    #[error("failed to write instance marker {path:?}")]
    WriteMarker {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The marker file could not be removed.
    #[error("failed to remove instance marker {path:?}")]
    RemoveMarker {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The instance record could not be encoded.
    #[error("failed to encode instance record")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
