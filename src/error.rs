//! Error types for mirror and archive operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while mirroring or archiving a tree.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// I/O error during local file operations.
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// Connection probe or session setup failed.
    #[error(
        "Unable to connect to {target}: {source}. Please ensure your configuration is correct and/or ssh is enabled on the host"
    )]
    Connection {
        target: String,
        #[source]
        source: io::Error,
    },

    /// Listing a remote directory failed.
    #[error("Failed to list remote directory '{path}': {source}")]
    Listing {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Downloading a single file failed; the whole mirror is aborted.
    #[error("Failed to download '{path}': {source}")]
    Transfer {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Archive requested but the local tree does not exist.
    #[error("There is nothing to be archived. '{}' tree doesn't exist", .0.display())]
    MissingSource(PathBuf),

    /// Configuration could not be resolved.
    #[error("Configuration error: {0}")]
    Config(String),
}
