//! Data structures shared by the mirror and archive passes.

use std::path::{Path, PathBuf};

/// Remote directory used when the configuration does not name one.
pub const DEFAULT_REMOTE_ROOT: &str = "/home/pi";

/// Local namespace directory that holds mirrored trees, and the archive label
/// used when no configuration section was supplied.
pub const LOCAL_NAMESPACE: &str = "rpi";

/// A single entry from a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Final path segment of the entry.
    pub name: String,
    pub is_dir: bool,
    /// Size in bytes (0 when the server does not report one).
    pub size: u64,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            size,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            size: 0,
        }
    }
}

/// Parameters needed to open an authenticated session.
#[derive(Clone)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl ConnectionParams {
    /// `host:port`, used in logs and error messages.
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// State for one mirror operation.
///
/// `total_eligible` is set once by the tree counter before mirroring begins;
/// `processed` is advanced only by the mirror engine.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub remote_root: String,
    pub local_root: PathBuf,
    pub total_eligible: u64,
    pub processed: u64,
}

impl SyncContext {
    pub fn new(remote_root: impl Into<String>, local_root: impl Into<PathBuf>) -> Self {
        Self {
            remote_root: remote_root.into(),
            local_root: local_root.into(),
            total_eligible: 0,
            processed: 0,
        }
    }
}

/// Progress of a single file download, reported on every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorProgress<'a> {
    /// Eligible entries processed so far across the whole tree.
    pub processed: u64,
    /// Eligible entries in the whole tree.
    pub total: u64,
    pub remote_path: &'a str,
    /// Percentage of the current file transferred, 0..=100.
    pub percent: u8,
}

/// Description of one archive run.
#[derive(Debug, Clone)]
pub struct ArchiveJob {
    pub source_tree: PathBuf,
    pub destination_archive: PathBuf,
    /// Date part of the archive name (`DD-MM`).
    pub timestamp_label: String,
}

/// Progress of the archive pass, reported once per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveProgress<'a> {
    /// 1-based position of the file being written.
    pub index: u64,
    pub total: u64,
    pub entry_name: &'a str,
}

/// Stage control for a backup run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStage {
    /// Mirror the remote tree, then archive it
    All,
    /// Only mirror the remote tree
    MirrorOnly,
    /// Only archive an existing local mirror
    ArchiveOnly,
}

/// Derives the local mirror root for `remote_root`.
///
/// The last segment of the remote path keeps trees mirrored from different
/// remote roots apart: `/home/pi` lands in `<workdir>/rpi/pi`.
pub fn local_root_for(workdir: &Path, remote_root: &str) -> PathBuf {
    let normalized = remote_root.replace('\\', "/");
    let segment = normalized
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("root");
    workdir.join(LOCAL_NAMESPACE).join(segment)
}

/// Joins a remote directory and an entry name with forward slashes.
pub fn join_remote(dir: &str, name: &str) -> String {
    let joined = format!("{}/{}", dir.trim_end_matches(&['/', '\\'][..]), name);
    joined.replace('\\', "/")
}
