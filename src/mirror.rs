//! Depth-first remote-to-local mirroring.

use crate::download::percent_complete;
use crate::error::MirrorError;
use crate::filter::{is_eligible, should_descend};
use crate::remote::RemoteFs;
use crate::types::{join_remote, MirrorProgress, RemoteEntry, SyncContext};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A directory whose listing is being worked through.
struct Frame {
    remote_dir: String,
    local_dir: PathBuf,
    entries: std::vec::IntoIter<RemoteEntry>,
}

/// Mirrors `remote_dir` into `local_dir`.
///
/// Entries are visited depth-first in listing order, so `ctx.processed` and
/// the values passed to `on_progress` never go backwards. Hidden entries are
/// skipped. A cache directory is created locally but left empty.
///
/// # Arguments
///
/// * `remote` - Open remote session, shared by the whole walk
/// * `remote_dir` - Remote directory to mirror
/// * `local_dir` - Local destination, created if missing
/// * `ctx` - Operation state; `total_eligible` should already be set
/// * `on_progress` - Called on every transferred chunk of every file
///
/// # Returns
///
/// `Ok(())` once the whole tree is mirrored. The first listing or download
/// failure aborts the walk.
pub fn mirror<R: RemoteFs + ?Sized>(
    remote: &mut R,
    remote_dir: &str,
    local_dir: &Path,
    ctx: &mut SyncContext,
    on_progress: &mut dyn FnMut(&MirrorProgress<'_>),
) -> Result<(), MirrorError> {
    let root = open_dir(remote, remote_dir.to_string(), local_dir.to_path_buf())?;
    let mut stack = vec![root];

    while let Some(frame) = stack.last_mut() {
        let Some(entry) = frame.entries.next() else {
            stack.pop();
            continue;
        };
        if !is_eligible(&entry) {
            continue;
        }

        let remote_path = join_remote(&frame.remote_dir, &entry.name);
        let local_path = frame.local_dir.join(&entry.name);
        ctx.processed += 1;

        if should_descend(&entry) {
            stack.push(open_dir(remote, remote_path, local_path)?);
        } else if entry.is_dir {
            debug!("Not descending into cache directory {}", remote_path);
            std::fs::create_dir_all(&local_path)?;
        } else {
            download_entry(remote, &remote_path, &local_path, ctx, on_progress)?;
        }
    }

    Ok(())
}

fn open_dir<R: RemoteFs + ?Sized>(
    remote: &mut R,
    remote_dir: String,
    local_dir: PathBuf,
) -> Result<Frame, MirrorError> {
    // create_dir_all already treats an existing directory as success
    std::fs::create_dir_all(&local_dir)?;

    let entries = remote
        .list_entries(&remote_dir)
        .map_err(|source| MirrorError::Listing {
            path: remote_dir.clone(),
            source,
        })?;

    Ok(Frame {
        remote_dir,
        local_dir,
        entries: entries.into_iter(),
    })
}

fn download_entry<R: RemoteFs + ?Sized>(
    remote: &mut R,
    remote_path: &str,
    local_path: &Path,
    ctx: &SyncContext,
    on_progress: &mut dyn FnMut(&MirrorProgress<'_>),
) -> Result<(), MirrorError> {
    debug!("Downloading {} -> {}", remote_path, local_path.display());

    let (processed, total) = (ctx.processed, ctx.total_eligible);
    let mut on_chunk = |transferred: u64, size: u64| {
        on_progress(&MirrorProgress {
            processed,
            total,
            remote_path,
            percent: percent_complete(transferred, size),
        });
    };

    remote
        .fetch_file(remote_path, local_path, &mut on_chunk)
        .map_err(|source| MirrorError::Transfer {
            path: remote_path.to_string(),
            source,
        })
}
