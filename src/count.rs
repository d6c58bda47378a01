//! Read-only pass that sizes the mirror progress.

use crate::error::MirrorError;
use crate::filter::{is_eligible, should_descend};
use crate::remote::RemoteFs;
use crate::types::join_remote;
use tracing::debug;

/// Counts the eligible entries below `remote_dir`.
///
/// Hidden entries are skipped with everything beneath them. Every other
/// entry counts once; directories other than the cache directory are walked
/// as well. The total does not depend on listing order.
///
/// # Returns
///
/// The number of eligible entries, or a [`MirrorError::Listing`] for the
/// first directory that could not be listed.
pub fn count_eligible<R: RemoteFs + ?Sized>(
    remote: &mut R,
    remote_dir: &str,
) -> Result<u64, MirrorError> {
    let mut total = 0u64;
    let mut pending = vec![remote_dir.to_string()];

    while let Some(dir) = pending.pop() {
        let entries = remote
            .list_entries(&dir)
            .map_err(|source| MirrorError::Listing {
                path: dir.clone(),
                source,
            })?;

        for entry in entries.iter().filter(|e| is_eligible(e)) {
            total += 1;
            if should_descend(entry) {
                pending.push(join_remote(&dir, &entry.name));
            }
        }
    }

    debug!("{} eligible entries under {}", total, remote_dir);
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::testing::MemoryRemote;

    #[test]
    fn test_counts_files_and_directories() {
        let mut remote = MemoryRemote::new("/home/pi")
            .with_file("/home/pi/a.txt", &[0; 100])
            .with_dir("/home/pi/sub")
            .with_file("/home/pi/sub/b.txt", &[0; 50])
            .with_dir("/home/pi/.skip")
            .with_file("/home/pi/.skip/x.txt", b"x");

        assert_eq!(count_eligible(&mut remote, "/home/pi").unwrap(), 3);
        assert!(!remote
            .listed
            .borrow()
            .contains(&"/home/pi/.skip".to_string()));
    }

    #[test]
    fn test_cache_dir_counted_but_not_listed() {
        let mut remote = MemoryRemote::new("/app")
            .with_dir("/app/__pycache__")
            .with_file("/app/__pycache__/mod.pyc", b"pyc")
            .with_file("/app/mod.py", b"print()");

        assert_eq!(count_eligible(&mut remote, "/app").unwrap(), 2);
        assert_eq!(*remote.listed.borrow(), vec!["/app".to_string()]);
    }

    #[test]
    fn test_count_independent_of_listing_order() {
        let mut forward = MemoryRemote::new("/r")
            .with_dir("/r/x")
            .with_file("/r/x/1", b"1")
            .with_file("/r/y", b"2")
            .with_file("/r/.z", b"3");
        let mut reversed = MemoryRemote::new("/r")
            .with_file("/r/.z", b"3")
            .with_file("/r/y", b"2")
            .with_file("/r/x/1", b"1")
            .with_dir("/r/x");

        assert_eq!(
            count_eligible(&mut forward, "/r").unwrap(),
            count_eligible(&mut reversed, "/r").unwrap()
        );
    }

    #[test]
    fn test_empty_tree_counts_zero() {
        let mut remote = MemoryRemote::new("/empty");
        assert_eq!(count_eligible(&mut remote, "/empty").unwrap(), 0);
    }

    #[test]
    fn test_listing_failure_aborts_count() {
        let mut remote = MemoryRemote::new("/r")
            .with_dir("/r/locked")
            .with_file("/r/locked/secret", b"s")
            .failing_list("/r/locked");

        match count_eligible(&mut remote, "/r") {
            Err(MirrorError::Listing { path, .. }) => assert_eq!(path, "/r/locked"),
            other => panic!("expected listing error, got {:?}", other),
        }
    }
}
