//! Packing a mirrored tree into a dated `.tar.gz` archive.

use crate::error::MirrorError;
use crate::types::{ArchiveJob, ArchiveProgress};
use chrono::{Datelike, Local, NaiveDate};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Extension of every archive written by [`archive`].
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// `DD-MM` label for `date`.
pub fn timestamp_label(date: NaiveDate) -> String {
    format!("{:02}-{:02}", date.day(), date.month())
}

/// Archive file name for `label` on `date`, e.g. `rpi-07-03.tar.gz`.
pub fn archive_name(label: &str, date: NaiveDate) -> String {
    format!("{}-{}.{}", label, timestamp_label(date), ARCHIVE_EXTENSION)
}

impl ArchiveJob {
    /// Plans an archive of `source_tree` into `destination_dir` dated `date`.
    pub fn new(source_tree: &Path, destination_dir: &Path, label: &str, date: NaiveDate) -> Self {
        Self {
            source_tree: source_tree.to_path_buf(),
            destination_archive: destination_dir.join(archive_name(label, date)),
            timestamp_label: timestamp_label(date),
        }
    }
}

/// Archives `source_tree` into `destination_dir` and removes the tree.
///
/// Every regular file below `source_tree` is stored under its path relative
/// to `source_tree`; no entries are filtered. The tree is deleted only after
/// the archive has been fully written.
///
/// # Arguments
///
/// * `source_tree` - Directory to archive
/// * `destination_dir` - Directory receiving the archive, created if missing
/// * `label` - Archive name prefix
/// * `on_progress` - Called once per file written
///
/// # Returns
///
/// The absolute path of the archive, or [`MirrorError::MissingSource`] when
/// `source_tree` is not a directory.
pub fn archive(
    source_tree: &Path,
    destination_dir: &Path,
    label: &str,
    on_progress: &mut dyn FnMut(&ArchiveProgress<'_>),
) -> Result<PathBuf, MirrorError> {
    if !source_tree.is_dir() {
        return Err(MirrorError::MissingSource(source_tree.to_path_buf()));
    }

    std::fs::create_dir_all(destination_dir)?;
    let destination_dir = destination_dir.canonicalize()?;
    let job = ArchiveJob::new(source_tree, &destination_dir, label, Local::now().date_naive());

    info!(
        "Archiving {} -> {}",
        job.source_tree.display(),
        job.destination_archive.display()
    );

    let files = collect_files(&job.source_tree)?;

    // Removed on drop unless persisted; the final path is only replaced on success.
    let partial = tempfile::Builder::new()
        .prefix(".bupsync-")
        .suffix(".partial")
        .tempfile_in(&destination_dir)?;
    if let Err(e) = write_archive(&files, partial.as_file(), on_progress) {
        warn!(
            "Archive of {} failed, keeping the source tree",
            job.source_tree.display()
        );
        return Err(e);
    }
    partial
        .persist(&job.destination_archive)
        .map_err(|e| e.error)?;

    info!("Cleaning up {}", job.source_tree.display());
    std::fs::remove_dir_all(&job.source_tree)?;

    Ok(job.destination_archive)
}

fn write_archive(
    files: &[(PathBuf, String)],
    out: &File,
    on_progress: &mut dyn FnMut(&ArchiveProgress<'_>),
) -> Result<(), MirrorError> {
    let total = files.len() as u64;
    let encoder = GzEncoder::new(BufWriter::new(out), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (index, (path, entry_name)) in files.iter().enumerate() {
        on_progress(&ArchiveProgress {
            index: index as u64 + 1,
            total,
            entry_name: entry_name.as_str(),
        });
        builder.append_path_with_name(path, entry_name)?;
    }

    let mut out = builder.into_inner()?.finish()?;
    out.flush()?;
    Ok(())
}

/// Lists the files under `root` as `(absolute path, relative entry name)`,
/// sorted by name so archives of the same tree are laid out identically.
fn collect_files(root: &Path) -> Result<Vec<(PathBuf, String)>, MirrorError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((entry.path().to_path_buf(), name));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn write(path: &Path, data: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    fn read_entries(archive_path: &Path) -> Vec<(String, Vec<u8>)> {
        let file = File::open(archive_path).unwrap();
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        archive
            .entries()
            .unwrap()
            .map(|entry| {
                let mut entry = entry.unwrap();
                let name = entry.path().unwrap().to_string_lossy().into_owned();
                let mut data = Vec::new();
                entry.read_to_end(&mut data).unwrap();
                (name, data)
            })
            .collect()
    }

    #[test]
    fn test_archive_name_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(archive_name("rpi", date), "rpi-07-03.tar.gz");
        assert_eq!(archive_name("living-room", date), "living-room-07-03.tar.gz");
    }

    #[test]
    fn test_archive_job_paths() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap();
        let job = ArchiveJob::new(Path::new("/w/rpi/pi"), Path::new("/w"), "rpi", date);
        assert_eq!(job.destination_archive, PathBuf::from("/w/rpi-25-12.tar.gz"));
        assert_eq!(job.timestamp_label, "25-12");
    }

    #[test]
    fn test_nested_files_archived_with_relative_names() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("rpi").join("pi");
        write(&tree.join("top.txt"), b"top");
        write(&tree.join("a/mid.txt"), b"middle");
        write(&tree.join("a/b/deep.bin"), &[0, 1, 2, 3]);

        let mut seen = Vec::new();
        let archive_path = archive(&tree, dir.path(), "rpi", &mut |p| {
            seen.push((p.index, p.total, p.entry_name.to_string()))
        })
        .unwrap();

        assert!(archive_path.is_absolute());
        assert!(!tree.exists());

        let mut entries = read_entries(&archive_path);
        entries.sort();
        assert_eq!(
            entries,
            vec![
                ("a/b/deep.bin".to_string(), vec![0, 1, 2, 3]),
                ("a/mid.txt".to_string(), b"middle".to_vec()),
                ("top.txt".to_string(), b"top".to_vec()),
            ]
        );
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|(_, total, _)| *total == 3));
        assert_eq!(seen.last().map(|s| s.0), Some(3));
    }

    #[test]
    fn test_archive_keeps_hidden_files() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        write(&tree.join(".profile"), b"export X=1");
        write(&tree.join("__pycache__/m.pyc"), b"pyc");

        let archive_path = archive(&tree, dir.path(), "rpi", &mut |_| {}).unwrap();

        let names: Vec<String> = read_entries(&archive_path).into_iter().map(|e| e.0).collect();
        assert_eq!(names, vec![".profile".to_string(), "__pycache__/m.pyc".to_string()]);
    }

    #[test]
    fn test_missing_source_leaves_filesystem_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("rpi");

        let result = archive(&missing, dir.path(), "rpi", &mut |_| {});

        assert!(matches!(result, Err(MirrorError::MissingSource(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_archive_keeps_tree_and_earlier_archive() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        write(&tree.join("a.txt"), b"a");
        write(&tree.join("b.txt"), b"b");
        let earlier = dir.path().join(archive_name("rpi", Local::now().date_naive()));
        std::fs::write(&earlier, b"earlier backup").unwrap();

        // b.txt vanishes between the walk and the write
        let vanishing = tree.join("b.txt");
        let result = archive(&tree, dir.path(), "rpi", &mut |p| {
            if p.entry_name == "b.txt" {
                std::fs::remove_file(&vanishing).unwrap();
            }
        });

        assert!(matches!(result, Err(MirrorError::IoError(_))));
        assert!(tree.join("a.txt").is_file());
        assert_eq!(std::fs::read(&earlier).unwrap(), b"earlier backup");
        let mut left: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        let earlier_name = earlier.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(left, vec![earlier_name, "tree".to_string()]);
    }

    #[test]
    fn test_archive_replaces_same_day_archive_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        write(&tree.join("new.txt"), b"new");
        let earlier = dir.path().join(archive_name("rpi", Local::now().date_naive()));
        std::fs::write(&earlier, b"earlier backup").unwrap();

        let archive_path = archive(&tree, dir.path(), "rpi", &mut |_| {}).unwrap();

        assert_eq!(archive_path.file_name(), earlier.file_name());
        let names: Vec<String> = read_entries(&archive_path).into_iter().map(|e| e.0).collect();
        assert_eq!(names, vec!["new.txt".to_string()]);
    }

    #[test]
    fn test_empty_tree_produces_empty_archive() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("empty");
        std::fs::create_dir_all(&tree).unwrap();

        let archive_path = archive(&tree, dir.path(), "rpi", &mut |_| {}).unwrap();

        assert!(read_entries(&archive_path).is_empty());
        assert!(!tree.exists());
    }
}
