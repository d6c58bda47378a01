//! Single-file download with per-chunk progress.

use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

/// Read size for a single transfer chunk.
pub(crate) const CHUNK_SIZE: usize = 32 * 1024;

/// Percentage of `total` covered by `transferred`, rounded to the nearest
/// integer. An empty file is complete by definition.
pub fn percent_complete(transferred: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (transferred as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Streams `reader` into a new file at `local_path`.
///
/// `on_chunk` receives `(transferred, total)` after every chunk written. A
/// zero-length source reports exactly once so callers always see completion.
///
/// # Arguments
///
/// * `reader` - Source of the remote file contents
/// * `local_path` - Destination file (created or truncated)
/// * `total` - Expected size in bytes, used only for progress
/// * `on_chunk` - Progress callback
///
/// # Returns
///
/// The number of bytes written.
pub(crate) fn download_to_file<R: Read>(
    reader: &mut R,
    local_path: &Path,
    total: u64,
    on_chunk: &mut dyn FnMut(u64, u64),
) -> io::Result<u64> {
    let mut file = BufWriter::new(std::fs::File::create(local_path)?);
    let written = copy_with_progress(reader, &mut file, total, on_chunk)?;
    file.flush()?;
    Ok(written)
}

fn copy_with_progress<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    total: u64,
    on_chunk: &mut dyn FnMut(u64, u64),
) -> io::Result<u64> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut transferred = 0u64;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer[..n])?;
        transferred += n as u64;
        on_chunk(transferred, total);
    }

    if transferred == 0 {
        on_chunk(0, total);
    }

    Ok(transferred)
}
