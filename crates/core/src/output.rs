//! Atomic output writing.
//!
//! Generated files are written to a temporary sibling, flushed to disk and
//! renamed over the destination, so an interrupted build never leaves a
//! half-written header behind.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

/// Atomically replaces `path` with `contents`.
///
/// Missing parent directories are created.
///
/// # Arguments
///
/// * `path` - Destination file.
/// * `contents` - Complete file contents.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| Error::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| Error::io(tmp.path(), e))?;
    let _ = tmp.persist(path).map_err(|e| Error::io(path, e.error))?;

    debug!(path = %path.display(), bytes = contents.len(), "wrote");
    Ok(())
}
