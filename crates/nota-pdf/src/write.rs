//! Atomic artifact writes
//!
//! Output is staged in a temporary file next to the destination and renamed
//! into place only once fully written.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::PdfError;

/// Write `bytes` to `path` so that `path` is either the complete new content
/// or untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PdfError> {
    let write_error = |source: std::io::Error| PdfError::WriteError {
        path: path.display().to_string(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(dir).map_err(write_error)?;
    staged.write_all(bytes).map_err(write_error)?;
    staged.as_file().sync_all().map_err(write_error)?;
    staged.persist(path).map_err(|e| write_error(e.error))?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Artifact written");
    Ok(())
}
