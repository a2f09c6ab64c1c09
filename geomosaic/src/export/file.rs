//! Artifact file output.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::ExportError;

/// Default artifact name inside `dir`: `kml_master_<unix millis>.svg`.
pub fn default_export_path(dir: &Path) -> PathBuf {
    dir.join(format!("kml_master_{}.svg", chrono::Utc::now().timestamp_millis()))
}

/// Writes `bytes` to `path` so that readers see either nothing or the
/// complete file.
///
/// The data goes to a temporary file in the destination directory, which is
/// renamed over `path` only after a successful flush. On error the temporary
/// file is removed.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(io_err)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    debug!(path = %path.display(), bytes = bytes.len(), "Artifact written");
    Ok(())
}
