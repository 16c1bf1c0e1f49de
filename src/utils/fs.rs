//! Atomic replace-on-write for keys, certificates and stores.
//!
//! All persistence of sensitive material goes through write-to-temp,
//! fsync, rename so a crash mid-write never leaves a half-written key or
//! store readable by a dependent process. The temp file is created in the
//! destination directory so the final rename stays on one filesystem.

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

/// Atomically replace `path` with `bytes`.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    write_impl(path, bytes, false)
}

/// Atomically replace `path` with `bytes`, restricting permissions to the
/// owner (0600 on Unix) before the file becomes visible. Use for private
/// keys and sealed stores.
pub fn atomic_write_secret(path: &Path, bytes: &[u8]) -> io::Result<()> {
    write_impl(path, bytes, true)
}

fn write_impl(path: &Path, bytes: &[u8], secret: bool) -> io::Result<()> {
    let dir = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "destination path has no parent directory")
    })?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    if secret {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file().set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
    }

    tmp.persist(path).map_err(|e| e.error)?;
    debug!(path = %path.display(), bytes = bytes.len(), "Atomically replaced file");
    Ok(())
}
