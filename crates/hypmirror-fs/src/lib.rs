//! Filesystem primitives used by the mirror's durable store.
//!
//! Two guarantees matter to callers: readers never observe a half-written
//! sidecar or status file ([`atomic_write`]), and removal is idempotent
//! ([`remove_file_if_exists`], [`remove_dir_all_if_exists`]) so that evicting
//! a file that was never downloaded is not an error.

mod error;

pub use error::{Error, Result, from_io};

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

/// Mode of files written by [`atomic_write`]; the snapshot is served to
/// other users.
#[cfg(unix)]
const WRITE_MODE: u32 = 0o644;

/// Write `content` to a uniquely named sibling temp file and rename it over
/// `path`. Concurrent writers to the same path never share a temp file; the
/// last rename wins.
pub fn atomic_write(path: impl AsRef<Path>, content: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| error::write_error(path, e))?;
    tmp.write_all(content).map_err(|e| error::write_error(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(WRITE_MODE))
            .map_err(|e| error::write_error(path, e))?;
    }

    tmp.persist(path).map_err(|e| error::write_error(path, e.error))?;
    Ok(())
}

/// Create `dir` and its parents; an existing directory is not an error.
pub fn ensure_dir(dir: impl AsRef<Path>) -> Result<()> {
    std::fs::create_dir_all(dir.as_ref()).map_err(from_io)
}

/// Remove a file. Returns `Ok(false)` when there was nothing to remove.
pub fn remove_file_if_exists(path: impl AsRef<Path>) -> Result<bool> {
    match std::fs::remove_file(path.as_ref()) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(from_io(e)),
    }
}

/// Remove `dir` and everything below it. Returns `Ok(false)` when there was
/// nothing to remove.
pub fn remove_dir_all_if_exists(dir: impl AsRef<Path>) -> Result<bool> {
    match std::fs::remove_dir_all(dir.as_ref()) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(from_io(e)),
    }
}
