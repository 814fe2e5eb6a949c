//! Owner-only file and directory creation
//!
//! Key material, identifiers and keyset directories are created with their
//! final mode from the start, so there is no window in which another user can
//! open them.

use crate::error::{KeysetError, Result};
use std::fs::{self, DirBuilder, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Private keys and identifiers.
pub const SECRET_FILE_MODE: u32 = 0o600;
/// Certificates.
pub const PUBLIC_FILE_MODE: u32 = 0o640;
/// Keyset and role directories.
pub const PRIVATE_DIR_MODE: u32 = 0o700;

#[cfg(unix)]
fn open_with_mode(path: &Path, mode: u32) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)
}

#[cfg(not(unix))]
fn open_with_mode(path: &Path, _mode: u32) -> std::io::Result<fs::File> {
    log::warn!(
        "Creating '{}' without restrictive permissions: not supported on this platform",
        path.display()
    );
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// Write `data` to `path`, creating or truncating it with `mode`.
pub fn write_with_mode(path: &Path, data: &[u8], mode: u32) -> Result<()> {
    let context = || format!("writing {}", path.display());
    let mut file = open_with_mode(path, mode).map_err(|e| KeysetError::io(context(), e))?;
    file.write_all(data)
        .and_then(|_| file.sync_all())
        .map_err(|e| KeysetError::io(context(), e))?;

    // An existing file keeps its old mode through truncate.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .map_err(|e| KeysetError::io(context(), e))?;
    }

    log::debug!("wrote {} ({:o})", path.display(), mode);
    Ok(())
}

pub fn write_secret(path: &Path, data: &[u8]) -> Result<()> {
    write_with_mode(path, data, SECRET_FILE_MODE)
}

fn dir_builder(recursive: bool) -> DirBuilder {
    let mut builder = DirBuilder::new();
    builder.recursive(recursive);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(PRIVATE_DIR_MODE);
    }
    builder
}

/// Create a single owner-only directory. Fails if `path` already exists.
pub fn create_private_dir(path: &Path) -> Result<()> {
    dir_builder(false)
        .create(path)
        .map_err(|e| KeysetError::io(format!("creating directory {}", path.display()), e))
}

/// Create `path` and any missing parents; an existing directory is fine.
pub fn ensure_private_dir(path: &Path) -> Result<()> {
    dir_builder(true)
        .create(path)
        .map_err(|e| KeysetError::io(format!("creating directory {}", path.display()), e))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn mode(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn secret_files_are_owner_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("privkey.pem");
        write_secret(&path, b"key").unwrap();
        assert_eq!(mode(&path), 0o600);
        assert_eq!(fs::read(&path).unwrap(), b"key");
    }

    #[test]
    fn rewrite_tightens_existing_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guid");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o666)).unwrap();
        write_secret(&path, b"new").unwrap();
        assert_eq!(mode(&path), 0o600);
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn create_private_dir_refuses_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyset");
        create_private_dir(&path).unwrap();
        assert_eq!(mode(&path), 0o700);
        assert!(matches!(
            create_private_dir(&path),
            Err(KeysetError::Io { .. })
        ));
        ensure_private_dir(&path).unwrap();
    }
}
