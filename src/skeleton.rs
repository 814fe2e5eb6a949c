//! Directory Skeleton Builder

use crate::error::Result;
use crate::roles;
use crate::secure_file;
use std::path::Path;

/// Create the keyset directory itself. Fails if anything already exists at
/// `keyset_path`; missing parents are created.
pub fn create_keyset_dir(keyset_path: &Path) -> Result<()> {
    if let Some(parent) = keyset_path.parent() {
        secure_file::ensure_private_dir(parent)?;
    }
    secure_file::create_private_dir(keyset_path)
}

/// One empty directory per catalog role plus the manifest tree, under an
/// existing keyset directory.
pub fn create_role_dirs(keyset_path: &Path) -> Result<()> {
    for dir in roles::key_directories() {
        secure_file::create_private_dir(&keyset_path.join(dir))?;
    }
    Ok(())
}
