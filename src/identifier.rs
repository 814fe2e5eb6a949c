//! Identifier Assigner
//!
//! Roles flagged in the catalog, and every project, get a random UUID stored
//! next to their key material. Firmware-variable tooling reads it back later,
//! so it is written once and never regenerated.
//!
//! File names follow the snakeoil reference keyset (`guid` for roles, `uuid`
//! for projects) so generated and cloned keysets share one layout.

use crate::error::{KeysetError, Result};
use crate::secure_file;
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Identifier file inside a role directory.
pub const ROLE_IDENTIFIER_FILE: &str = "guid";
/// Identifier file inside a project directory.
pub const PROJECT_IDENTIFIER_FILE: &str = "uuid";

/// Generate a fresh identifier and store it in `dir/<file_name>`.
///
/// Calling this twice on the same directory replaces the identifier.
pub fn assign_identifier_as(dir: &Path, file_name: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let path = dir.join(file_name);
    secure_file::write_secret(&path, id.hyphenated().to_string().as_bytes())?;
    log::debug!("assigned identifier {} to {}", id, dir.display());
    Ok(id)
}

/// [`assign_identifier_as`] with the role identifier file name.
pub fn assign_identifier(role_dir: &Path) -> Result<Uuid> {
    assign_identifier_as(role_dir, ROLE_IDENTIFIER_FILE)
}

pub fn read_identifier(dir: &Path, file_name: &str) -> Result<Uuid> {
    let path = dir.join(file_name);
    let text = fs::read_to_string(&path)
        .map_err(|e| KeysetError::io(format!("reading {}", path.display()), e))?;
    Uuid::parse_str(text.trim()).map_err(|e| {
        KeysetError::Validation(format!("{} is not a valid UUID: {}", path.display(), e))
    })
}
