//! Keyset Registry
//!
//! Keysets are the entries of one root directory. The existence check in
//! [`KeysetRegistry::add`] is not atomic with creation: two concurrent adds of
//! the same name can both pass it. The generate path still refuses to write
//! into a directory it did not create, so the loser fails with an I/O error.

use crate::configs::AppConfig;
use crate::error::{KeysetError, Result};
use crate::secure_file;
use crate::strategy::{select_strategy, Collaborators};
use std::fs;
use std::path::PathBuf;

pub struct KeysetRegistry {
    root: PathBuf,
}

impl KeysetRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(config.keyset_root()?))
    }

    pub fn keyset_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.keyset_path(name).exists()
    }

    /// Entry names under the root, in directory order.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            KeysetError::io(
                format!("reading keys directory {}", self.root.display()),
                e,
            )
        })?;

        entries
            .map(|entry| {
                entry
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .map_err(|e| {
                        KeysetError::io(
                            format!("reading keys directory {}", self.root.display()),
                            e,
                        )
                    })
            })
            .collect()
    }

    /// Create keyset `name` with whichever strategy the name selects.
    pub fn add(
        &self,
        config: &AppConfig,
        name: &str,
        organization: &[String],
        collaborators: Collaborators<'_>,
    ) -> Result<()> {
        validate_name(name)?;
        if self.exists(name) {
            return Err(KeysetError::AlreadyExists(name.to_string()));
        }
        secure_file::ensure_private_dir(&self.root)?;

        let strategy = select_strategy(config, name, collaborators);
        log::info!("creating keyset {} ({} strategy)", name, strategy.name());
        strategy.create(name, &self.keyset_path(name), organization)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(KeysetError::Validation("Please specify keyset name".into()));
    }
    if name == "." || name == ".." || name.contains('/') || name.contains('\0') {
        return Err(KeysetError::Validation(format!(
            "{:?} is not a valid keyset name",
            name
        )));
    }
    Ok(())
}
