//! Keyset Orchestrator
//!
//! Generates a complete keyset, or nothing at all.
//!
//! # Stages
//! 1. keyset directory, then the [`RollbackGuard`], then role directories
//! 2. every role in [`roles::ROLES`], in order: self-signed roots, the platform
//!    key, the self-signed leaves, then the KEK signed by the platform key
//! 3. the default project under `manifest/`
//! 4. the bootkit for product `default`
//!
//! Any error from stage 1 onwards removes the whole keyset directory before it
//! is returned. A keyset directory that already existed is never touched.

use crate::bootkit::{BootkitBuilder, DEFAULT_PRODUCT};
use crate::certificate_authority::{CertificateAuthority, CertificateTemplate, KeysetSubject};
use crate::error::{KeysetError, Result};
use crate::identifier;
use crate::project;
use crate::roles::{self, Role, Signer};
use crate::skeleton;
use std::fs;
use std::path::{Path, PathBuf};

/// Removes a directory tree when dropped, unless disarmed first.
#[must_use = "dropping the guard immediately removes the directory"]
pub struct RollbackGuard {
    path: PathBuf,
    armed: bool,
}

impl RollbackGuard {
    pub fn arm(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    /// Keep the directory.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RollbackGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        log::warn!("rolling back {}", self.path.display());
        if let Err(e) = fs::remove_dir_all(&self.path) {
            log::error!("failed removing {}: {}", self.path.display(), e);
        }
    }
}

pub struct Orchestrator<'a> {
    ca: &'a dyn CertificateAuthority,
    bootkit: &'a dyn BootkitBuilder,
}

impl<'a> Orchestrator<'a> {
    pub fn new(ca: &'a dyn CertificateAuthority, bootkit: &'a dyn BootkitBuilder) -> Self {
        Self { ca, bootkit }
    }

    /// Generate keyset `name` at `keyset_path`.
    pub fn generate(&self, name: &str, keyset_path: &Path, subject: &KeysetSubject) -> Result<()> {
        if name.is_empty() {
            return Err(KeysetError::Validation("keyset parameter is missing".into()));
        }

        skeleton::create_keyset_dir(keyset_path)?;
        let guard = RollbackGuard::arm(keyset_path);
        skeleton::create_role_dirs(keyset_path)?;

        let mut generated: Vec<&str> = Vec::with_capacity(roles::ROLES.len());
        for role in roles::ROLES {
            self.generate_role(role, keyset_path, subject, &generated)
                .map_err(|e| e.in_stage(role.dir))?;
            generated.push(role.dir);
        }

        project::bootstrap_default_project(self.ca, keyset_path, subject)
            .map_err(|e| e.in_stage("creating default project"))?;

        self.bootkit
            .build(name, keyset_path, DEFAULT_PRODUCT)
            .map_err(|e| e.in_stage("creating bootkit artifacts for keyset"))?;

        guard.disarm();
        log::info!("keyset {} created at {}", name, keyset_path.display());
        Ok(())
    }

    fn generate_role(
        &self,
        role: &Role,
        keyset_path: &Path,
        subject: &KeysetSubject,
        generated: &[&str],
    ) -> Result<()> {
        let out_dir = keyset_path.join(role.dir);
        let template = CertificateTemplate::for_role(role, subject);
        log::info!("generating {} ({})", role.common_name, role.dir);

        match role.signer {
            Signer::SelfSigned if role.is_ca() => self.ca.create_root_ca(&template, &out_dir)?,
            Signer::SelfSigned => self.ca.create_cert(&template, &out_dir)?,
            Signer::Role(parent) => {
                if !generated.contains(&parent) {
                    return Err(KeysetError::signing(
                        "loading parent",
                        format!("{} has not been generated yet", parent),
                    ));
                }
                let parent = self.ca.load_ca(&keyset_path.join(parent))?;
                self.ca.sign_cert(&template, &parent, &out_dir)?;
            }
        }

        if role.requires_identifier {
            identifier::assign_identifier(&out_dir)?;
        }
        Ok(())
    }
}
