//! Trust - Secure Boot Keyset Manager
//!
//! Provisions and manages keysets: self-contained certificate hierarchies used
//! to sign and verify the components of a secure-boot operating system, plus
//! the commands that load derived material into a TPM trust anchor.
//!
//! # Keyset Layout
//!
//! ```text
//! <root>/<keyset>/
//!   manifest-ca/      self-signed root for manifests
//!   sudi-ca/          self-signed root for device identities (valid until 2099)
//!   uefi-pk/          self-signed platform key + guid
//!   uefi-kek/         key-exchange key signed by uefi-pk + guid
//!   uefi-db/ uki-*/   self-signed code-signing leaves + guid
//!   tpmpol-*/         self-signed code-signing leaves
//!   manifest/default/ default project: uuid, cert, key, sudi/
//! ```
//!
//! Each role directory holds `cert.pem` and `privkey.pem`.
//!
//! # Creating a Keyset
//!
//! ```no_run
//! use trust::bootkit::BootkitScript;
//! use trust::certificate_authority::OpensslAuthority;
//! use trust::configs::AppConfig;
//! use trust::registry::KeysetRegistry;
//! use trust::strategy::{Collaborators, GitFetcher};
//!
//! let config = AppConfig::load()?;
//! let registry = KeysetRegistry::from_config(&config)?;
//! let bootkit = BootkitScript::new(config.bootkit.command.clone());
//! let collaborators = Collaborators {
//!     ca: &OpensslAuthority,
//!     bootkit: &bootkit,
//!     fetcher: &GitFetcher,
//! };
//! registry.add(&config, "prod", &["Example Org".to_string()], collaborators)?;
//! # Ok::<(), trust::error::KeysetError>(())
//! ```
//!
//! Generation is all-or-nothing: if any role, the default project or the
//! bootkit build fails, the keyset directory is removed before the error is
//! returned. The reserved `snakeoil` name is cloned from a fixed repository
//! instead of generated, and only gets a best-effort cleanup.
//!
//! # Error Handling
//!
//! Library functions return [`error::Result`]; each failure names the stage it
//! happened in.

pub mod bootkit;
pub mod certificate_authority;
pub mod configs;
pub mod error;
pub mod identifier;
pub mod orchestrator;
pub mod project;
pub mod registry;
pub mod roles;
pub mod secure_file;
pub mod skeleton;
pub mod strategy;
pub mod trust_anchor;
