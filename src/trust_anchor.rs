//! Trust anchor provisioning
//!
//! The chip is driven by a helper program:
//!
//! ```text
//! <helper> layout-version
//! <helper> ea-version
//! <helper> provision <cert> <key>
//! ```
//!
//! Before anything is handed to the chip the certificate and key are parsed
//! and checked to be a pair; a mismatched pair cannot be undone once written.

use crate::configs::TrustAnchorConfig;
use crate::error::{KeysetError, Result};
use openssl::pkey::PKey;
use openssl::x509::X509;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub trait TrustAnchor {
    /// Whether the chip is present on this machine.
    fn is_present(&self) -> bool;

    fn layout_version(&self) -> Result<String>;

    fn ea_policy_version(&self) -> Result<String>;

    fn provision(&self, cert: &Path, key: &Path) -> Result<()>;
}

/// TPM 2.0 reached through the configured helper program.
#[derive(Debug, Clone)]
pub struct Tpm2 {
    device: PathBuf,
    helper: String,
}

impl Tpm2 {
    pub fn new(config: &TrustAnchorConfig) -> Self {
        Self {
            device: config.device.clone(),
            helper: config.helper.clone(),
        }
    }

    fn run(&self, args: &[&OsStr]) -> Result<String> {
        let output = Command::new(&self.helper)
            .args(args)
            .output()
            .map_err(|e| {
                KeysetError::TrustAnchor(format!("Failed running {}: {}", self.helper, e))
            })?;
        if !output.status.success() {
            return Err(KeysetError::TrustAnchor(format!(
                "{} {:?} failed ({}): {}",
                self.helper,
                args,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl TrustAnchor for Tpm2 {
    fn is_present(&self) -> bool {
        self.device.exists()
    }

    fn layout_version(&self) -> Result<String> {
        self.run(&[OsStr::new("layout-version")])
    }

    fn ea_policy_version(&self) -> Result<String> {
        self.run(&[OsStr::new("ea-version")])
    }

    fn provision(&self, cert: &Path, key: &Path) -> Result<()> {
        self.run(&[OsStr::new("provision"), cert.as_os_str(), key.as_os_str()])
            .map(|_| ())
    }
}

/// Check that `cert` and `key` parse and belong together.
pub fn check_provisioning_pair(cert: &Path, key: &Path) -> Result<()> {
    let cert_pem =
        fs::read(cert).map_err(|e| KeysetError::io(format!("reading {}", cert.display()), e))?;
    let key_pem =
        fs::read(key).map_err(|e| KeysetError::io(format!("reading {}", key.display()), e))?;

    let certificate = X509::from_pem(&cert_pem)
        .map_err(|e| KeysetError::signing(format!("parsing {}", cert.display()), e))?;
    let private_key = PKey::private_key_from_pem(&key_pem)
        .map_err(|e| KeysetError::signing(format!("parsing {}", key.display()), e))?;
    let public_key = certificate
        .public_key()
        .map_err(|e| KeysetError::signing("extracting certificate public key", e))?;

    if !public_key.public_eq(&private_key) {
        return Err(KeysetError::Validation(format!(
            "{} does not match the key in {}",
            key.display(),
            cert.display()
        )));
    }
    Ok(())
}

/// Provision the chip with a certificate and key pair.
pub fn provision(anchor: &dyn TrustAnchor, cert: &Path, key: &Path) -> Result<()> {
    if !anchor.is_present() {
        return Err(KeysetError::TrustAnchor(
            "No TPM.  No other subsystems have been implemented".into(),
        ));
    }
    check_provisioning_pair(cert, key)?;
    log::info!("provisioning trust anchor with {}", cert.display());
    anchor.provision(cert, key)
}
