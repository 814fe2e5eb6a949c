//! Project Provisioner
//!
//! A project is a manifest signing context under `manifest/<name>/`:
//!
//! ```text
//! manifest/<name>/uuid         project identifier
//! manifest/<name>/cert.pem     CN=<uuid>, code signing, signed by manifest-ca
//! manifest/<name>/privkey.pem
//! manifest/<name>/sudi/        slot for device identity certificates
//! ```
//!
//! Nothing here cleans up after a failure; the caller owns rollback.

use crate::certificate_authority::{CertificateAuthority, CertificateTemplate, KeysetSubject};
use crate::error::Result;
use crate::identifier::{self, PROJECT_IDENTIFIER_FILE};
use crate::roles::{MANIFEST_CA, MANIFEST_DIR};
use crate::secure_file;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DEFAULT_PROJECT: &str = "default";
pub const PROJECT_SUDI_DIR: &str = "sudi";

pub fn project_dir(keyset_path: &Path, project: &str) -> PathBuf {
    keyset_path.join(MANIFEST_DIR).join(project)
}

/// Create the project tree and mint its identifier and manifest key.
pub fn provision_project(
    ca: &dyn CertificateAuthority,
    keyset_path: &Path,
    project: &str,
    subject: &KeysetSubject,
) -> Result<Uuid> {
    let dir = project_dir(keyset_path, project);
    secure_file::ensure_private_dir(&dir)?;
    secure_file::ensure_private_dir(&dir.join(PROJECT_SUDI_DIR))?;

    let id = identifier::assign_identifier_as(&dir, PROJECT_IDENTIFIER_FILE)?;
    let manifest_ca = ca.load_ca(&keyset_path.join(MANIFEST_CA))?;
    let template = CertificateTemplate::code_signing(id.hyphenated().to_string(), subject);
    ca.sign_cert(&template, &manifest_ca, &dir)?;

    log::info!("created project {} ({})", project, id);
    Ok(id)
}

pub fn bootstrap_default_project(
    ca: &dyn CertificateAuthority,
    keyset_path: &Path,
    subject: &KeysetSubject,
) -> Result<Uuid> {
    provision_project(ca, keyset_path, DEFAULT_PROJECT, subject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate_authority::{load_material, OpensslAuthority, CERT_FILE};
    use crate::error::KeysetError;
    use crate::roles;
    use openssl::nid::Nid;
    use openssl::x509::X509VerifyResult;

    fn subject() -> KeysetSubject {
        KeysetSubject {
            organization: vec![],
            organizational_unit: "PuzzlesOS Machine Project unit".into(),
        }
    }

    #[test]
    fn default_project_is_signed_by_manifest_ca() {
        let keyset = tempfile::tempdir().unwrap();
        let ca_dir = keyset.path().join(MANIFEST_CA);
        std::fs::create_dir(&ca_dir).unwrap();
        let role = roles::find(MANIFEST_CA).unwrap();
        OpensslAuthority
            .create_root_ca(&CertificateTemplate::for_role(role, &subject()), &ca_dir)
            .unwrap();

        let id = bootstrap_default_project(&OpensslAuthority, keyset.path(), &subject()).unwrap();

        let dir = project_dir(keyset.path(), DEFAULT_PROJECT);
        assert!(dir.join(PROJECT_SUDI_DIR).is_dir());
        assert!(dir.join(CERT_FILE).is_file());
        assert_eq!(
            identifier::read_identifier(&dir, PROJECT_IDENTIFIER_FILE).unwrap(),
            id
        );

        let root = load_material(&ca_dir).unwrap().certificate;
        let cert = load_material(&dir).unwrap().certificate;
        assert_eq!(root.issued(&cert), X509VerifyResult::OK);
        let cn = cert
            .subject_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()
            .unwrap()
            .data()
            .as_utf8()
            .unwrap()
            .to_string();
        assert_eq!(cn, id.hyphenated().to_string());
    }

    #[test]
    fn missing_manifest_ca_fails() {
        let keyset = tempfile::tempdir().unwrap();
        let result = bootstrap_default_project(&OpensslAuthority, keyset.path(), &subject());
        assert!(matches!(result, Err(KeysetError::Io { .. })));
    }
}
