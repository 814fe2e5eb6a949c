//! Certificate Authority Service
//!
//! Mints the key pair and certificate for one role and writes them into the
//! role's directory as `cert.pem` and `privkey.pem`.
//!
//! # Certificate Properties
//! - **Key**: ECDSA P-256, fresh for every certificate
//! - **Signature**: SHA-256
//! - **Serial Number**: random 128-bit
//! - **Version**: X.509v3 with subject key identifier; chained certificates
//!   also carry an authority key identifier
//! - **Authority roles**: CA=true (critical), keyCertSign, cRLSign, digitalSignature
//! - **Code signing roles**: digitalSignature, EKU codeSigning
//! - **Signing roles**: digitalSignature only
//!
//! ```text
//! create_root_ca  self-signed CA
//! create_cert     self-signed leaf
//! sign_cert       leaf signed by a loaded parent (see load_ca)
//! ```

use crate::error::{KeysetError, Result};
use crate::roles::{KeyUse, Role, Validity};
use crate::secure_file;
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectKeyIdentifier,
};
use openssl::x509::{X509Name, X509Ref, X509};
use std::fs;
use std::path::Path;

pub const CERT_FILE: &str = "cert.pem";
pub const KEY_FILE: &str = "privkey.pem";

const X509_VERSION_3: i32 = 2; // X509 version 3 is represented by 2
const SERIAL_BITS: i32 = 128;

/// Subject fields shared by every certificate in one keyset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeysetSubject {
    pub organization: Vec<String>,
    pub organizational_unit: String,
}

/// Everything needed to mint one certificate. Built per role and dropped after use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateTemplate {
    pub common_name: String,
    pub organization: Vec<String>,
    pub organizational_unit: String,
    pub validity: Validity,
    pub key_use: KeyUse,
}

impl CertificateTemplate {
    pub fn for_role(role: &Role, subject: &KeysetSubject) -> Self {
        Self {
            common_name: role.common_name.to_string(),
            organization: subject.organization.clone(),
            organizational_unit: subject.organizational_unit.clone(),
            validity: role.validity,
            key_use: role.key_use,
        }
    }

    /// Code-signing leaf with an arbitrary common name.
    pub fn code_signing(common_name: impl Into<String>, subject: &KeysetSubject) -> Self {
        Self {
            common_name: common_name.into(),
            organization: subject.organization.clone(),
            organizational_unit: subject.organizational_unit.clone(),
            validity: Validity::Years(25),
            key_use: KeyUse::CodeSigning,
        }
    }
}

/// A parent's certificate and private key, loaded for chained signing.
pub struct CaMaterial {
    pub certificate: X509,
    pub private_key: PKey<Private>,
}

/// The primitives the orchestrator composes into a keyset.
pub trait CertificateAuthority {
    /// Self-signed CA certificate into `out_dir`.
    fn create_root_ca(&self, template: &CertificateTemplate, out_dir: &Path) -> Result<()>;

    /// Self-signed non-CA certificate into `out_dir`.
    fn create_cert(&self, template: &CertificateTemplate, out_dir: &Path) -> Result<()>;

    /// Certificate signed by `parent` into `out_dir`.
    fn sign_cert(
        &self,
        template: &CertificateTemplate,
        parent: &CaMaterial,
        out_dir: &Path,
    ) -> Result<()>;

    /// Read back the material a previous call wrote into `dir`.
    fn load_ca(&self, dir: &Path) -> Result<CaMaterial> {
        load_material(dir)
    }
}

pub fn load_material(dir: &Path) -> Result<CaMaterial> {
    let cert_path = dir.join(CERT_FILE);
    let key_path = dir.join(KEY_FILE);
    let cert_pem = fs::read(&cert_path)
        .map_err(|e| KeysetError::io(format!("reading {}", cert_path.display()), e))?;
    let key_pem = fs::read(&key_path)
        .map_err(|e| KeysetError::io(format!("reading {}", key_path.display()), e))?;

    let certificate = X509::from_pem(&cert_pem).map_err(|e| {
        KeysetError::signing(format!("parsing {}", cert_path.display()), e)
    })?;
    let private_key = PKey::private_key_from_pem(&key_pem).map_err(|e| {
        KeysetError::signing(format!("parsing {}", key_path.display()), e)
    })?;
    Ok(CaMaterial {
        certificate,
        private_key,
    })
}

fn ssl(what: &'static str) -> impl FnOnce(ErrorStack) -> KeysetError {
    move |e| KeysetError::signing(what, e)
}

/// [`CertificateAuthority`] backed by the `openssl` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpensslAuthority;

impl OpensslAuthority {
    fn generate_key() -> Result<PKey<Private>> {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1)
            .map_err(ssl("loading P-256 group"))?;
        let ec = EcKey::generate(&group).map_err(ssl("generating EC keypair"))?;
        PKey::from_ec_key(ec).map_err(ssl("creating private key"))
    }

    fn subject_name(template: &CertificateTemplate) -> Result<X509Name> {
        let mut name_builder = X509Name::builder().map_err(ssl("creating name builder"))?;
        for org in &template.organization {
            name_builder
                .append_entry_by_nid(Nid::ORGANIZATIONNAME, org)
                .map_err(ssl("setting organization"))?;
        }
        if !template.organizational_unit.is_empty() {
            name_builder
                .append_entry_by_nid(Nid::ORGANIZATIONALUNITNAME, &template.organizational_unit)
                .map_err(ssl("setting organizational unit"))?;
        }
        name_builder
            .append_entry_by_nid(Nid::COMMONNAME, &template.common_name)
            .map_err(ssl("setting CN"))?;
        Ok(name_builder.build())
    }

    fn not_after(validity: Validity) -> Result<Asn1Time> {
        match validity {
            Validity::Years(years) => {
                // Leap days included so 25 years lands on the same calendar date.
                Asn1Time::days_from_now(years * 365 + years / 4)
                    .map_err(ssl("creating not_after"))
            }
            Validity::Until(time) => Asn1Time::from_str(time).map_err(ssl("parsing not_after")),
        }
    }

    /// Build and sign one certificate. `issuer` is `None` for self-signed.
    fn build(
        template: &CertificateTemplate,
        private_key: &PKey<Private>,
        issuer: Option<&CaMaterial>,
    ) -> Result<X509> {
        let mut builder = X509::builder().map_err(ssl("creating X509 builder"))?;
        builder
            .set_version(X509_VERSION_3)
            .map_err(ssl("setting version"))?;

        let mut serial = BigNum::new().map_err(ssl("allocating serial"))?;
        serial
            .rand(SERIAL_BITS, MsbOption::MAYBE_ZERO, false)
            .map_err(ssl("generating serial"))?;
        let asn1_serial = serial.to_asn1_integer().map_err(ssl("encoding serial"))?;
        builder
            .set_serial_number(&asn1_serial)
            .map_err(ssl("setting serial"))?;

        let name = Self::subject_name(template)?;
        builder
            .set_subject_name(&name)
            .map_err(ssl("setting subject"))?;
        match issuer {
            Some(parent) => builder
                .set_issuer_name(parent.certificate.subject_name())
                .map_err(ssl("setting issuer from parent"))?,
            None => builder.set_issuer_name(&name).map_err(ssl("setting issuer"))?,
        }

        let not_before = Asn1Time::days_from_now(0).map_err(ssl("creating not_before"))?;
        builder
            .set_not_before(&not_before)
            .map_err(ssl("setting not_before"))?;
        let not_after = Self::not_after(template.validity)?;
        builder
            .set_not_after(&not_after)
            .map_err(ssl("setting not_after"))?;

        builder
            .set_pubkey(private_key)
            .map_err(ssl("setting public key"))?;

        match template.key_use {
            KeyUse::Authority => {
                let bc = BasicConstraints::new()
                    .critical()
                    .ca()
                    .build()
                    .map_err(ssl("building BasicConstraints"))?;
                builder
                    .append_extension(bc)
                    .map_err(ssl("adding BasicConstraints"))?;
                let ku = KeyUsage::new()
                    .critical()
                    .key_cert_sign()
                    .crl_sign()
                    .digital_signature()
                    .build()
                    .map_err(ssl("building KeyUsage"))?;
                builder.append_extension(ku).map_err(ssl("adding KeyUsage"))?;
            }
            KeyUse::CodeSigning | KeyUse::Signing => {
                let ku = KeyUsage::new()
                    .critical()
                    .digital_signature()
                    .build()
                    .map_err(ssl("building KeyUsage"))?;
                builder.append_extension(ku).map_err(ssl("adding KeyUsage"))?;
                if template.key_use == KeyUse::CodeSigning {
                    let eku = ExtendedKeyUsage::new()
                        .code_signing()
                        .build()
                        .map_err(ssl("building ExtendedKeyUsage"))?;
                    builder
                        .append_extension(eku)
                        .map_err(ssl("adding ExtendedKeyUsage"))?;
                }
            }
        }

        let ski = SubjectKeyIdentifier::new()
            .build(&builder.x509v3_context(None, None))
            .map_err(ssl("building SubjectKeyIdentifier"))?;
        builder
            .append_extension(ski)
            .map_err(ssl("adding SubjectKeyIdentifier"))?;

        let signing_key = match issuer {
            Some(parent) => {
                let parent_cert: &X509Ref = &parent.certificate;
                let aki = AuthorityKeyIdentifier::new()
                    .keyid(false)
                    .build(&builder.x509v3_context(Some(parent_cert), None))
                    .map_err(ssl("building AuthorityKeyIdentifier"))?;
                builder
                    .append_extension(aki)
                    .map_err(ssl("adding AuthorityKeyIdentifier"))?;
                &parent.private_key
            }
            None => private_key,
        };

        builder
            .sign(signing_key, MessageDigest::sha256())
            .map_err(ssl("signing certificate"))?;
        Ok(builder.build())
    }

    fn issue(
        template: &CertificateTemplate,
        issuer: Option<&CaMaterial>,
        out_dir: &Path,
    ) -> Result<()> {
        let private_key = Self::generate_key()?;
        let certificate = Self::build(template, &private_key, issuer)?;

        let key_pem = private_key
            .private_key_to_pem_pkcs8()
            .map_err(ssl("encoding private key"))?;
        let cert_pem = certificate.to_pem().map_err(ssl("encoding certificate"))?;
        secure_file::write_secret(&out_dir.join(KEY_FILE), &key_pem)?;
        secure_file::write_with_mode(
            &out_dir.join(CERT_FILE),
            &cert_pem,
            secure_file::PUBLIC_FILE_MODE,
        )?;
        log::debug!(
            "issued \"{}\" into {}",
            template.common_name,
            out_dir.display()
        );
        Ok(())
    }
}

impl CertificateAuthority for OpensslAuthority {
    fn create_root_ca(&self, template: &CertificateTemplate, out_dir: &Path) -> Result<()> {
        if template.key_use != KeyUse::Authority {
            return Err(KeysetError::signing(
                "creating root CA",
                format!("\"{}\" is not a CA template", template.common_name),
            ));
        }
        Self::issue(template, None, out_dir)
    }

    fn create_cert(&self, template: &CertificateTemplate, out_dir: &Path) -> Result<()> {
        Self::issue(template, None, out_dir)
    }

    fn sign_cert(
        &self,
        template: &CertificateTemplate,
        parent: &CaMaterial,
        out_dir: &Path,
    ) -> Result<()> {
        Self::issue(template, Some(parent), out_dir)
    }
}
