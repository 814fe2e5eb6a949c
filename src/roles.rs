//! Role Catalog
//!
//! Every certificate role a keyset contains, as data. The orchestrator walks
//! [`ROLES`] front to back, so a role signed by another role must appear after
//! its parent.
//!
//! ```text
//! manifest-ca      self-signed CA          (manifest root)
//! sudi-ca          self-signed CA          (device identity root)
//! uefi-pk          self-signed CA + guid   (platform key)
//! tpmpol-*, uki-*, uefi-db                 self-signed code-signing leaves
//! uefi-kek         signed by uefi-pk + guid (key-exchange key)
//! manifest/<project>/                      per-project material, see `project`
//! ```
//!
//! The policy, UKI and db leaves are self-signed even though the KEK is chained
//! from the PK. That asymmetry is carried over as-is from the tool these
//! keysets must stay compatible with.

/// Directory holding the per-project manifest signing trees.
pub const MANIFEST_DIR: &str = "manifest";

pub const MANIFEST_CA: &str = "manifest-ca";
pub const SUDI_CA: &str = "sudi-ca";
pub const UEFI_PK: &str = "uefi-pk";
pub const UEFI_KEK: &str = "uefi-kek";

/// Certificate lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// Whole years from now.
    Years(u32),
    /// Fixed end date as an ASN.1 GeneralizedTime string.
    Until(&'static str),
}

/// Key usage profile of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUse {
    /// CA=true; keyCertSign, cRLSign, digitalSignature.
    Authority,
    /// digitalSignature with the codeSigning extended usage.
    CodeSigning,
    /// digitalSignature only, no extended usage.
    Signing,
}

/// Who signs a role's certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signer {
    SelfSigned,
    /// Signed by the key material of another role in the catalog.
    Role(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Role {
    pub dir: &'static str,
    pub common_name: &'static str,
    pub key_use: KeyUse,
    pub validity: Validity,
    pub requires_identifier: bool,
    pub signer: Signer,
}

impl Role {
    pub fn is_ca(&self) -> bool {
        self.key_use == KeyUse::Authority
    }
}

const LEAF_VALIDITY: Validity = Validity::Years(25);

const fn leaf(dir: &'static str, common_name: &'static str, requires_identifier: bool) -> Role {
    Role {
        dir,
        common_name,
        key_use: KeyUse::CodeSigning,
        validity: LEAF_VALIDITY,
        requires_identifier,
        signer: Signer::SelfSigned,
    }
}

/// All roles, in generation order.
pub const ROLES: &[Role] = &[
    Role {
        dir: MANIFEST_CA,
        common_name: "Manifest rootCA",
        key_use: KeyUse::Authority,
        validity: Validity::Years(25),
        requires_identifier: false,
        signer: Signer::SelfSigned,
    },
    Role {
        dir: SUDI_CA,
        common_name: "SUDI rootCA",
        key_use: KeyUse::Authority,
        validity: Validity::Until("20991231230000Z"),
        requires_identifier: false,
        signer: Signer::SelfSigned,
    },
    Role {
        dir: UEFI_PK,
        common_name: "UEFI PK",
        key_use: KeyUse::Authority,
        validity: Validity::Years(50),
        requires_identifier: true,
        signer: Signer::SelfSigned,
    },
    leaf("tpmpol-admin", "TPM EAPolicy Admin", false),
    leaf("tpmpol-luks", "TPM EAPolicy LUKS", false),
    leaf("uki-tpm", "UKI TPM", true),
    leaf("uki-limited", "UKI Limited", true),
    leaf("uki-production", "UKI Production", true),
    leaf("uefi-db", "UEFI DB", true),
    Role {
        dir: UEFI_KEK,
        common_name: "UEFI KEK",
        key_use: KeyUse::Signing,
        validity: Validity::Years(50),
        requires_identifier: true,
        signer: Signer::Role(UEFI_PK),
    },
];

pub fn find(dir: &str) -> Option<&'static Role> {
    ROLES.iter().find(|role| role.dir == dir)
}

/// Every directory the skeleton builder creates directly under a keyset.
pub fn key_directories() -> impl Iterator<Item = &'static str> {
    ROLES
        .iter()
        .map(|role| role.dir)
        .chain(std::iter::once(MANIFEST_DIR))
}
