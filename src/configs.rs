use crate::error::{KeysetError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment override for the keyset root, checked after the config file.
pub const KEYSET_ROOT_ENV: &str = "TRUST_KEYSET_ROOT";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub keysets: KeysetsConfig,
    #[serde(default)]
    pub bootkit: BootkitConfig,
    #[serde(default)]
    pub certificates: CertificateDefaults,
    #[serde(default)]
    pub trust_anchor: TrustAnchorConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct KeysetsConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BootkitConfig {
    #[serde(default = "default_bootkit_command")]
    pub command: String,
}

impl Default for BootkitConfig {
    fn default() -> Self {
        Self {
            command: default_bootkit_command(),
        }
    }
}

fn default_bootkit_command() -> String {
    "keysetbootkit.sh".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CertificateDefaults {
    #[serde(default = "default_ou_prefix")]
    pub organizational_unit_prefix: String,
}

impl Default for CertificateDefaults {
    fn default() -> Self {
        Self {
            organizational_unit_prefix: default_ou_prefix(),
        }
    }
}

fn default_ou_prefix() -> String {
    "PuzzlesOS Machine Project ".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrustAnchorConfig {
    #[serde(default = "default_tpm_device")]
    pub device: PathBuf,
    #[serde(default = "default_tpm_helper")]
    pub helper: String,
}

impl Default for TrustAnchorConfig {
    fn default() -> Self {
        Self {
            device: default_tpm_device(),
            helper: default_tpm_helper(),
        }
    }
}

fn default_tpm_device() -> PathBuf {
    PathBuf::from("/dev/tpm0")
}

fn default_tpm_helper() -> String {
    "trust-tpm2".to_string()
}

/// `$XDG_CONFIG_HOME/machine`, or `$HOME/.config/machine`.
fn machine_config_dir() -> Option<PathBuf> {
    match env::var_os("XDG_CONFIG_HOME") {
        Some(xdg) if !xdg.is_empty() => Some(PathBuf::from(xdg).join("machine")),
        _ => env::var_os("HOME").map(|home| PathBuf::from(home).join(".config").join("machine")),
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path).map_err(|e| {
            KeysetError::io(format!("reading config file {}", path.display()), e)
        })?;

        toml::from_str(&config_str)
            .map_err(|e| KeysetError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load the per-user config file if there is one, defaults otherwise.
    pub fn load() -> Result<Self> {
        match machine_config_dir().map(|dir| dir.join("trust.toml")) {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Resolve the directory holding every keyset.
    pub fn keyset_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.keysets.root {
            return Ok(root.clone());
        }
        if let Some(root) = env::var_os(KEYSET_ROOT_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(root));
        }
        machine_config_dir()
            .map(|dir| dir.join("trust").join("keys"))
            .ok_or_else(|| {
                KeysetError::Config(
                    "cannot locate keyset root: neither XDG_CONFIG_HOME nor HOME is set".into(),
                )
            })
    }

    /// OU stamped on every certificate of the named keyset.
    pub fn organizational_unit(&self, keyset_name: &str) -> String {
        format!(
            "{}{}",
            self.certificates.organizational_unit_prefix, keyset_name
        )
    }
}
