//! Creation strategies
//!
//! A keyset is either generated locally ([`GenerateStrategy`]) or, for the
//! reserved snakeoil name, cloned from a fixed reference repository
//! ([`CloneStrategy`]). The two differ in what they leave behind on failure;
//! see [`Rollback`].

use crate::bootkit::BootkitBuilder;
use crate::certificate_authority::{CertificateAuthority, KeysetSubject};
use crate::configs::AppConfig;
use crate::error::{KeysetError, Result};
use crate::orchestrator::Orchestrator;
use std::fs;
use std::path::Path;
use std::process::Command;

/// The one keyset name that is cloned instead of generated.
pub const SNAKEOIL_NAME: &str = "snakeoil";
/// Where the snakeoil keyset is cloned from.
pub const SNAKEOIL_URL: &str = "https://github.com/project-machine/keys.git";

/// What a strategy removes when creation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollback {
    /// The whole keyset tree is removed.
    Recursive,
    /// One removal attempt on the keyset path. A partially fetched,
    /// non-empty directory survives.
    BestEffortSingleEntry,
}

pub trait CreationStrategy {
    fn name(&self) -> &'static str;

    fn rollback(&self) -> Rollback;

    fn create(&self, keyset_name: &str, keyset_path: &Path, organization: &[String]) -> Result<()>;
}

/// Fetches a remote keyset into a local directory.
pub trait Fetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// `git clone` in a child process.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitFetcher;

impl Fetcher for GitFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        log::info!("cloning {} into {}", url, dest.display());
        let output = Command::new("git")
            .arg("clone")
            .arg("--quiet")
            .arg(url)
            .arg(dest)
            .output()
            .map_err(|e| KeysetError::Fetch(format!("Failed running git: {}", e)))?;
        if !output.status.success() {
            return Err(KeysetError::Fetch(format!(
                "git clone {} failed ({}): {}",
                url,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// The external collaborators a strategy may need.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub ca: &'a dyn CertificateAuthority,
    pub bootkit: &'a dyn BootkitBuilder,
    pub fetcher: &'a dyn Fetcher,
}

pub struct GenerateStrategy<'a> {
    orchestrator: Orchestrator<'a>,
    config: &'a AppConfig,
}

impl<'a> GenerateStrategy<'a> {
    pub fn new(config: &'a AppConfig, collaborators: Collaborators<'a>) -> Self {
        Self {
            orchestrator: Orchestrator::new(collaborators.ca, collaborators.bootkit),
            config,
        }
    }
}

impl CreationStrategy for GenerateStrategy<'_> {
    fn name(&self) -> &'static str {
        "generate"
    }

    fn rollback(&self) -> Rollback {
        Rollback::Recursive
    }

    fn create(&self, keyset_name: &str, keyset_path: &Path, organization: &[String]) -> Result<()> {
        let subject = KeysetSubject {
            organization: organization.to_vec(),
            organizational_unit: self.config.organizational_unit(keyset_name),
        };
        self.orchestrator.generate(keyset_name, keyset_path, &subject)
    }
}

pub struct CloneStrategy<'a> {
    fetcher: &'a dyn Fetcher,
    url: String,
}

impl<'a> CloneStrategy<'a> {
    pub fn new(url: impl Into<String>, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }
}

impl CreationStrategy for CloneStrategy<'_> {
    fn name(&self) -> &'static str {
        "clone"
    }

    fn rollback(&self) -> Rollback {
        Rollback::BestEffortSingleEntry
    }

    fn create(&self, keyset_name: &str, keyset_path: &Path, _organization: &[String]) -> Result<()> {
        if let Err(e) = self.fetcher.fetch(&self.url, keyset_path) {
            // Non-recursive on purpose; see Rollback::BestEffortSingleEntry.
            if fs::remove_dir(keyset_path)
                .or_else(|_| fs::remove_file(keyset_path))
                .is_err()
                && keyset_path.exists()
            {
                log::warn!(
                    "partial clone of {} left behind at {}",
                    keyset_name,
                    keyset_path.display()
                );
            }
            return Err(e);
        }
        log::info!("keyset {} cloned from {}", keyset_name, self.url);
        Ok(())
    }
}

/// Pick the strategy for `keyset_name`.
pub fn select_strategy<'a>(
    config: &'a AppConfig,
    keyset_name: &str,
    collaborators: Collaborators<'a>,
) -> Box<dyn CreationStrategy + 'a> {
    if keyset_name == SNAKEOIL_NAME {
        Box::new(CloneStrategy::new(SNAKEOIL_URL, collaborators.fetcher))
    } else {
        Box::new(GenerateStrategy::new(config, collaborators))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootkit::BootkitScript;
    use crate::certificate_authority::OpensslAuthority;
    use std::cell::RefCell;

    struct FailingFetcher {
        leave_file: bool,
        urls: RefCell<Vec<String>>,
    }

    impl Fetcher for FailingFetcher {
        fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
            self.urls.borrow_mut().push(url.to_string());
            fs::create_dir(dest).unwrap();
            if self.leave_file {
                fs::write(dest.join("README.md"), "partial").unwrap();
            }
            Err(KeysetError::Fetch("connection reset".into()))
        }
    }

    fn collaborators<'a>(
        bootkit: &'a BootkitScript,
        fetcher: &'a dyn Fetcher,
    ) -> Collaborators<'a> {
        Collaborators {
            ca: &OpensslAuthority,
            bootkit,
            fetcher,
        }
    }

    #[test]
    fn snakeoil_selects_clone() {
        let config = AppConfig::default();
        let bootkit = BootkitScript::new("true");
        let strategy = select_strategy(&config, "snakeoil", collaborators(&bootkit, &GitFetcher));
        assert_eq!(strategy.name(), "clone");
        assert_eq!(strategy.rollback(), Rollback::BestEffortSingleEntry);

        let strategy = select_strategy(&config, "prod", collaborators(&bootkit, &GitFetcher));
        assert_eq!(strategy.name(), "generate");
        assert_eq!(strategy.rollback(), Rollback::Recursive);
    }

    #[test]
    fn config_cannot_redirect_snakeoil() {
        let config: AppConfig = toml::from_str(
            r#"
            [keysets]
            snakeoil_name = "prod"
            snakeoil_url = "https://mirror.example/keys.git"
            "#,
        )
        .unwrap();
        let bootkit = BootkitScript::new("true");
        let fetcher = FailingFetcher {
            leave_file: false,
            urls: RefCell::default(),
        };
        let root = tempfile::tempdir().unwrap();

        let prod = select_strategy(&config, "prod", collaborators(&bootkit, &GitFetcher));
        assert_eq!(prod.name(), "generate");

        let snakeoil = select_strategy(&config, SNAKEOIL_NAME, collaborators(&bootkit, &fetcher));
        assert_eq!(snakeoil.name(), "clone");
        assert!(snakeoil
            .create(SNAKEOIL_NAME, &root.path().join(SNAKEOIL_NAME), &[])
            .is_err());
        assert_eq!(*fetcher.urls.borrow(), vec![SNAKEOIL_URL.to_string()]);
    }

    #[test]
    fn failed_clone_removes_empty_dir() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("snakeoil");
        let fetcher = FailingFetcher {
            leave_file: false,
            urls: RefCell::default(),
        };
        let err = CloneStrategy::new("https://example.invalid/keys.git", &fetcher)
            .create("snakeoil", &path, &[])
            .unwrap_err();
        assert!(matches!(err, KeysetError::Fetch(_)));
        assert!(!path.exists());
    }

    #[test]
    fn failed_clone_can_leave_residue() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("snakeoil");
        let fetcher = FailingFetcher {
            leave_file: true,
            urls: RefCell::default(),
        };
        assert!(CloneStrategy::new("https://example.invalid/keys.git", &fetcher)
            .create("snakeoil", &path, &[])
            .is_err());
        assert!(path.join("README.md").exists());
    }
}
