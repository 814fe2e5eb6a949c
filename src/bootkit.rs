//! Bootkit Invoker
//!
//! The bootkit is built by an external script from a finished keyset. It is run
//! once per keyset creation with `<keyset-name> <keyset-path> <product>`.

use crate::error::{KeysetError, Result};
use std::path::Path;
use std::process::Command;

/// Product name used when bootstrapping a new keyset.
pub const DEFAULT_PRODUCT: &str = "default";

pub trait BootkitBuilder {
    fn build(&self, keyset_name: &str, keyset_path: &Path, product: &str) -> Result<()>;
}

/// Runs the configured bootkit command as a child process.
#[derive(Debug, Clone)]
pub struct BootkitScript {
    command: String,
}

impl BootkitScript {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl BootkitBuilder for BootkitScript {
    fn build(&self, keyset_name: &str, keyset_path: &Path, product: &str) -> Result<()> {
        log::info!(
            "running {} {} {} {}",
            self.command,
            keyset_name,
            keyset_path.display(),
            product
        );
        let output = Command::new(&self.command)
            .arg(keyset_name)
            .arg(keyset_path)
            .arg(product)
            .output()
            .map_err(|e| {
                KeysetError::ExternalTool(format!("Failed running {}: {}", self.command, e))
            })?;

        if !output.status.success() {
            return Err(KeysetError::ExternalTool(format!(
                "Failed running {} ({}):\nstderr: {}\nstdout: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr),
                String::from_utf8_lossy(&output.stdout)
            )));
        }
        Ok(())
    }
}
