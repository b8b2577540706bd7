//! Installation scope: user vs system.
//!
//! The scope is fixed for the process lifetime and selects which install
//! root, config directory, registry file, and catalog directories apply.

use std::path::PathBuf;

use anyhow::{Context, Result};
use sudo::RunningAs;

use crate::exec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    User,
    System,
}

impl Scope {
    pub fn is_system(&self) -> bool {
        matches!(self, Scope::System)
    }

    /// Prefix used for scope-qualified hook script names.
    pub fn hook_prefix(&self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::System => "system",
        }
    }

    /// Root directory packages are cloned into.
    pub fn apps_dir(&self) -> Result<PathBuf> {
        match self {
            Scope::System => Ok(PathBuf::from("/opt/apps")),
            Scope::User => Ok(dirs::data_dir()
                .context("unable to determine user data directory")?
                .join("apps")),
        }
    }

    /// Scope-private configuration directory.
    pub fn config_dir(&self) -> Result<PathBuf> {
        match self {
            Scope::System => Ok(PathBuf::from("/etc/gitpm")),
            Scope::User => Ok(dirs::config_dir()
                .context("unable to determine user config directory")?
                .join("gitpm")),
        }
    }

    /// Path of the installed-package registry for this scope.
    pub fn registry_path(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("installed.json"))
    }

    /// Directories scanned for catalog files, in precedence order.
    ///
    /// The system-wide xdg directory is always consulted; the scope's own
    /// config directory follows it.
    pub fn catalog_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut dirs = vec![PathBuf::from("/etc/xdg/gitpm")];
        dirs.push(self.config_dir()?);
        Ok(dirs)
    }

}

/// Whether the process runs with an elevated identity.
pub fn is_root() -> bool {
    matches!(sudo::check(), RunningAs::Root)
}

/// Whether passwordless sudo is available right now.
pub fn passwordless_sudo() -> bool {
    exec::run_captured("sudo", ["-n", "true"], None, exec::SUDO_TIMEOUT)
        .map(|out| out.success())
        .unwrap_or(false)
}

/// Whether missing host packages could be installed automatically.
pub fn can_install_system_packages(scope: Scope) -> bool {
    scope.is_system() || is_root() || passwordless_sudo()
}
