pub mod install;
pub mod list;
pub mod remove;
pub mod update;

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::distro;
use crate::scope::Scope;

/// Resolved per-invocation context: the scope's paths are computed once
/// and carried explicitly through every operation.
pub struct Session {
    pub scope: Scope,
    pub distro: String,
    pub apps_dir: PathBuf,
    pub catalog_dirs: Vec<PathBuf>,
    pub registry_path: PathBuf,
}

impl Session {
    pub fn new(scope: Scope) -> Result<Self> {
        Ok(Session {
            scope,
            distro: distro::detect(),
            apps_dir: scope.apps_dir()?,
            catalog_dirs: scope.catalog_dirs()?,
            registry_path: scope.registry_path()?,
        })
    }

    /// Create the install root and registry directory if missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.apps_dir)
            .with_context(|| format!("creating install directory at {}", self.apps_dir.display()))?;
        if let Some(parent) = self.registry_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory at {}", parent.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::fs;
    use std::path::{Path, PathBuf};

    use super::Session;
    use crate::exec;
    use crate::scope::Scope;

    pub fn git_in(dir: &Path, args: &[&str]) {
        let out = exec::run_captured("git", args.to_vec(), Some(dir), exec::GIT_SYNC_TIMEOUT)
            .unwrap();
        assert!(out.success(), "git {args:?} failed: {}", out.stderr);
    }

    /// Create a committed origin repository carrying a compatibility
    /// marker plus the given files.
    pub fn make_origin(base: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let repo = base.join(name);
        fs::create_dir_all(&repo).unwrap();
        git_in(&repo, &["init", "-q"]);
        git_in(&repo, &["config", "user.email", "test@example.com"]);
        git_in(&repo, &["config", "user.name", "Test"]);
        fs::write(repo.join(".gitpm"), "").unwrap();
        for (path, content) in files {
            let full = repo.join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(full, content).unwrap();
        }
        git_in(&repo, &["add", "-A"]);
        git_in(&repo, &["commit", "-q", "-m", "init"]);
        repo
    }

    pub fn commit_all(repo: &Path, message: &str) {
        git_in(repo, &["add", "-A"]);
        git_in(repo, &["commit", "-q", "-m", message]);
    }

    /// Session rooted entirely in a scratch directory.
    pub fn make_session(base: &Path) -> Session {
        let catalog_dir = base.join("config");
        fs::create_dir_all(&catalog_dir).unwrap();
        Session {
            scope: Scope::User,
            distro: "Arch".to_string(),
            apps_dir: base.join("apps"),
            catalog_dirs: vec![catalog_dir.clone()],
            registry_path: catalog_dir.join("installed.json"),
        }
    }

    pub fn add_catalog_line(session: &Session, line: &str) {
        let path = session.catalog_dirs[0].join("repos.conf");
        let mut content = fs::read_to_string(&path).unwrap_or_default();
        content.push_str(line);
        content.push('\n');
        fs::write(path, content).unwrap();
    }
}
