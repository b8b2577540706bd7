use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;

/// Isolated environment for driving the gitpm binary: a scratch HOME
/// with its own config, data, and repository directories.
pub struct TestEnvironment {
    root: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let root = tempfile::tempdir()?;
        let env = TestEnvironment { root };
        fs::create_dir_all(env.config_dir())?;
        fs::create_dir_all(env.data_dir())?;
        fs::create_dir_all(env.repos_dir())?;
        Ok(env)
    }

    /// Fake home directory handed to the binary.
    pub fn home(&self) -> &Path {
        self.root.path()
    }

    pub fn config_dir(&self) -> PathBuf {
        self.home().join(".config")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.home().join(".local/share")
    }

    /// Where origin repositories for tests are created.
    pub fn repos_dir(&self) -> PathBuf {
        self.home().join("origins")
    }

    /// The user-scope catalog file inside the fake home.
    pub fn catalog_path(&self) -> PathBuf {
        self.config_dir().join("gitpm/repos.conf")
    }

    /// The user-scope registry file inside the fake home.
    pub fn registry_path(&self) -> PathBuf {
        self.config_dir().join("gitpm/installed.json")
    }

    /// The install root used by user-scope operations.
    pub fn apps_dir(&self) -> PathBuf {
        self.data_dir().join("apps")
    }

    /// Append a line to the catalog, creating it if needed.
    pub fn add_catalog_line(&self, line: &str) -> Result<()> {
        let path = self.catalog_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut content = fs::read_to_string(&path).unwrap_or_default();
        content.push_str(line);
        content.push('\n');
        fs::write(path, content)?;
        Ok(())
    }
}
