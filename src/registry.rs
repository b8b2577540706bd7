//! Installed-package registry: one flat JSON file per scope mapping
//! install names to their installation records.
//!
//! Loading is forgiving (a missing or corrupt file is an empty registry,
//! so a first run never fails); persisting is atomic via write-to-temp
//! plus rename, so a crash can never truncate the file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledRecord {
    pub name: String,
    pub url: String,
    #[serde(rename = "user")]
    pub owner: String,
    pub repo_name: String,
    pub branch: Option<String>,
    pub path: PathBuf,
    pub setup_script: Option<PathBuf>,
    pub remove_script: Option<PathBuf>,
    pub update_script: Option<PathBuf>,
    pub check_script: Option<PathBuf>,
}

#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    entries: BTreeMap<String, InstalledRecord>,
}

impl Registry {
    /// Load the registry for the given file, tolerating absence and
    /// invalid content.
    pub fn load(path: PathBuf) -> Self {
        let entries = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        Registry { path, entries }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&InstalledRecord> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut InstalledRecord> {
        self.entries.get_mut(name)
    }

    pub fn insert(&mut self, record: InstalledRecord) {
        self.entries.insert(record.name.clone(), record);
    }

    pub fn remove(&mut self, name: &str) -> Option<InstalledRecord> {
        self.entries.remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &InstalledRecord)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the registry to disk atomically.
    pub fn persist(&self) -> Result<()> {
        let parent = self
            .path
            .parent()
            .context("registry path has no parent directory")?;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating registry directory {}", parent.display()))?;

        let mut tmp = NamedTempFile::new_in(parent)
            .context("creating temporary registry file")?;
        serde_json::to_writer_pretty(&mut tmp, &self.entries)
            .context("serializing registry")?;
        tmp.write_all(b"\n").context("finalizing registry")?;
        tmp.persist(&self.path)
            .with_context(|| format!("replacing registry at {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn record(name: &str, path: &Path) -> InstalledRecord {
        InstalledRecord {
            name: name.to_string(),
            url: format!("https://example.com/acme/{name}.git"),
            owner: "acme".to_string(),
            repo_name: name.to_string(),
            branch: None,
            path: path.to_path_buf(),
            setup_script: None,
            remove_script: None,
            update_script: None,
            check_script: None,
        }
    }

    #[test]
    fn absent_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::load(dir.path().join("installed.json"));
        assert!(registry.is_empty());
    }

    #[test]
    fn corrupt_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installed.json");
        std::fs::write(&path, "{{{ nope").unwrap();
        assert!(Registry::load(path).is_empty());
    }

    #[test]
    fn persist_then_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installed.json");

        let mut registry = Registry::load(path.clone());
        registry.insert(record("tool", &dir.path().join("apps/tool")));
        registry.persist().unwrap();

        let reloaded = Registry::load(path);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("tool").unwrap().owner, "acme");
    }

    #[test]
    fn persisted_json_uses_the_user_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installed.json");
        let mut registry = Registry::load(path.clone());
        registry.insert(record("tool", dir.path()));
        registry.persist().unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"user\": \"acme\""));
    }

    #[test]
    fn remove_deletes_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::load(dir.path().join("installed.json"));
        registry.insert(record("tool", dir.path()));
        assert!(registry.remove("tool").is_some());
        assert!(registry.remove("tool").is_none());
        assert!(!registry.contains("tool"));
    }

    #[test]
    fn persist_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config/installed.json");
        let mut registry = Registry::load(path.clone());
        registry.insert(record("tool", dir.path()));
        registry.persist().unwrap();
        assert!(path.exists());
    }
}
