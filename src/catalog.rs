//! Source catalog: the set of repositories packages can be installed from.
//!
//! Catalogs are line-oriented `repos*.conf` files, one source per line in
//! `url[,branch[,name]]` form, aggregated from the system xdg directory
//! and the scope's own config directory.

use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::error::GitpmError;
use crate::identity;

pub const DEFAULT_CATALOG: &str = "repos.conf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub url: String,
    pub branch: Option<String>,
    pub name: Option<String>,
    /// Label of the catalog file this entry came from.
    pub origin: String,
}

impl SourceEntry {
    /// Parse one catalog line. Comments, blank lines, and lines with an
    /// empty URL field yield `None`.
    pub fn parse_line(line: &str, origin: &str) -> Option<SourceEntry> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let mut fields = line.split(',').map(str::trim);
        let url = fields.next().unwrap_or_default();
        if url.is_empty() {
            return None;
        }
        let branch = fields.next().filter(|s| !s.is_empty()).map(String::from);
        let name = fields.next().filter(|s| !s.is_empty()).map(String::from);
        Some(SourceEntry {
            url: url.to_string(),
            branch,
            name,
            origin: origin.to_string(),
        })
    }

    /// Serialize back to catalog line form.
    pub fn to_line(&self) -> String {
        match (&self.branch, &self.name) {
            (None, None) => self.url.clone(),
            (Some(b), None) => format!("{},{}", self.url, b),
            (None, Some(n)) => format!("{},,{}", self.url, n),
            (Some(b), Some(n)) => format!("{},{},{}", self.url, b, n),
        }
    }

    /// Name this entry is addressed by: the declared name if present,
    /// otherwise the repository name derived from the URL.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| identity::resolve(&self.url).repo)
    }
}

/// Provenance label for a catalog file; files under /etc are tagged.
fn source_label(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    if path.starts_with("/etc") {
        format!("[system]{file_name}")
    } else {
        file_name
    }
}

/// Collect catalog files from one directory: the `repos*.conf` glob in
/// lexical order, with the default `repos.conf` appended if the glob
/// missed it.
fn files_in_dir(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if !dir.exists() {
        return files;
    }
    let pattern = dir.join("repos*.conf");
    if let Ok(paths) = glob::glob(&pattern.to_string_lossy()) {
        let mut found: Vec<PathBuf> = paths.filter_map(|p| p.ok()).collect();
        found.sort();
        files.extend(found);
    }
    let default = dir.join(DEFAULT_CATALOG);
    if default.exists() && !files.contains(&default) {
        files.push(default);
    }
    files
}

/// All catalog files for the given directories, in precedence order.
/// No files at all is a hard error; the caller prints setup guidance.
pub fn collect_files(dirs: &[PathBuf]) -> Result<Vec<PathBuf>, GitpmError> {
    let files: Vec<PathBuf> = dirs.iter().flat_map(|d| files_in_dir(d)).collect();
    if files.is_empty() {
        return Err(GitpmError::NoCatalogs);
    }
    Ok(files)
}

/// Load entries from an explicit directory list (catalog directories in
/// precedence order). An unreadable file is a warning, not a failure.
pub fn load_from_dirs(dirs: &[PathBuf]) -> Result<Vec<SourceEntry>, GitpmError> {
    let files = collect_files(dirs)?;
    let mut entries = Vec::new();
    for file in &files {
        let label = source_label(file);
        match fs::read_to_string(file) {
            Ok(content) => {
                entries.extend(
                    content
                        .lines()
                        .filter_map(|line| SourceEntry::parse_line(line, &label)),
                );
            }
            Err(e) => {
                eprintln!(
                    "{} could not read catalog file {}: {e}",
                    "Warning:".yellow(),
                    file.display()
                );
            }
        }
    }
    Ok(entries)
}

/// Find all catalog entries matching a package name, case-insensitively.
pub fn find_by_name(entries: &[SourceEntry], name: &str) -> Vec<SourceEntry> {
    let wanted = name.to_lowercase();
    entries
        .iter()
        .filter(|e| e.display_name().to_lowercase() == wanted)
        .cloned()
        .collect()
}
