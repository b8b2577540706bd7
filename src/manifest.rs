//! Per-repository manifest (`gitpm.json` / `.gitpm.json`).
//!
//! The manifest's historically loose "string or array" fields are decided
//! once at parse time into tagged unions, so the resolver never probes
//! JSON types at runtime.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::slice;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::GitpmError;

/// Manifest filenames, checked in order; the first existing one wins and
/// there is no fallback if it fails to parse.
pub const MANIFEST_FILES: [&str; 2] = ["gitpm.json", ".gitpm.json"];

/// Any of these in a repository root marks it as gitpm-compatible.
pub const MARKER_FILES: [&str; 3] = [".gitpm", "gitpm.json", ".gitpm.json"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub system_only: bool,
    #[serde(default)]
    pub dependencies: Option<Dependencies>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dependencies {
    #[serde(default)]
    pub system: Option<SystemDeps>,
    #[serde(default)]
    pub gitpm: Vec<DepRequirement>,
}

/// A single dependency or a group of mutually substitutable alternatives.
///
/// For system dependencies the strings are command/package names; for
/// gitpm dependencies they are `url[,branch[,name]]` descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DepRequirement {
    Single(String),
    Alternatives(Vec<String>),
}

impl DepRequirement {
    pub fn candidates(&self) -> &[String] {
        match self {
            DepRequirement::Single(s) => slice::from_ref(s),
            DepRequirement::Alternatives(v) => v,
        }
    }

    /// True when the entry offers a real choice.
    pub fn is_group(&self) -> bool {
        matches!(self, DepRequirement::Alternatives(v) if v.len() > 1)
    }
}

/// Value side of a distro's command-to-package table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PackageMapping {
    Single(String),
    Choices(Vec<String>),
}

impl PackageMapping {
    /// First-listed package name; choices contribute only their head.
    pub fn primary(&self) -> Option<&str> {
        match self {
            PackageMapping::Single(s) => Some(s),
            PackageMapping::Choices(v) => v.first().map(String::as_str),
        }
    }
}

/// Per-distro dependency declaration: either the legacy flat package
/// list, or the command-to-package table paired with `check_commands`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DistroSection {
    Packages(Vec<DepRequirement>),
    Commands(BTreeMap<String, PackageMapping>),
}

/// System-dependency block. Distro tables and `<distro>_method` install
/// templates share the same JSON namespace, so this has a hand-rolled
/// deserializer that partitions them up front.
#[derive(Debug, Clone, Default)]
pub struct SystemDeps {
    pub method: Option<String>,
    pub check_commands: Vec<DepRequirement>,
    pub distro_methods: BTreeMap<String, String>,
    pub distro_sections: BTreeMap<String, DistroSection>,
}

impl SystemDeps {
    /// Install command template: the global method, else the distro one.
    pub fn install_method(&self, distro: &str) -> Option<&str> {
        self.method
            .as_deref()
            .or_else(|| self.distro_methods.get(distro).map(String::as_str))
    }

    pub fn section(&self, distro: &str) -> Option<&DistroSection> {
        self.distro_sections.get(distro)
    }
}

impl<'de> Deserialize<'de> for SystemDeps {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            method: Option<String>,
            #[serde(default)]
            check_commands: Vec<DepRequirement>,
            #[serde(flatten)]
            rest: BTreeMap<String, Value>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let mut distro_methods = BTreeMap::new();
        let mut distro_sections = BTreeMap::new();

        for (key, value) in raw.rest {
            if let Some(distro) = key.strip_suffix("_method") {
                if let Value::String(cmd) = value {
                    distro_methods.insert(distro.to_string(), cmd);
                }
                continue;
            }
            // Remaining keys are distro tables; unrecognized shapes are
            // ignored rather than rejected, matching the file format's
            // tolerance for annotation fields.
            if let Ok(section) = serde_json::from_value::<DistroSection>(value) {
                distro_sections.insert(key, section);
            }
        }

        Ok(SystemDeps {
            method: raw.method,
            check_commands: raw.check_commands,
            distro_methods,
            distro_sections,
        })
    }
}

/// Load the manifest from a repository root.
///
/// Absence is `Ok(None)`. A manifest that exists but does not parse is a
/// hard error; the second filename is not consulted once the first
/// exists.
pub fn load(repo_path: &Path) -> Result<Option<Manifest>, GitpmError> {
    for file in MANIFEST_FILES {
        let path = repo_path.join(file);
        if path.is_file() {
            let content = fs::read_to_string(&path)
                .map_err(|e| GitpmError::Manifest(format!("error reading {file}: {e}")))?;
            let manifest = serde_json::from_str(&content)
                .map_err(|e| GitpmError::Manifest(format!("invalid JSON in {file}: {e}")))?;
            return Ok(Some(manifest));
        }
    }
    Ok(None)
}

/// Whether the repository root carries any compatibility marker.
pub fn has_marker(repo_path: &Path) -> bool {
    MARKER_FILES.iter().any(|m| repo_path.join(m).is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Manifest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn empty_manifest_means_no_constraints() {
        let m = parse("{}");
        assert!(!m.system_only);
        assert!(m.dependencies.is_none());
    }

    #[test]
    fn check_commands_format_parses_into_tagged_unions() {
        let m = parse(
            r#"{
                "system_only": true,
                "dependencies": {
                    "system": {
                        "method": "sudo pacman -S --noconfirm",
                        "Debian_method": "sudo apt install -y",
                        "check_commands": ["curl", ["docker", "podman"]],
                        "Arch": {"curl": "curl", "docker": ["docker", "docker-git"]},
                        "Debian": {"curl": "curl", "docker": "docker.io"}
                    }
                }
            }"#,
        );
        assert!(m.system_only);
        let sys = m.dependencies.unwrap().system.unwrap();
        assert_eq!(sys.check_commands.len(), 2);
        assert_eq!(sys.check_commands[0], DepRequirement::Single("curl".into()));
        assert!(sys.check_commands[1].is_group());

        assert_eq!(sys.install_method("Arch"), Some("sudo pacman -S --noconfirm"));
        let Some(DistroSection::Commands(table)) = sys.section("Arch") else {
            panic!("expected command table");
        };
        assert_eq!(table["docker"].primary(), Some("docker"));
    }

    #[test]
    fn distro_method_applies_when_global_method_is_absent() {
        let m = parse(
            r#"{"dependencies": {"system": {"Debian_method": "sudo apt install -y", "Debian": ["curl"]}}}"#,
        );
        let sys = m.dependencies.unwrap().system.unwrap();
        assert_eq!(sys.install_method("Debian"), Some("sudo apt install -y"));
        assert_eq!(sys.install_method("Arch"), None);
    }

    #[test]
    fn legacy_flat_list_parses_with_alternative_groups() {
        let m = parse(
            r#"{"dependencies": {"system": {"Arch": ["curl", ["docker", "podman"]]}}}"#,
        );
        let sys = m.dependencies.unwrap().system.unwrap();
        let Some(DistroSection::Packages(pkgs)) = sys.section("Arch") else {
            panic!("expected legacy list");
        };
        assert_eq!(pkgs[0], DepRequirement::Single("curl".into()));
        assert_eq!(pkgs[1].candidates(), ["docker".to_string(), "podman".to_string()]);
    }

    #[test]
    fn gitpm_deps_accept_single_and_alternative_entries() {
        let m = parse(
            r#"{"dependencies": {"gitpm": [
                "https://x/a.git,,a",
                ["https://x/b.git,,b", "https://x/c.git,,c"]
            ]}}"#,
        );
        let deps = m.dependencies.unwrap().gitpm;
        assert_eq!(deps.len(), 2);
        assert!(!deps[0].is_group());
        assert_eq!(deps[1].candidates().len(), 2);
    }

    #[test]
    fn load_prefers_first_filename_and_fails_hard_on_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("gitpm.json"), "{not json").unwrap();
        std::fs::write(dir.path().join(".gitpm.json"), "{}").unwrap();
        // No fallback to the second file once the first exists
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, GitpmError::Manifest(_)));
        assert!(err.to_string().contains("gitpm.json"));
    }

    #[test]
    fn load_of_absent_manifest_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn hidden_manifest_is_found_when_primary_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitpm.json"), r#"{"system_only": true}"#).unwrap();
        let m = load(dir.path()).unwrap().unwrap();
        assert!(m.system_only);
    }

    #[test]
    fn markers_signal_compatibility() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!has_marker(dir.path()));
        std::fs::write(dir.path().join(".gitpm"), "").unwrap();
        assert!(has_marker(dir.path()));
    }
}
