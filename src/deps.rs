//! Dependency resolution.
//!
//! Works out which host packages and which peer (gitpm-managed) packages
//! a manifest still needs, with alternative-group semantics: a group is
//! satisfied by any one member, and an unsatisfied group carries its full
//! candidate list forward so the caller can offer a choice.

use std::collections::BTreeMap;

use crate::error::GitpmError;
use crate::exec;
use crate::identity;
use crate::manifest::{self, DepRequirement, DistroSection, Manifest, PackageMapping};
use crate::registry::Registry;
use crate::scope::{self, Scope};

/// One `url[,branch[,name]]` dependency descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepDescriptor {
    pub name: String,
    pub url: String,
    pub branch: Option<String>,
}

impl DepDescriptor {
    pub fn parse(descriptor: &str) -> DepDescriptor {
        let mut fields = descriptor.split(',').map(str::trim);
        let url = fields.next().unwrap_or_default().to_string();
        let branch = fields.next().filter(|s| !s.is_empty()).map(String::from);
        let name = fields
            .next()
            .filter(|s| !s.is_empty())
            .map(String::from)
            .unwrap_or_else(|| identity::resolve(&url).repo);
        DepDescriptor { name, url, branch }
    }
}

/// A peer dependency that is not yet installed. `alternatives` always
/// holds at least one descriptor; more than one means the user gets a
/// choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerDep {
    pub alternatives: Vec<DepDescriptor>,
}

impl PeerDep {
    pub fn primary(&self) -> &DepDescriptor {
        &self.alternatives[0]
    }

    pub fn needs_choice(&self) -> bool {
        self.alternatives.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DependencyReport {
    pub missing_system: Vec<String>,
    pub missing_peers: Vec<PeerDep>,
    pub can_install_system: bool,
    pub install_method: Option<String>,
}

impl DependencyReport {
    pub fn satisfied(&self) -> bool {
        self.missing_system.is_empty() && self.missing_peers.is_empty()
    }
}

/// Resolve all dependencies of a manifest against the current host and
/// registry. Scope invariants short-circuit as fatal errors; everything
/// else is reported for the orchestrator to act on.
pub fn resolve(
    manifest: &Manifest,
    registry: &Registry,
    distro: &str,
    scope: Scope,
) -> Result<DependencyReport, GitpmError> {
    let mut report = DependencyReport::default();
    let mut violations: Vec<String> = Vec::new();

    if let Some(deps) = &manifest.dependencies {
        if let Some(system) = &deps.system {
            report.install_method = system.install_method(distro).map(String::from);
            report.missing_system = missing_system_packages(system, distro);
            if !report.missing_system.is_empty() {
                report.can_install_system = scope::can_install_system_packages(scope);
            }
        }

        for req in &deps.gitpm {
            let candidates: Vec<DepDescriptor> =
                req.candidates().iter().map(|d| DepDescriptor::parse(d)).collect();
            if candidates.is_empty() {
                continue;
            }
            match candidates.iter().find(|c| registry.contains(&c.name)) {
                Some(installed) => {
                    // The scope constraint of the found alternative
                    // propagates to this install
                    if !scope.is_system()
                        && let Some(record) = registry.get(&installed.name)
                        && let Ok(Some(dep_manifest)) = manifest::load(&record.path)
                        && dep_manifest.system_only
                    {
                        violations.push(installed.name.clone());
                    }
                }
                None => report.missing_peers.push(PeerDep { alternatives: candidates }),
            }
        }
    }

    if manifest.system_only && !scope.is_system() {
        return Err(GitpmError::Dependency(
            "this package requires system-wide installation (use --system flag)".to_string(),
        ));
    }

    if !violations.is_empty() && !scope.is_system() {
        return Err(GitpmError::Dependency(format!(
            "installed dependencies require system install: {}. This package must be installed with --system flag.",
            violations.join(", ")
        )));
    }

    Ok(report)
}

fn missing_system_packages(system: &manifest::SystemDeps, distro: &str) -> Vec<String> {
    let section = system.section(distro);
    let mut missing = Vec::new();

    // Probes only apply against a command table (or no section at all);
    // a legacy package list wins over them for its distro
    let use_probes = !system.check_commands.is_empty()
        && !matches!(section, Some(DistroSection::Packages(_)));

    if use_probes {
        // Current format: probe commands, then map the unsatisfied ones
        // to package names through the distro table
        let table = match section {
            Some(DistroSection::Commands(table)) => Some(table),
            _ => None,
        };
        for probe in &system.check_commands {
            let commands = probe.candidates();
            if commands.iter().any(|c| command_available(c)) {
                continue;
            }
            if let Some(primary) = commands.first() {
                missing.push(missing_package_for(primary, table));
            }
        }
    } else {
        match section {
            Some(DistroSection::Packages(packages)) => {
                // Legacy format: package names double as probe commands
                for entry in packages {
                    match entry {
                        DepRequirement::Single(pkg) => {
                            if !command_available(pkg) {
                                missing.push(pkg.clone());
                            }
                        }
                        DepRequirement::Alternatives(group) => {
                            if !group.iter().any(|p| command_available(p)) {
                                missing.push(format!("({})", group.join(" or ")));
                            }
                        }
                    }
                }
            }
            Some(DistroSection::Commands(table)) => {
                // Command table without probes: check the mapped names
                for mapping in table.values() {
                    if let PackageMapping::Single(pkg) = mapping
                        && !command_available(pkg)
                    {
                        missing.push(pkg.clone());
                    }
                }
            }
            None => {}
        }
    }

    missing
}

fn missing_package_for(
    command: &str,
    table: Option<&BTreeMap<String, PackageMapping>>,
) -> String {
    table
        .and_then(|t| t.get(command))
        .and_then(|m| m.primary())
        .map(str::to_string)
        .unwrap_or_else(|| command.to_string())
}

/// Package names as handed to the install-method command: alternative
/// groups reduce to their first member, parens are stripped, duplicates
/// collapse.
pub fn installable_package_names(missing: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for entry in missing {
        let stripped = entry.trim_matches(|c| c == '(' || c == ')');
        let first = stripped.split(" or ").next().unwrap_or(stripped).trim();
        if !first.is_empty() && !names.iter().any(|n| n == first) {
            names.push(first.to_string());
        }
    }
    names
}

/// Whether a command is present on the host: running `<cmd> -v` succeeds,
/// or it exits non-zero while printing something version-shaped to
/// stderr, or a PATH lookup finds it.
pub fn command_available(command: &str) -> bool {
    match exec::run_captured(command, ["-v"], None, exec::PROBE_TIMEOUT) {
        Ok(out) => {
            if out.success() {
                return true;
            }
            if !out.timed_out && out.stderr.to_lowercase().contains("version") {
                return true;
            }
            which::which(command).is_ok()
        }
        Err(_) => which::which(command).is_ok(),
    }
}
