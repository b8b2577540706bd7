//! Package installation.
//!
//! Drives the full install protocol: catalog match, remote verification,
//! compatibility check, clone, branch resolution, dependency resolution
//! (recursing into peer installs), setup hook, registration. Any fatal
//! failure after the clone exists removes the clone again, so a failed
//! install leaves no orphaned directory behind.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use colored::Colorize;

use super::Session;
use crate::catalog::{self, SourceEntry};
use crate::deps::{self, DepDescriptor};
use crate::error::GitpmError;
use crate::exec;
use crate::git;
use crate::hooks;
use crate::identity;
use crate::manifest::{self, MARKER_FILES, Manifest};
use crate::progress;
use crate::prompt::{self, Candidate, Decider};
use crate::registry::{InstalledRecord, Registry};
use crate::remote;

pub fn install(session: &Session, name: &str, force: bool, decider: &dyn Decider) -> Result<()> {
    session.ensure_dirs()?;
    let mut registry = Registry::load(session.registry_path.clone());
    let mut in_progress = HashSet::new();
    install_inner(
        session,
        &mut registry,
        name,
        force,
        false,
        &mut in_progress,
        decider,
    )
}

/// Removes the clone directory on drop unless the install completed.
struct CloneGuard {
    path: PathBuf,
    armed: bool,
}

impl CloneGuard {
    fn new(path: &Path) -> Self {
        CloneGuard {
            path: path.to_path_buf(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CloneGuard {
    fn drop(&mut self) {
        if self.armed && self.path.exists() {
            match std::fs::remove_dir_all(&self.path) {
                Ok(()) => eprintln!("Cleaned up cloned directory: {}", self.path.display()),
                Err(e) => eprintln!(
                    "{} could not clean up directory {}: {e}",
                    "Warning:".yellow(),
                    self.path.display()
                ),
            }
        }
    }
}

fn install_inner(
    session: &Session,
    registry: &mut Registry,
    name: &str,
    force: bool,
    skip_dependency_check: bool,
    in_progress: &mut HashSet<String>,
    decider: &dyn Decider,
) -> Result<()> {
    if !in_progress.insert(name.to_lowercase()) {
        return Err(GitpmError::Dependency(format!(
            "circular dependency detected while resolving '{name}'"
        ))
        .into());
    }

    let entries = catalog::load_from_dirs(&session.catalog_dirs)?;
    let matches = catalog::find_by_name(&entries, name);
    if matches.is_empty() {
        bail!("no repository found with name '{name}'");
    }

    let selection = prompt::choose(
        decider,
        &format!("Multiple repositories found with name '{name}'. Select one"),
        &source_candidates(&matches),
    )
    .ok_or_else(|| anyhow!("installation cancelled"))?;
    let selected = matches[selection].clone();

    let id = identity::resolve(&selected.url);
    let install_name = selected.display_name();
    let branch = selected.branch.clone();
    let repo_path = session.apps_dir.join(&install_name);

    if let Some(existing_path) = registry.get(&install_name).map(|r| r.path.clone()) {
        println!(
            "'{install_name}' is already installed at {}",
            existing_path.display()
        );
        if !decider.confirm("Reinstall?") {
            bail!("installation cancelled");
        }
        // Replace the old installation without running its remove hook
        super::remove::remove_existing(session, registry, &install_name, true)?;
    }

    println!("Verifying repository {}...", selected.url);
    remote::verify_reachable(&selected.url, branch.as_deref())?;
    match &branch {
        Some(b) => println!("Repository verified (branch: {b})"),
        None => println!("Repository verified"),
    }

    if !force {
        println!("Checking repository compatibility...");
        if let Err(e) = remote::verify_compatible(&selected.url, branch.as_deref()) {
            eprintln!(
                "To make a repository compatible with gitpm, add one of these marker files to the root:"
            );
            for marker in MARKER_FILES {
                eprintln!("  - {marker}");
            }
            eprintln!("Use --force to skip the compatibility check and install anyway.");
            return Err(e.into());
        }
        println!("Repository is compatible with gitpm");
    }

    let preexisting = repo_path.exists();
    let pb = progress::create_spinner(format!("Cloning {}...", selected.url));
    match git::clone(&selected.url, &repo_path) {
        Ok(_) => progress::finish_spinner_with_success(
            pb,
            format!("Cloned {} to {}", selected.url, repo_path.display()),
        ),
        Err(e) => {
            progress::finish_spinner_silent(pb);
            // A failed clone can leave a partial directory behind, but a
            // directory that was already there is not ours to delete
            if !preexisting && repo_path.exists() {
                let _ = std::fs::remove_dir_all(&repo_path);
            }
            return Err(e);
        }
    }
    let mut guard = CloneGuard::new(&repo_path);

    if let Some(b) = &branch {
        println!("Checking out branch '{b}'...");
        resolve_branch(&repo_path, b);
    }

    if !skip_dependency_check {
        println!("Checking dependencies...");
        let loaded = manifest::load(&repo_path)?;
        if let Some(pkg_manifest) = loaded {
            resolve_and_install_deps(
                session,
                registry,
                &pkg_manifest,
                in_progress,
                decider,
            )?;
        }
        println!("All dependencies satisfied");
    }

    let hook_set = hooks::discover(&repo_path, session.scope);
    if let Some(setup) = &hook_set.setup {
        println!("Running setup script: {}", setup.display());
        if !hooks::execute(setup, &repo_path) {
            eprintln!(
                "{} setup script failed, but repository was cloned.",
                "Warning:".yellow()
            );
        }
    }

    registry.insert(InstalledRecord {
        name: install_name.clone(),
        url: selected.url.clone(),
        owner: id.owner,
        repo_name: id.repo,
        branch: branch.clone(),
        path: repo_path.clone(),
        setup_script: hook_set.setup,
        remove_script: hook_set.remove,
        update_script: hook_set.update,
        check_script: hook_set.check,
    });
    registry.persist()?;
    guard.disarm();

    match &branch {
        Some(b) => println!("Successfully installed '{install_name}' (branch: {b})"),
        None => println!("Successfully installed '{install_name}'"),
    }
    Ok(())
}

fn source_candidates(matches: &[SourceEntry]) -> Vec<Candidate> {
    matches
        .iter()
        .map(|entry| {
            let id = identity::resolve(&entry.url);
            let name = entry.display_name();
            Candidate {
                label: match &entry.branch {
                    Some(b) => format!("{}/{name} [branch: {b}]", id.owner),
                    None => format!("{}/{name}", id.owner),
                },
                detail: entry.url.clone(),
            }
        })
        .collect()
}

/// Checkout precedence for a declared branch: local branch, then remote
/// tracking branch, then a direct checkout, then an explicit tracking
/// branch creation. Every failure here is a warning; installation
/// continues on whatever branch results.
fn resolve_branch(repo_path: &Path, branch: &str) {
    let _ = git::fetch_origin(repo_path);
    let has_local = git::branch_exists_local(repo_path, branch);
    let has_remote = git::branch_exists_remote(repo_path, branch);

    let result = if has_local {
        git::checkout(repo_path, branch)
    } else if has_remote {
        git::checkout_track(repo_path, branch)
    } else {
        match git::checkout(repo_path, branch) {
            Ok(out) if out.success() => Ok(out),
            _ => git::checkout_new_tracking(repo_path, branch),
        }
    };

    match result {
        Ok(out) if out.success() => println!("Checked out branch '{branch}'"),
        result => {
            let current =
                git::current_branch(repo_path).unwrap_or_else(|| "unknown".to_string());
            eprintln!(
                "{} could not checkout branch '{branch}' (branch may not exist)",
                "Warning:".yellow()
            );
            eprintln!("         remaining on branch: {current}");
            if let Ok(out) = result {
                let combined = format!("{}\n{}", out.stdout, out.stderr);
                if let Some(line) = combined.lines().find(|l| {
                    let l = l.to_lowercase();
                    l.contains("fatal") || l.contains("error")
                }) {
                    eprintln!("         git message: {line}");
                }
            }
        }
    }
}

fn resolve_and_install_deps(
    session: &Session,
    registry: &mut Registry,
    pkg_manifest: &Manifest,
    in_progress: &mut HashSet<String>,
    decider: &dyn Decider,
) -> Result<()> {
    let mut report = deps::resolve(pkg_manifest, registry, &session.distro, session.scope)?;
    if report.satisfied() {
        return Ok(());
    }

    println!("Missing dependencies detected:");
    if !report.missing_system.is_empty() {
        println!("  System packages: {}", report.missing_system.join(", "));
    }
    if !report.missing_peers.is_empty() {
        let names: Vec<&str> = report
            .missing_peers
            .iter()
            .map(|p| p.primary().name.as_str())
            .collect();
        println!("  GitPM packages: {}", names.join(", "));
    }

    if !report.missing_system.is_empty() && report.can_install_system {
        if let Some(method) = report.install_method.clone() {
            println!("Attempting to install missing system packages...");
            if install_system_packages(&report.missing_system, &method) {
                report = deps::resolve(pkg_manifest, registry, &session.distro, session.scope)?;
            } else {
                eprintln!(
                    "{} failed to install system packages. Please install them manually.",
                    "Warning:".yellow()
                );
            }
        }
    }

    let peers = report.missing_peers.clone();
    if !peers.is_empty() {
        let names: Vec<&str> = peers.iter().map(|p| p.primary().name.as_str()).collect();
        println!("Installing missing GitPM dependencies: {}", names.join(", "));

        for peer in &peers {
            let chosen: DepDescriptor = if peer.needs_choice() {
                let candidates: Vec<Candidate> = peer
                    .alternatives
                    .iter()
                    .map(|alt| {
                        let id = identity::resolve(&alt.url);
                        Candidate {
                            label: match &alt.branch {
                                Some(b) => format!("{}/{} [branch: {b}]", id.owner, alt.name),
                                None => format!("{}/{}", id.owner, alt.name),
                            },
                            detail: alt.url.clone(),
                        }
                    })
                    .collect();
                let idx = prompt::choose(
                    decider,
                    "Multiple alternatives available for dependency. Choose one",
                    &candidates,
                )
                .ok_or_else(|| anyhow!("no alternative selected for dependency"))?;
                peer.alternatives[idx].clone()
            } else {
                peer.primary().clone()
            };

            // A system-only dependency cannot be pulled into a user-scope
            // install; probe its manifest before recursing
            if !session.scope.is_system()
                && remote::probe_system_only(&chosen.url, chosen.branch.as_deref()) == Some(true)
            {
                eprintln!(
                    "Install this package with --system, or install '{}' as system first",
                    chosen.name
                );
                return Err(GitpmError::Dependency(format!(
                    "dependency '{}' requires system-wide installation",
                    chosen.name
                ))
                .into());
            }

            println!("Installing dependency: {}", chosen.name);
            // The dependency's own dependency check is skipped; its
            // compatibility check is not
            install_inner(
                session,
                registry,
                &chosen.name,
                false,
                true,
                in_progress,
                decider,
            )
            .with_context(|| format!("failed to install dependency '{}'", chosen.name))?;
        }

        report = deps::resolve(pkg_manifest, registry, &session.distro, session.scope)?;
    }

    if !report.missing_system.is_empty() {
        if !report.can_install_system {
            eprintln!("Missing system packages and no way to install them (no sudo access)");
            eprintln!("Please install the following packages manually:");
            for pkg in &report.missing_system {
                eprintln!("  - {pkg}");
            }
            return Err(GitpmError::Dependency(
                "missing system packages and cannot install them".to_string(),
            )
            .into());
        }
        return Err(
            GitpmError::Dependency("some system packages could not be installed".to_string())
                .into(),
        );
    }

    Ok(())
}

/// Hand the missing package names to the distro's opaque install-method
/// command. Any failure to run the command counts as a failed install.
fn install_system_packages(missing: &[String], method: &str) -> bool {
    let packages = deps::installable_package_names(missing);
    if packages.is_empty() {
        return true;
    }

    let mut argv = match shell_words::split(method) {
        Ok(argv) if !argv.is_empty() => argv,
        _ => {
            eprintln!("{} invalid install method command: {method}", "Error:".red());
            return false;
        }
    };
    argv.extend(packages);
    println!("Running: {}", argv.join(" "));

    let program = argv.remove(0);
    match exec::run_captured(&program, argv, None, exec::LONG_TIMEOUT) {
        Ok(out) => {
            if !out.stdout.is_empty() {
                print!("{}", out.stdout);
            }
            if out.timed_out {
                eprintln!("{} package installation timed out", "Error:".red());
                return false;
            }
            if !out.success() && !out.stderr.is_empty() {
                eprint!("{}", out.stderr);
            }
            out.success()
        }
        Err(e) => {
            eprintln!("{} installing packages: {e}", "Error:".red());
            false
        }
    }
}
