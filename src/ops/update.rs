//! Package updates.
//!
//! Update availability is decided by the package's check hook when it
//! ships one (exit 0 = up to date, 1 = update available, anything else
//! falls back to commit comparison), otherwise by comparing local HEAD
//! against the remote ref. Installed packages are not user-editable:
//! local modifications are discarded in favor of the remote state.

use anyhow::{Result, anyhow, bail};
use colored::Colorize;

use super::Session;
use crate::error::GitpmError;
use crate::git;
use crate::hooks;
use crate::registry::Registry;

pub fn update(session: &Session, name: Option<&str>, check_only: bool) -> Result<()> {
    let mut registry = Registry::load(session.registry_path.clone());
    match name {
        Some(name) => update_one(session, &mut registry, name, check_only),
        None => update_all(session, &mut registry, check_only),
    }
}

fn update_all(session: &Session, registry: &mut Registry, check_only: bool) -> Result<()> {
    if registry.is_empty() {
        println!("No packages installed.");
        return Ok(());
    }

    println!("Updating {} package(s)...", registry.len());
    let mut failures = 0usize;
    for name in registry.names() {
        if let Err(e) = update_one(session, registry, &name, check_only) {
            eprintln!("Failed to update {name}:");
            for (i, cause) in e.chain().enumerate() {
                if i == 0 {
                    eprintln!("  {cause}");
                } else {
                    eprintln!("  Caused by: {cause}");
                }
            }
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} package(s) failed to update (see error messages above)");
    }
    Ok(())
}

fn update_one(
    session: &Session,
    registry: &mut Registry,
    name: &str,
    check_only: bool,
) -> Result<()> {
    let record = registry
        .get(name)
        .cloned()
        .ok_or_else(|| anyhow!("'{name}' is not installed"))?;
    let repo_path = record.path.clone();
    if !repo_path.exists() {
        bail!("installation path {} does not exist", repo_path.display());
    }
    let branch = record.branch.clone();

    if check_only {
        println!("Checking for updates: {name}...");
    } else {
        println!("Updating {name}...");
    }

    let fetched = git::fetch_origin(&repo_path)?;
    if !fetched.success() {
        return Err(GitpmError::vcs("fetch", fetched.stderr.trim().to_string()).into());
    }

    let local = git::rev_parse(&repo_path, "HEAD");
    let remote_ref = match &branch {
        Some(b) => format!("origin/{b}"),
        // No declared branch: the remote default ref, or failing that the
        // remote counterpart of whatever is checked out
        None => {
            if git::rev_parse(&repo_path, "origin/HEAD").is_some() {
                "origin/HEAD".to_string()
            } else {
                match git::current_branch(&repo_path) {
                    Some(b) => format!("origin/{b}"),
                    None => "origin/HEAD".to_string(),
                }
            }
        }
    };
    let remote = git::rev_parse(&repo_path, &remote_ref);

    let hook_set = hooks::discover(&repo_path, session.scope);
    let updates_available = match &hook_set.check {
        Some(check) => {
            println!("Running check script: {}", check.display());
            match hooks::execute_with_code(check, &repo_path) {
                0 => false,
                1 => true,
                code => {
                    eprintln!(
                        "{} check script returned error code {code}",
                        "Warning:".yellow()
                    );
                    // Unusable hook: fall back to commit comparison
                    local != remote
                }
            }
        }
        None => local != remote,
    };

    if !updates_available {
        println!("'{name}' is already up to date");
        return Ok(());
    }
    if check_only {
        println!("Update available for '{name}'");
        return Ok(());
    }

    if let Some(b) = &branch {
        let out = git::checkout(&repo_path, b)?;
        if !out.success() {
            return Err(GitpmError::vcs("checkout", out.stderr.trim().to_string()).into());
        }
    }

    let dirty = !git::status_porcelain(&repo_path)?.trim().is_empty();
    if dirty {
        println!(
            "{} local changes detected in '{name}'. Resetting to remote state...",
            "Warning:".yellow()
        );
        let out = git::reset_hard(&repo_path, &remote_ref)?;
        if !out.success() {
            return Err(GitpmError::vcs("reset", out.stderr.trim().to_string()).into());
        }
        let out = git::clean_untracked(&repo_path)?;
        if !out.success() {
            return Err(GitpmError::vcs("clean", out.stderr.trim().to_string()).into());
        }
    } else {
        let out = git::pull(&repo_path)?;
        if !out.success() {
            return Err(GitpmError::vcs("pull", out.stderr.trim().to_string()).into());
        }
    }

    // Hooks may have changed with the new tree
    let hook_set = hooks::discover(&repo_path, session.scope);
    if let Some(update_hook) = &hook_set.update {
        println!("Running update script: {}", update_hook.display());
        if !hooks::execute(update_hook, &repo_path) {
            eprintln!(
                "{} update script failed, but repository was updated.",
                "Warning:".yellow()
            );
        }
    } else if let Some(setup_hook) = &hook_set.setup {
        println!("Re-running setup script: {}", setup_hook.display());
        let _ = hooks::execute(setup_hook, &repo_path);
    }

    if hook_set.update.is_some() || hook_set.check.is_some() {
        if let Some(rec) = registry.get_mut(name) {
            if hook_set.update.is_some() {
                rec.update_script = hook_set.update.clone();
            }
            if hook_set.check.is_some() {
                rec.check_script = hook_set.check.clone();
            }
        }
        registry.persist()?;
    }

    match &branch {
        Some(b) => println!("Successfully updated '{name}' (branch: {b})"),
        None => println!("Successfully updated '{name}'"),
    }
    Ok(())
}
