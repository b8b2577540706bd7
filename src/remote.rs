//! Remote verification: reachability, branch existence, and the
//! marker-file compatibility probe.

use std::path::Path;

use anyhow::Result;

use crate::error::GitpmError;
use crate::git;
use crate::manifest;

/// Verify that a remote exists and is accessible, and that the requested
/// branch (if any) exists as a branch rather than a tag.
pub fn verify_reachable(url: &str, branch: Option<&str>) -> Result<(), GitpmError> {
    let out = match git::ls_remote(url) {
        Ok(out) => out,
        Err(_) => {
            return Err(GitpmError::Verification(
                "git is not installed or not in PATH".to_string(),
            ));
        }
    };

    if out.timed_out {
        return Err(GitpmError::Verification(
            "timeout while checking repository (network may be slow or repository unreachable)"
                .to_string(),
        ));
    }

    if !out.success() {
        let detail = out.stderr.trim();
        let detail = if detail.is_empty() { "unknown error" } else { detail };
        let lowered = detail.to_lowercase();
        let msg = if lowered.contains("not found") || lowered.contains("does not exist") {
            format!("repository not found or not accessible: {detail}")
        } else if lowered.contains("permission denied") || lowered.contains("authentication") {
            format!("permission denied or authentication required: {detail}")
        } else {
            format!("error accessing repository: {detail}")
        };
        return Err(GitpmError::Verification(msg));
    }

    if let Some(branch) = branch {
        let head_ref = format!("refs/heads/{branch}");
        let tag_ref = format!("refs/tags/{branch}");
        let mut found_head = false;
        let mut found_tag = false;
        for line in out.stdout.lines() {
            // ls-remote lines: <hash>\t<ref>
            let Some(reference) = line.split('\t').nth(1) else {
                continue;
            };
            if reference == head_ref {
                found_head = true;
                break;
            }
            if reference == tag_ref {
                found_tag = true;
            }
        }
        if !found_head {
            if found_tag {
                return Err(GitpmError::Verification(format!(
                    "'{branch}' exists as a tag, not a branch. Please use a branch name."
                )));
            }
            return Err(GitpmError::Verification(format!(
                "branch '{branch}' not found in repository"
            )));
        }
    }

    Ok(())
}

/// Check whether the repository carries a gitpm compatibility marker,
/// using a throwaway shallow clone that is removed on every exit path.
pub fn verify_compatible(url: &str, branch: Option<&str>) -> Result<(), GitpmError> {
    let tmp = tempfile::Builder::new()
        .prefix("gitpm-check-")
        .tempdir()
        .map_err(|e| GitpmError::Compatibility(format!("error checking compatibility: {e}")))?;
    let dest = tmp.path().join("repo");

    let cloned = shallow_probe_clone(url, branch, &dest)?;
    if !cloned.0 {
        return Err(GitpmError::Compatibility(format!(
            "could not check compatibility: {}",
            truncate(&cloned.1, 100)
        )));
    }

    // Exit code deliberately ignored; the marker check decides
    let _ = git::materialize_head(&dest);

    if manifest::has_marker(&dest) {
        return Ok(());
    }

    Err(GitpmError::Compatibility(format!(
        "repository is not marked as gitpm-compatible (missing marker file: {})",
        manifest::MARKER_FILES.join(", ")
    )))
}

/// Probe a dependency's manifest for the `system_only` flag without
/// installing it. `None` means the probe could not decide (unreachable,
/// no manifest, or unparseable manifest).
pub fn probe_system_only(url: &str, branch: Option<&str>) -> Option<bool> {
    let tmp = tempfile::Builder::new()
        .prefix("gitpm-check-dep-")
        .tempdir()
        .ok()?;
    let dest = tmp.path().join("repo");

    let (ok, _) = shallow_probe_clone(url, branch, &dest).ok()?;
    if !ok {
        return None;
    }
    let _ = git::materialize_head(&dest);

    match manifest::load(&dest) {
        Ok(Some(m)) => Some(m.system_only),
        _ => None,
    }
}

/// Shallow clone for probing, retried once without the branch qualifier
/// if the branch-qualified attempt fails. Returns (succeeded, stderr).
fn shallow_probe_clone(
    url: &str,
    branch: Option<&str>,
    dest: &Path,
) -> Result<(bool, String), GitpmError> {
    let first = git::shallow_clone_no_checkout(url, dest, branch)
        .map_err(|e| GitpmError::Compatibility(format!("error checking compatibility: {e}")))?;
    if first.timed_out {
        return Err(GitpmError::Compatibility(
            "timeout while checking repository compatibility".to_string(),
        ));
    }
    if first.success() {
        return Ok((true, String::new()));
    }

    if branch.is_some() {
        if dest.exists() {
            let _ = std::fs::remove_dir_all(dest);
        }
        let retry = git::shallow_clone_no_checkout(url, dest, None)
            .map_err(|e| GitpmError::Compatibility(format!("error checking compatibility: {e}")))?;
        if retry.timed_out {
            return Err(GitpmError::Compatibility(
                "timeout while checking repository compatibility".to_string(),
            ));
        }
        if retry.success() {
            return Ok((true, String::new()));
        }
        return Ok((false, retry.stderr));
    }

    Ok((false, first.stderr))
}

fn truncate(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
