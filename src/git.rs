//! Git collaborator.
//!
//! The full install clone goes through libgit2; everything else (remote
//! queries, branch juggling, sync) shells out to the git CLI with a
//! bounded runner, since those verbs are defined by git's command-line
//! surface and must respect per-call deadlines.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use git2::{FetchOptions, Repository, build::RepoBuilder};

use crate::exec::{self, CommandOutput};

/// Clone a repository in full to the target directory.
pub fn clone(url: &str, target: &Path) -> Result<Repository> {
    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(git2::RemoteCallbacks::new());

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);

    let repo = builder
        .clone(url, target)
        .context("Failed to clone repository")?;

    Ok(repo)
}

fn git<I, S>(args: I, dir: Option<&Path>, timeout: Duration) -> Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: Into<std::ffi::OsString>,
{
    exec::run_captured("git", args, dir, timeout)
}

/// Query a remote for all branch and tag refs.
pub fn ls_remote(url: &str) -> Result<CommandOutput> {
    git(
        ["ls-remote", "--heads", "--tags", url],
        None,
        exec::LS_REMOTE_TIMEOUT,
    )
}

/// Shallow, no-checkout clone used for compatibility probing.
pub fn shallow_clone_no_checkout(
    url: &str,
    dest: &Path,
    branch: Option<&str>,
) -> Result<CommandOutput> {
    let mut args = vec![
        "clone".to_string(),
        "--depth".to_string(),
        "1".to_string(),
        "--no-checkout".to_string(),
        url.to_string(),
        dest.to_string_lossy().into_owned(),
    ];
    if let Some(branch) = branch {
        args.push("--branch".to_string());
        args.push(branch.to_string());
    }
    git(args, None, exec::SHALLOW_CLONE_TIMEOUT)
}

/// Materialize the tree of a no-checkout clone.
pub fn materialize_head(dir: &Path) -> Result<CommandOutput> {
    git(["checkout", "HEAD", "--", "."], Some(dir), exec::GIT_QUERY_TIMEOUT)
}

pub fn fetch_origin(dir: &Path) -> Result<CommandOutput> {
    git(["fetch", "origin"], Some(dir), exec::GIT_SYNC_TIMEOUT)
}

pub fn branch_exists_local(dir: &Path, branch: &str) -> bool {
    git(["branch", "--list", branch], Some(dir), exec::GIT_QUERY_TIMEOUT)
        .map(|out| out.success() && !out.stdout.trim().is_empty())
        .unwrap_or(false)
}

pub fn branch_exists_remote(dir: &Path, branch: &str) -> bool {
    let pattern = format!("origin/{branch}");
    git(
        ["branch", "-r", "--list", &pattern],
        Some(dir),
        exec::GIT_QUERY_TIMEOUT,
    )
    .map(|out| out.success() && !out.stdout.trim().is_empty())
    .unwrap_or(false)
}

pub fn checkout(dir: &Path, target: &str) -> Result<CommandOutput> {
    git(["checkout", target], Some(dir), exec::GIT_QUERY_TIMEOUT)
}

/// Checkout a remote branch with tracking set up.
pub fn checkout_track(dir: &Path, branch: &str) -> Result<CommandOutput> {
    let remote = format!("origin/{branch}");
    git(
        ["checkout", "--track", &remote],
        Some(dir),
        exec::GIT_QUERY_TIMEOUT,
    )
}

/// Create a local branch tracking the remote one and check it out.
pub fn checkout_new_tracking(dir: &Path, branch: &str) -> Result<CommandOutput> {
    let remote = format!("origin/{branch}");
    git(
        ["checkout", "-b", branch, &remote],
        Some(dir),
        exec::GIT_QUERY_TIMEOUT,
    )
}

/// Name of the currently checked-out branch, if any.
pub fn current_branch(dir: &Path) -> Option<String> {
    git(["branch", "--show-current"], Some(dir), exec::GIT_QUERY_TIMEOUT)
        .ok()
        .filter(|out| out.success())
        .map(|out| out.stdout.trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Resolve a ref to its commit hash.
pub fn rev_parse(dir: &Path, reference: &str) -> Option<String> {
    git(["rev-parse", reference], Some(dir), exec::GIT_QUERY_TIMEOUT)
        .ok()
        .filter(|out| out.success())
        .map(|out| out.stdout.trim().to_string())
        .filter(|hash| !hash.is_empty())
}

/// Porcelain status output; non-empty means local modifications.
pub fn status_porcelain(dir: &Path) -> Result<String> {
    let out = git(["status", "--porcelain"], Some(dir), exec::GIT_QUERY_TIMEOUT)?;
    Ok(out.stdout)
}

pub fn reset_hard(dir: &Path, reference: &str) -> Result<CommandOutput> {
    git(["reset", "--hard", reference], Some(dir), exec::GIT_QUERY_TIMEOUT)
}

pub fn clean_untracked(dir: &Path) -> Result<CommandOutput> {
    git(["clean", "-fd"], Some(dir), exec::GIT_QUERY_TIMEOUT)
}

pub fn pull(dir: &Path) -> Result<CommandOutput> {
    git(["pull"], Some(dir), exec::GIT_SYNC_TIMEOUT)
}
