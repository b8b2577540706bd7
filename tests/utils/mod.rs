use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, ensure};

use crate::common::TestEnvironment;

pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Run the compiled gitpm binary against the test environment's home.
pub fn run_gitpm(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let output = Command::new(env!("CARGO_BIN_EXE_gitpm"))
        .args(args)
        .env("HOME", env.home())
        .env("XDG_CONFIG_HOME", env.config_dir())
        .env("XDG_DATA_HOME", env.data_dir())
        .output()
        .context("running gitpm binary")?;

    Ok(CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn git(repo: &Path, args: &[&str]) -> Result<()> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .context("running git")?;
    ensure!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(())
}

/// Create a committed origin repository under the environment, with a
/// compatibility marker plus the given files.
pub fn create_test_repo(
    env: &TestEnvironment,
    name: &str,
    files: &[(&str, &str)],
) -> Result<PathBuf> {
    let repo = env.repos_dir().join(name);
    fs::create_dir_all(&repo)?;
    git(&repo, &["init", "-q"])?;
    git(&repo, &["config", "user.email", "test@example.com"])?;
    git(&repo, &["config", "user.name", "Test"])?;
    fs::write(repo.join(".gitpm"), "")?;
    for (path, content) in files {
        let full = repo.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full, content)?;
    }
    git(&repo, &["add", "-A"])?;
    git(&repo, &["commit", "-q", "-m", "init"])?;
    Ok(repo)
}

/// Commit all pending changes in an origin repository.
pub fn commit_all(repo: &Path, message: &str) -> Result<()> {
    git(repo, &["add", "-A"])?;
    git(repo, &["commit", "-q", "-m", message])
}
