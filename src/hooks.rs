//! Lifecycle hook discovery and execution.
//!
//! Hooks are scripts shipped inside a package's repository, found by a
//! fixed naming convention: scope-qualified names first (`setup-user.sh`
//! before `setup.sh`), shell before interpreted, and for each kind two
//! interchangeable stems (`setup`/`install`, `remove`/`uninstall`, ...).

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::exec;
use crate::scope::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Setup,
    Remove,
    Update,
    Check,
}

impl HookKind {
    fn stems(self) -> [&'static str; 2] {
        match self {
            HookKind::Setup => ["setup", "install"],
            HookKind::Remove => ["remove", "uninstall"],
            HookKind::Update => ["update", "upgrade"],
            HookKind::Check => ["check", "check-updates"],
        }
    }

    /// Candidate file names in probe order for the given scope.
    fn candidates(self, scope: Scope) -> Vec<String> {
        let prefix = scope.hook_prefix();
        let [a, b] = self.stems();
        vec![
            format!("{a}-{prefix}.sh"),
            format!("{b}-{prefix}.sh"),
            format!("{a}-{prefix}.py"),
            format!("{b}-{prefix}.py"),
            format!("{a}.sh"),
            format!("{b}.sh"),
            format!("{a}.py"),
            format!("{b}.py"),
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct HookSet {
    pub setup: Option<PathBuf>,
    pub remove: Option<PathBuf>,
    pub update: Option<PathBuf>,
    pub check: Option<PathBuf>,
}

/// Discover all hooks in a repository for the given scope.
///
/// Shell candidates are made executable as a side effect when found;
/// failures to chmod are swallowed. A `.py` candidate is eligible
/// regardless of its executable bit, a shell candidate only when
/// executable.
pub fn discover(repo_path: &Path, scope: Scope) -> HookSet {
    HookSet {
        setup: discover_kind(repo_path, scope, HookKind::Setup),
        remove: discover_kind(repo_path, scope, HookKind::Remove),
        update: discover_kind(repo_path, scope, HookKind::Update),
        check: discover_kind(repo_path, scope, HookKind::Check),
    }
}

fn discover_kind(repo_path: &Path, scope: Scope, kind: HookKind) -> Option<PathBuf> {
    for name in kind.candidates(scope) {
        let path = repo_path.join(&name);
        if !path.is_file() {
            continue;
        }
        if is_shell_style(&path) {
            make_executable(&path);
        }
        if is_interpreted(&path) || is_executable(&path) {
            return Some(path);
        }
    }
    None
}

fn is_interpreted(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "py")
}

fn is_shell_style(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => ext == "sh",
        None => true,
    }
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

fn make_executable(path: &Path) {
    if let Ok(metadata) = fs::metadata(path) {
        let mut perms = metadata.permissions();
        perms.set_mode(0o755);
        let _ = fs::set_permissions(path, perms);
    }
}

/// Run a hook and report plain success (exit code zero).
pub fn execute(script: &Path, workdir: &Path) -> bool {
    execute_with_code(script, workdir) == 0
}

/// Run a hook and report its raw exit code. Execution problems (spawn
/// failure, deadline) map to the sentinel code 255.
pub fn execute_with_code(script: &Path, workdir: &Path) -> i32 {
    if is_shell_style(script) {
        make_executable(script);
    }

    let (program, args) = if is_interpreted(script) {
        ("python3", vec![script.to_string_lossy().into_owned()])
    } else {
        ("bash", vec![script.to_string_lossy().into_owned()])
    };

    match exec::run_captured(program, args, Some(workdir), exec::LONG_TIMEOUT) {
        Ok(out) => {
            if out.timed_out {
                eprintln!(
                    "{} script {} timed out",
                    "Error:".red(),
                    script.display()
                );
                return 255;
            }
            if !out.stdout.is_empty() {
                print!("{}", out.stdout);
            }
            if out.code != 0 && !out.stderr.is_empty() {
                eprint!("{}", out.stderr);
            }
            out.code
        }
        Err(e) => {
            eprintln!(
                "{} running script {}: {e}",
                "Error:".red(),
                script.display()
            );
            255
        }
    }
}
