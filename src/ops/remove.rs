//! Package removal.

use anyhow::{Context, Result, anyhow};
use colored::Colorize;

use super::Session;
use crate::hooks;
use crate::registry::Registry;

pub fn remove(session: &Session, name: &str) -> Result<()> {
    let mut registry = Registry::load(session.registry_path.clone());
    remove_existing(session, &mut registry, name, false)
}

/// Remove an installed package: best-effort removal hook, directory
/// deletion, registry purge. A record whose directory is already gone is
/// purged without error.
pub(crate) fn remove_existing(
    session: &Session,
    registry: &mut Registry,
    name: &str,
    skip_hooks: bool,
) -> Result<()> {
    let record = registry
        .get(name)
        .cloned()
        .ok_or_else(|| anyhow!("'{name}' is not installed"))?;
    let repo_path = record.path.clone();

    if !repo_path.exists() {
        eprintln!(
            "{} installation path {} does not exist",
            "Warning:".yellow(),
            repo_path.display()
        );
        registry.remove(name);
        registry.persist()?;
        println!("Successfully removed '{name}'");
        return Ok(());
    }

    if !skip_hooks {
        let discovered = hooks::discover(&repo_path, session.scope).remove;
        let script = discovered.or_else(|| record.remove_script.clone().filter(|p| p.exists()));
        if let Some(script) = script {
            println!("Running removal script: {}", script.display());
            // Hook failure does not block removal
            let _ = hooks::execute(&script, &repo_path);
        }
    }

    std::fs::remove_dir_all(&repo_path)
        .with_context(|| format!("removing directory {}", repo_path.display()))?;
    println!("Removed {}", repo_path.display());

    registry.remove(name);
    registry.persist()?;
    println!("Successfully removed '{name}'");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testutil::make_session;
    use crate::registry::InstalledRecord;
    use std::fs;
    use std::path::Path;

    fn installed(session: &Session, name: &str) -> InstalledRecord {
        InstalledRecord {
            name: name.to_string(),
            url: format!("https://x/{name}.git"),
            owner: "x".to_string(),
            repo_name: name.to_string(),
            branch: None,
            path: session.apps_dir.join(name),
            setup_script: None,
            remove_script: None,
            update_script: None,
            check_script: None,
        }
    }

    fn write_hook(dir: &Path, name: &str, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
    }

    #[test]
    fn remove_deletes_directory_and_registry_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let session = make_session(tmp.path());
        let mut registry = Registry::load(session.registry_path.clone());
        let record = installed(&session, "tool");
        fs::create_dir_all(&record.path).unwrap();
        fs::write(record.path.join("data"), "x").unwrap();
        registry.insert(record.clone());
        registry.persist().unwrap();

        remove(&session, "tool").unwrap();

        assert!(!record.path.exists());
        let reloaded = Registry::load(session.registry_path.clone());
        assert!(!reloaded.contains("tool"));
    }

    #[test]
    fn orphaned_record_is_purged_without_error() {
        let tmp = tempfile::tempdir().unwrap();
        let session = make_session(tmp.path());
        let mut registry = Registry::load(session.registry_path.clone());
        // Path never created on disk
        registry.insert(installed(&session, "ghost"));
        registry.persist().unwrap();

        remove(&session, "ghost").unwrap();
        let reloaded = Registry::load(session.registry_path.clone());
        assert!(!reloaded.contains("ghost"));
    }

    #[test]
    fn removing_an_unknown_package_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let session = make_session(tmp.path());
        let err = remove(&session, "nope").unwrap_err();
        assert!(err.to_string().contains("not installed"));
    }

    #[test]
    fn removal_hook_runs_before_deletion() {
        let tmp = tempfile::tempdir().unwrap();
        let session = make_session(tmp.path());
        let mut registry = Registry::load(session.registry_path.clone());
        let record = installed(&session, "tool");
        fs::create_dir_all(&record.path).unwrap();
        // The hook records its run outside the directory about to vanish
        write_hook(&record.path, "remove.sh", "touch ../../hook-ran\n");
        registry.insert(record);
        registry.persist().unwrap();

        remove(&session, "tool").unwrap();
        assert!(tmp.path().join("hook-ran").exists());
    }

    #[test]
    fn recorded_hook_path_is_a_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let session = make_session(tmp.path());
        let mut registry = Registry::load(session.registry_path.clone());
        let mut record = installed(&session, "tool");
        fs::create_dir_all(&record.path).unwrap();
        // A hook under a name discovery does not probe
        write_hook(&record.path, "cleanup.sh", "touch ../../fallback-ran\n");
        record.remove_script = Some(record.path.join("cleanup.sh"));
        registry.insert(record);
        registry.persist().unwrap();

        remove(&session, "tool").unwrap();
        assert!(tmp.path().join("fallback-ran").exists());
    }

    #[test]
    fn skip_hooks_suppresses_the_removal_script() {
        let tmp = tempfile::tempdir().unwrap();
        let session = make_session(tmp.path());
        let mut registry = Registry::load(session.registry_path.clone());
        let record = installed(&session, "tool");
        fs::create_dir_all(&record.path).unwrap();
        write_hook(&record.path, "remove.sh", "touch ../../hook-ran\n");
        registry.insert(record);

        remove_existing(&session, &mut registry, "tool", true).unwrap();
        assert!(!tmp.path().join("hook-ran").exists());
    }
}
