//! Host distribution fingerprinting.
//!
//! Produces a single normalized identifier string ("Arch", "Debian", ...)
//! that manifests use as the lookup key for their per-distro package
//! tables. `ID_LIKE` wins over `ID` so derivatives resolve to their base
//! distribution (Garuda -> Arch, Linux Mint -> Debian).

use std::fs;
use std::path::Path;

/// Detect the current distribution identifier.
pub fn detect() -> String {
    let os_release = Path::new("/etc/os-release");
    if os_release.exists()
        && let Ok(content) = fs::read_to_string(os_release)
        && let Some(id) = parse_os_release(&content)
    {
        return id;
    }

    // Release-file fallbacks for systems without os-release
    for (marker, name) in [
        ("/etc/arch-release", "Arch"),
        ("/etc/debian_version", "Debian"),
        ("/etc/fedora-release", "Fedora"),
        ("/etc/redhat-release", "RHEL"),
        ("/etc/SuSE-release", "openSUSE"),
    ] {
        if Path::new(marker).exists() {
            return name.to_string();
        }
    }

    "Unknown".to_string()
}

/// Parse os-release content into a normalized distro identifier.
fn parse_os_release(content: &str) -> Option<String> {
    let mut id = None;
    let mut id_like = None;

    for line in content.lines() {
        if let Some(val) = line.strip_prefix("ID_LIKE=") {
            let val = unquote(val);
            // ID_LIKE can be space-separated; the first entry is the base
            id_like = val.split_whitespace().next().map(|s| s.to_string());
        } else if let Some(val) = line.strip_prefix("ID=") {
            id = Some(unquote(val).to_string());
        }
    }

    id_like.or(id).map(|raw| normalize(&raw))
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"').trim_matches('\'')
}

fn normalize(raw: &str) -> String {
    match raw.to_lowercase().as_str() {
        "arch" | "archlinux" => "Arch".to_string(),
        "debian" => "Debian".to_string(),
        "ubuntu" => "Ubuntu".to_string(),
        "fedora" => "Fedora".to_string(),
        "rhel" => "RHEL".to_string(),
        "centos" => "CentOS".to_string(),
        "opensuse" | "suse" => "openSUSE".to_string(),
        "sles" => "SLES".to_string(),
        other => capitalize(other),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}
