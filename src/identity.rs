//! Repository identity resolution.
//!
//! Normalizes the URL shapes accepted in catalogs and manifests into a
//! canonical clone URL plus owner/repo identity. This is a total
//! function: unknown shapes fall back to owner "unknown" instead of
//! failing.

use std::sync::LazyLock;

use regex::Regex;

const DEFAULT_HOST: &str = "github.com";

static SSH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^@/\s]+)@([^:/\s]+):([^/\s]+)/([^/\s]+)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoIdentity {
    /// Canonical clone URL, `.git` suffix included where the shape is known.
    pub canonical_url: String,
    pub owner: String,
    pub repo: String,
}

/// Resolve a raw source URL into its identity.
pub fn resolve(url: &str) -> RepoIdentity {
    let trimmed = url.trim();
    let stripped = trimmed.strip_suffix(".git").unwrap_or(trimmed);

    if let Some(rest) = stripped
        .strip_prefix("https://")
        .map(|r| ("https", r))
        .or_else(|| stripped.strip_prefix("http://").map(|r| ("http", r)))
    {
        let (scheme, rest) = rest;
        let mut parts = rest.split('/').filter(|p| !p.is_empty());
        if let (Some(host), Some(owner), Some(repo)) = (parts.next(), parts.next(), parts.next()) {
            return RepoIdentity {
                canonical_url: format!("{scheme}://{host}/{owner}/{repo}.git"),
                owner: owner.to_string(),
                repo: repo.to_string(),
            };
        }
    } else if let Some(caps) = SSH_RE.captures(stripped) {
        let (user, host, owner, repo) = (&caps[1], &caps[2], &caps[3], &caps[4]);
        return RepoIdentity {
            canonical_url: format!("{user}@{host}:{owner}/{repo}.git"),
            owner: owner.to_string(),
            repo: repo.to_string(),
        };
    } else if !stripped.contains("://") {
        // Bare owner/repo form, assumed to live on the default host
        let parts: Vec<&str> = stripped.split('/').collect();
        if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
            return RepoIdentity {
                canonical_url: format!("https://{DEFAULT_HOST}/{}/{}.git", parts[0], parts[1]),
                owner: parts[0].to_string(),
                repo: parts[1].to_string(),
            };
        }
    }

    // Unknown shape: keep the URL, take the last path segment as the name
    let repo = stripped
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(stripped)
        .to_string();
    RepoIdentity {
        canonical_url: stripped.to_string(),
        owner: "unknown".to_string(),
        repo,
    }
}
