use thiserror::Error;

/// Categorized failures surfaced by gitpm operations.
///
/// Hook failures are deliberately absent: a failing setup/update/remove
/// hook is a warning, not an error, and the surrounding operation still
/// counts as structurally successful.
#[derive(Error, Debug)]
pub enum GitpmError {
    #[error("no catalog files found")]
    NoCatalogs,

    #[error("{0}")]
    Manifest(String),

    #[error("{0}")]
    Verification(String),

    #[error("{0}")]
    Compatibility(String),

    #[error("{0}")]
    Dependency(String),

    #[error("git {verb} failed: {detail}")]
    Vcs { verb: &'static str, detail: String },
}

impl GitpmError {
    pub fn vcs(verb: &'static str, detail: impl Into<String>) -> Self {
        GitpmError::Vcs {
            verb,
            detail: detail.into(),
        }
    }
}
