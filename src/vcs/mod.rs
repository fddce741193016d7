//! Version-control capability used by the materializer.
//!
//! Every operation returns a closed [`GitError`] on failure so callers can
//! match on the failure kind instead of inspecting library errors.

mod libgit;

pub use libgit::LibGit;

use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitError {
    /// The remote rejected our credentials.
    Auth(String),
    /// The remote repository or reference does not exist.
    NotFound(String),
    /// Local and remote history diverged; a fast-forward is impossible.
    Conflict(String),
    Network(String),
    /// The target path exists and cannot be cloned into.
    Refused(String),
    Internal(String),
}

impl GitError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "authentication failed",
            Self::NotFound(_) => "not found",
            Self::Conflict(_) => "conflict",
            Self::Network(_) => "network error",
            Self::Refused(_) => "refused",
            Self::Internal(_) => "internal error",
        }
    }

    fn detail(&self) -> &str {
        match self {
            Self::Auth(d)
            | Self::NotFound(d)
            | Self::Conflict(d)
            | Self::Network(d)
            | Self::Refused(d)
            | Self::Internal(d) => d,
        }
    }
}

impl fmt::Display for GitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.detail())
    }
}

impl std::error::Error for GitError {}

pub trait VersionControl: Send + Sync {
    /// Clones `url` into `path`. A `depth` of zero requests full history.
    fn clone_repo(&self, url: &str, path: &Path, depth: u32) -> Result<(), GitError>;

    /// True when `path` is a working copy with an `origin` remote.
    fn is_valid_repo(&self, path: &Path) -> bool;

    /// Fetches origin and fast-forwards the checked-out branch.
    fn pull(&self, path: &Path) -> Result<(), GitError>;
}
