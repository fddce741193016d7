pub mod path;
mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the persistence interface for the candidate snapshot and the
/// registry. Every multi-row write is applied atomically.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;
    fn is_initialized(&self) -> Result<bool>;

    // Candidate snapshot operations
    fn replace_candidates(&self, entries: &[CandidateEntry]) -> Result<usize>;
    fn list_candidates(&self) -> Result<Vec<CandidateEntry>>;

    // Registry writes
    fn apply_merge(&self, rows: &[RegistryUpsert]) -> Result<()>;
    fn apply_project_sync(&self, project: &str, rows: &[RegistryUpsert]) -> Result<SyncReport>;
    fn prune_orphans(&self) -> Result<usize>;
    fn set_last_synced(&self, key: &RepositoryKey, at: DateTime<Utc>) -> Result<()>;

    // Registry reads
    fn get_repository(&self, key: &RepositoryKey) -> Result<Option<RepositoryRecord>>;
    fn list_repositories(&self, project: Option<&str>) -> Result<Vec<RepositoryRecord>>;
    /// Records that belong to `project`, or to any project when `None`.
    /// Records waiting for `prune_orphans` are left out.
    fn list_members(&self, project: Option<&str>) -> Result<Vec<RepositoryRecord>>;
    fn list_memberships(&self, project: Option<&str>) -> Result<Vec<ProjectMembership>>;
    fn list_projects(&self) -> Result<Vec<ProjectSummary>>;
}

/// Counts reported by a project-scoped sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SyncReport {
    pub refreshed: usize,
    pub added: usize,
    pub removed: usize,
}
