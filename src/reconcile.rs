//! Merging the candidate snapshot into the registry.
//!
//! The reconciler is the only writer of project membership and repository
//! records. Each operation is applied as one store transaction, so readers
//! see either the whole result or nothing.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::store::path::repository_path;
use crate::store::Store;
use crate::types::{CandidateEntry, RegistryUpsert};

pub use crate::store::SyncReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    pub repositories: usize,
}

pub struct Reconciler {
    store: Arc<dyn Store>,
    base_path: PathBuf,
}

impl Reconciler {
    pub fn new(store: Arc<dyn Store>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            base_path: base_path.into(),
        }
    }

    /// Applies every candidate to the registry: membership for its project
    /// and a record carrying its clone URL. Existing sync timestamps survive.
    pub fn merge(&self) -> Result<MergeReport> {
        let candidates = self.store.list_candidates()?;
        let rows = self.plan(&candidates)?;
        self.store.apply_merge(&rows)?;

        info!("Merged {} repositories into the registry", rows.len());
        Ok(MergeReport {
            repositories: rows.len(),
        })
    }

    /// Makes `project` contain exactly the repositories the snapshot lists
    /// for it. Refreshes records of repositories that stay, adds new ones and
    /// drops membership of the rest.
    ///
    /// An empty snapshot for `project` would remove all of its membership;
    /// that is refused unless `allow_empty` is set.
    pub fn sync_project(&self, project: &str, allow_empty: bool) -> Result<SyncReport> {
        let candidates: Vec<CandidateEntry> = self
            .store
            .list_candidates()?
            .into_iter()
            .filter(|c| c.project == project)
            .collect();

        if candidates.is_empty() {
            if !allow_empty {
                return Err(Error::EmptySnapshot(project.to_string()));
            }
            warn!("Snapshot has no candidates for '{project}'; removing all of its membership");
        }

        let rows = self.plan(&candidates)?;
        let report = self.store.apply_project_sync(project, &rows)?;

        info!(
            "Synced project '{project}': {} refreshed, {} added, {} removed",
            report.refreshed, report.added, report.removed
        );
        Ok(report)
    }

    /// Deletes registry records no project refers to.
    pub fn prune_orphans(&self) -> Result<usize> {
        let removed = self.store.prune_orphans()?;
        info!("Removed {removed} unreferenced repositories");
        Ok(removed)
    }

    /// Turns candidates into registry writes. For a key listed more than once
    /// the last entry wins and takes the later position.
    fn plan(&self, candidates: &[CandidateEntry]) -> Result<Vec<RegistryUpsert>> {
        let mut slots: Vec<Option<RegistryUpsert>> = Vec::with_capacity(candidates.len());
        let mut index = HashMap::with_capacity(candidates.len());

        for candidate in candidates {
            let row = RegistryUpsert {
                project: candidate.project.clone(),
                key: candidate.key.clone(),
                clone_url: candidate.clone_url.clone(),
                local_path: repository_path(&self.base_path, &candidate.key)?,
            };
            if let Some(previous) = index.insert(candidate.key.clone(), slots.len()) {
                slots[previous] = None;
            }
            slots.push(Some(row));
        }

        Ok(slots.into_iter().flatten().collect())
    }
}
