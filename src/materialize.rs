//! Bringing local clones in line with the registry.
//!
//! Each repository moves through a small state machine decided by what is on
//! disk: an absent or non-repository path is cloned into, a valid working
//! copy is pulled when updates are requested and left alone otherwise.
//! Failures stay with the repository that caused them.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::store::Store;
use crate::types::{RepositoryKey, RepositoryRecord};
use crate::vcs::VersionControl;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalState {
    Absent,
    /// Something exists at the path but it is not a managed working copy.
    PresentNotRepo,
    PresentValidRepo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Cloned,
    Updated,
    Skipped,
    /// Cancellation arrived before work on the repository started.
    Cancelled,
    Error(String),
}

impl Outcome {
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloned => write!(f, "cloned"),
            Self::Updated => write!(f, "updated"),
            Self::Skipped => write!(f, "skipped"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Error(reason) => write!(f, "error: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoOutcome {
    pub key: RepositoryKey,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Clone)]
pub struct Materializer {
    vcs: Arc<dyn VersionControl>,
    store: Arc<dyn Store>,
    clone_depth: u32,
    workers: usize,
}

impl Materializer {
    pub fn new(vcs: Arc<dyn VersionControl>, store: Arc<dyn Store>) -> Self {
        Self {
            vcs,
            store,
            clone_depth: 1,
            workers: 1,
        }
    }

    #[must_use]
    pub fn with_clone_depth(mut self, depth: u32) -> Self {
        self.clone_depth = depth;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn inspect(&self, path: &Path) -> LocalState {
        if !path.exists() {
            LocalState::Absent
        } else if self.vcs.is_valid_repo(path) {
            LocalState::PresentValidRepo
        } else {
            LocalState::PresentNotRepo
        }
    }

    /// Drives one repository to a valid working copy. Never panics or
    /// returns early with an error; every failure becomes [`Outcome::Error`].
    pub fn materialize(&self, record: &RepositoryRecord, should_update: bool) -> Outcome {
        let key = &record.key;
        let Some(path) = record.local_path.as_deref() else {
            return Outcome::Error(format!(
                "{key}: no local path recorded; add it to the registry with a base path first"
            ));
        };

        let outcome = match self.inspect(path) {
            LocalState::Absent => {
                if let Some(parent) = path.parent() {
                    if let Err(e) = fs::create_dir_all(parent) {
                        return self.report(
                            key,
                            Outcome::Error(format!(
                                "{key}: failed to create {}: {e}",
                                parent.display()
                            )),
                        );
                    }
                }
                info!("Cloning {} into {}", record.clone_url, path.display());
                self.clone_into(record, path)
            }
            LocalState::PresentNotRepo => {
                info!(
                    "{} is not a git repository, cloning {} into it",
                    path.display(),
                    record.clone_url
                );
                self.clone_into(record, path)
            }
            LocalState::PresentValidRepo if should_update => {
                info!("Pulling {key} in {}", path.display());
                match self.vcs.pull(path) {
                    Ok(()) => self.mark_synced(key, Outcome::Updated),
                    Err(e) => Outcome::Error(format!("{key}: pull in {} failed: {e}", path.display())),
                }
            }
            LocalState::PresentValidRepo => Outcome::Skipped,
        };

        self.report(key, outcome)
    }

    fn clone_into(&self, record: &RepositoryRecord, path: &Path) -> Outcome {
        match self.vcs.clone_repo(&record.clone_url, path, self.clone_depth) {
            Ok(()) => self.mark_synced(&record.key, Outcome::Cloned),
            Err(e) => Outcome::Error(format!(
                "{}: clone from {} failed: {e}",
                record.key, record.clone_url
            )),
        }
    }

    fn mark_synced(&self, key: &RepositoryKey, outcome: Outcome) -> Outcome {
        match self.store.set_last_synced(key, Utc::now()) {
            Ok(()) => outcome,
            Err(e) => Outcome::Error(format!("{key}: {outcome} but recording sync time failed: {e}")),
        }
    }

    fn report(&self, key: &RepositoryKey, outcome: Outcome) -> Outcome {
        match &outcome {
            Outcome::Error(reason) => warn!("{reason}"),
            Outcome::Skipped => info!("{key} already present, skipping"),
            other => info!("{key}: {other}"),
        }
        outcome
    }

    /// Materializes every record independently, running at most `workers`
    /// at a time. Outcomes come back in the order of `records`.
    ///
    /// Once `cancel` fires, repositories that have not started report
    /// [`Outcome::Cancelled`]; operations already running finish.
    pub async fn materialize_all(
        &self,
        records: Vec<RepositoryRecord>,
        should_update: bool,
        cancel: CancellationToken,
    ) -> Vec<RepoOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for (index, record) in records.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let this = self.clone();

            tasks.spawn(async move {
                let key = record.key.clone();
                let permit = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };

                let outcome = match permit {
                    Some(_permit) if !cancel.is_cancelled() => {
                        let task = tokio::task::spawn_blocking(move || {
                            this.materialize(&record, should_update)
                        });
                        match task.await {
                            Ok(outcome) => outcome,
                            Err(e) => Outcome::Error(format!("{key}: worker failed: {e}")),
                        }
                    }
                    _ => Outcome::Cancelled,
                };

                (index, RepoOutcome { key, outcome })
            });
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => outcomes.push(result),
                Err(e) => error!("Materialize task failed: {e}"),
            }
        }

        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }
}
