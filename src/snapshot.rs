//! Capturing a remote query into the candidate store.

use chrono::Utc;
use tracing::info;

use crate::error::Result;
use crate::search::RepositorySearch;
use crate::store::Store;
use crate::types::CandidateEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotReport {
    /// Total reported by the remote, before `head` was applied.
    pub total_count: u64,
    /// Candidates now in the store.
    pub stored: usize,
}

/// Runs `query` and replaces the candidate snapshot with its first `head`
/// hits, all tagged with `project`.
///
/// The whole result is collected before the store is touched, so a failed
/// search leaves the previous snapshot in place.
pub fn capture(
    store: &dyn Store,
    search: &dyn RepositorySearch,
    project: &str,
    query: &str,
    head: usize,
) -> Result<SnapshotReport> {
    let results = search.search(query, head)?;
    let total_count = results.total_count();
    let queried_at = Utc::now();

    let entries = results
        .take(head)
        .map(|hit| {
            hit.map(|hit| CandidateEntry {
                project: project.to_string(),
                key: hit.key(),
                query_text: query.to_string(),
                queried_at,
                clone_url: hit.clone_url,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let stored = store.replace_candidates(&entries)?;
    info!(
        "Captured {stored} of {total_count} repositories for project '{project}'"
    );

    Ok(SnapshotReport {
        total_count,
        stored,
    })
}
