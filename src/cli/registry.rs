use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::reconcile::Reconciler;
use crate::store::Store;
use crate::types::{ProjectSummary, RepositoryRecord};

use super::{StoreArgs, init_store, load_settings};

fn reconciler(args: &StoreArgs, base_path: Option<PathBuf>) -> anyhow::Result<Reconciler> {
    let settings = load_settings(args.config.as_deref())?;
    let store = init_store(&args.db)?;
    let base_path = base_path.unwrap_or(settings.base_path);
    Ok(Reconciler::new(Arc::new(store), base_path))
}

pub fn run_add(args: StoreArgs, base_path: Option<PathBuf>) -> anyhow::Result<()> {
    let report = reconciler(&args, base_path)?.merge()?;

    if report.repositories == 0 {
        println!("Snapshot is empty, nothing added. Run 'repofleet query' first.");
    } else {
        println!("Added {} repositories to the database.", report.repositories);
    }

    Ok(())
}

pub fn run_sync(
    args: StoreArgs,
    project: String,
    base_path: Option<PathBuf>,
    allow_empty: bool,
) -> anyhow::Result<()> {
    let report = reconciler(&args, base_path)?.sync_project(&project, allow_empty)?;

    println!(
        "Synced project '{}': {} kept, {} added, {} removed.",
        project, report.refreshed, report.added, report.removed
    );

    Ok(())
}

pub fn run_clean(args: StoreArgs) -> anyhow::Result<()> {
    let removed = reconciler(&args, None)?.prune_orphans()?;

    println!("Removed {} repositories not used by any project.", removed);

    Ok(())
}

#[derive(Serialize)]
struct ListOutput {
    projects: Vec<ProjectSummary>,
    repositories: Vec<RepositoryOutput>,
}

#[derive(Serialize)]
struct RepositoryOutput {
    owner: String,
    name: String,
    clone_url: String,
    local_path: Option<String>,
    last_synced_at: Option<String>,
}

impl From<RepositoryRecord> for RepositoryOutput {
    fn from(record: RepositoryRecord) -> Self {
        Self {
            owner: record.key.owner,
            name: record.key.name,
            clone_url: record.clone_url,
            local_path: record.local_path.map(|p| p.display().to_string()),
            last_synced_at: record.last_synced_at.map(|t| t.to_rfc3339()),
        }
    }
}

pub fn run_list(args: StoreArgs, project: Option<String>, json: bool) -> anyhow::Result<()> {
    let store = init_store(&args.db)?;

    let projects: Vec<ProjectSummary> = store
        .list_projects()?
        .into_iter()
        .filter(|p| project.as_ref().is_none_or(|name| &p.project == name))
        .collect();
    let repositories = store.list_repositories(project.as_deref())?;

    if json {
        let output = ListOutput {
            projects,
            repositories: repositories.into_iter().map(Into::into).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if projects.is_empty() && repositories.is_empty() {
        println!("No repositories found.");
        return Ok(());
    }

    println!();
    for p in &projects {
        println!("  {} ({} repositories)", p.project, p.repositories);
    }
    println!();
    for r in &repositories {
        let synced = r
            .last_synced_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!("  {:<40} synced {}", r.key.to_string(), synced);
    }
    println!();

    Ok(())
}
