use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::materialize::{Materializer, Outcome};
use crate::store::Store;
use crate::vcs::LibGit;

use super::{StoreArgs, init_store, load_settings};

pub async fn run_download(
    args: StoreArgs,
    project: Option<String>,
    update: bool,
    workers: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let settings = load_settings(args.config.as_deref())?;
    let store = Arc::new(init_store(&args.db)?);

    let records = store.list_members(project.as_deref())?;
    if records.is_empty() {
        if json {
            println!("[]");
        } else {
            println!("No repositories found.");
        }
        return Ok(());
    }

    let vcs = Arc::new(LibGit::with_token(settings.api_token()));
    let materializer = Materializer::new(vcs, store)
        .with_clone_depth(settings.clone_depth)
        .with_workers(workers.unwrap_or(settings.workers));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing repositories already in progress");
            on_interrupt.cancel();
        }
    });

    let outcomes = materializer.materialize_all(records, update, cancel).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        return Ok(());
    }

    println!();
    for o in &outcomes {
        println!("  {:<40} {}", o.key.to_string(), o.outcome);
    }

    let count = |f: fn(&Outcome) -> bool| outcomes.iter().filter(|o| f(&o.outcome)).count();
    println!();
    println!(
        "{} cloned, {} updated, {} skipped, {} failed, {} cancelled",
        count(|o| matches!(o, Outcome::Cloned)),
        count(|o| matches!(o, Outcome::Updated)),
        count(|o| matches!(o, Outcome::Skipped)),
        count(Outcome::is_error),
        count(|o| matches!(o, Outcome::Cancelled)),
    );
    println!();

    Ok(())
}
