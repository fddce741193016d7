use crate::search::GithubSearch;
use crate::snapshot;

use super::{StoreArgs, init_store, load_settings};

pub fn run_query(
    args: StoreArgs,
    project: String,
    query: Option<String>,
    head: usize,
) -> anyhow::Result<()> {
    let settings = load_settings(args.config.as_deref())?;
    let store = init_store(&args.db)?;

    let query = match query {
        Some(q) => q,
        None => match settings.query_for(&project) {
            Some(q) => q.to_string(),
            None => anyhow::bail!(
                "Unknown project '{}'. Pass --query or add it to the [projects] table of the settings file.",
                project
            ),
        },
    };

    let token = settings.api_token();
    if token.is_none() {
        tracing::warn!(
            "{} is not set; searching anonymously with a low rate limit",
            settings.search.token_env
        );
    }
    let search = GithubSearch::new(&settings.search, token)?;

    println!("Querying '{}'...", query);
    let report = snapshot::capture(&store, &search, &project, &query, head)?;

    println!(
        "Got {} repositories, kept {} for project '{}'.",
        report.total_count, report.stored, project
    );

    Ok(())
}
