use clap::Parser;
use tracing_subscriber::EnvFilter;

use repofleet::cli::{
    Commands, run_add, run_clean, run_download, run_init, run_list, run_query, run_sync,
};

#[derive(Parser)]
#[command(name = "repofleet")]
#[command(
    about = "Keep local clones of remote repositories, grouped into projects",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("repofleet=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            store,
            overwrite,
            yes,
        } => run_init(store, overwrite, yes)?,
        Commands::Query {
            store,
            project,
            query,
            head,
        } => {
            // The search client blocks; keep it off the async workers.
            tokio::task::spawn_blocking(move || run_query(store, project, query, head)).await??;
        }
        Commands::Add { store, base_path } => run_add(store, base_path)?,
        Commands::Sync {
            store,
            project,
            base_path,
            allow_empty,
        } => run_sync(store, project, base_path, allow_empty)?,
        Commands::Download {
            store,
            project,
            update,
            workers,
            json,
        } => run_download(store, project, update, workers, json).await?,
        Commands::CleanDatabase { store } => run_clean(store)?,
        Commands::List {
            store,
            project,
            json,
        } => run_list(store, project, json)?,
    }

    Ok(())
}
