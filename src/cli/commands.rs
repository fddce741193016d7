use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Path and file name of the repository database
    #[arg(long, default_value = "./repositories.db")]
    pub db: PathBuf,

    /// Settings file (TOML). Defaults to ./repofleet.toml when present
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty repository database
    Init {
        #[command(flatten)]
        store: StoreArgs,

        /// Replace an existing database
        #[arg(long)]
        overwrite: bool,

        /// Skip the confirmation prompt when overwriting
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Search the remote and replace the candidate snapshot with the results
    Query {
        #[command(flatten)]
        store: StoreArgs,

        /// Project the results are assigned to
        #[arg(long)]
        project: String,

        /// Search expression; defaults to the project's configured query
        #[arg(long)]
        query: Option<String>,

        /// Maximum number of repositories to keep from the results
        #[arg(long, default_value_t = 10)]
        head: usize,
    },

    /// Add the candidate snapshot to the registry
    Add {
        #[command(flatten)]
        store: StoreArgs,

        /// Base path under which repositories are cloned
        #[arg(long)]
        base_path: Option<PathBuf>,
    },

    /// Make a project contain exactly the repositories of the candidate snapshot
    Sync {
        #[command(flatten)]
        store: StoreArgs,

        /// Project to synchronize
        #[arg(long)]
        project: String,

        /// Base path under which repositories are cloned
        #[arg(long)]
        base_path: Option<PathBuf>,

        /// Remove all membership of the project when the snapshot has none for it
        #[arg(long)]
        allow_empty: bool,
    },

    /// Clone missing repositories and optionally pull existing ones
    Download {
        #[command(flatten)]
        store: StoreArgs,

        /// Only repositories of this project
        #[arg(long)]
        project: Option<String>,

        /// Pull repositories that are already cloned
        #[arg(long)]
        update: bool,

        /// Number of repositories processed at the same time
        #[arg(long)]
        workers: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove repositories that no project uses from the database
    CleanDatabase {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Show projects and registered repositories
    List {
        #[command(flatten)]
        store: StoreArgs,

        /// Only repositories of this project
        #[arg(long)]
        project: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
