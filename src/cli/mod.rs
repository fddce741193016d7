mod commands;
mod download;
mod init;
mod query;
mod registry;

pub use commands::{Commands, StoreArgs};
pub use download::run_download;
pub use init::run_init;
pub use query::run_query;
pub use registry::{run_add, run_clean, run_list, run_sync};

use std::path::Path;

use crate::config::Settings;
use crate::store::SqliteStore;

const DEFAULT_CONFIG_FILE: &str = "repofleet.toml";

/// Open the store at `db_path`, checking it exists and has been initialized
pub fn init_store(db_path: &Path) -> anyhow::Result<SqliteStore> {
    Ok(SqliteStore::open_existing(db_path)?)
}

/// Load settings from an explicit file, the default file in the working
/// directory, or built-in defaults, in that order
pub fn load_settings(config: Option<&Path>) -> anyhow::Result<Settings> {
    if let Some(path) = config {
        return Ok(Settings::load(path)?);
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.is_file() {
        tracing::debug!("Loading settings from {}", default_path.display());
        return Ok(Settings::load(default_path)?);
    }

    Ok(Settings::default())
}
