use std::fs;
use std::path::{Path, PathBuf};

use crate::store::{SqliteStore, Store};

use super::StoreArgs;

fn confirm_action(message: &str, yes: bool) -> anyhow::Result<bool> {
    if yes {
        Ok(true)
    } else {
        Ok(inquire::Confirm::new(message)
            .with_default(false)
            .prompt()?)
    }
}

fn remove_database(db_path: &Path) -> anyhow::Result<()> {
    fs::remove_file(db_path)?;
    // WAL side files belong to the database being replaced.
    for suffix in ["-wal", "-shm"] {
        let mut side = db_path.as_os_str().to_owned();
        side.push(suffix);
        let side = PathBuf::from(side);
        if side.exists() {
            fs::remove_file(&side)?;
        }
    }
    Ok(())
}

pub fn run_init(args: StoreArgs, overwrite: bool, yes: bool) -> anyhow::Result<()> {
    let db_path = args.db;

    if db_path.exists() {
        if !overwrite {
            anyhow::bail!(
                "{} already exists, not overwriting. Pass --overwrite to replace it.",
                db_path.display()
            );
        }

        let confirmed = confirm_action(
            &format!(
                "Replace {}? All projects and repositories in it are lost.",
                db_path.display()
            ),
            yes,
        )?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }

        remove_database(&db_path)?;
    }

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    println!("Database created in: {}", db_path.display());

    Ok(())
}
