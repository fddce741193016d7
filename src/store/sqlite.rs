use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};

use super::schema::SCHEMA;
use super::{Store, SyncReport};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Opens a database that `initialize` has already run on.
    pub fn open_existing<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if !db_path.exists() {
            return Err(Error::Setup(format!(
                "Database not found at {}. Run 'repofleet init' first.",
                db_path.display()
            )));
        }

        let store = Self::new(db_path)?;
        if !store.is_initialized()? {
            return Err(Error::Setup(format!(
                "{} is not a repofleet database. Run 'repofleet init --overwrite' to recreate it.",
                db_path.display()
            )));
        }
        Ok(store)
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite's own datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .ok()
}

fn invalid_datetime(column: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        Type::Text,
        format!("invalid datetime '{value}'").into(),
    )
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn path_to_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<RepositoryRecord> {
    Ok(RepositoryRecord {
        key: RepositoryKey::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?),
        clone_url: row.get(2)?,
        local_path: row.get::<_, Option<String>>(3)?.map(PathBuf::from),
        last_synced_at: row.get::<_, Option<String>>(4)?.and_then(|s| {
            let parsed = parse_datetime(&s);
            if parsed.is_none() {
                tracing::warn!("Ignoring invalid last_synced_at '{s}'");
            }
            parsed
        }),
    })
}

fn row_to_membership(row: &Row<'_>) -> rusqlite::Result<ProjectMembership> {
    Ok(ProjectMembership {
        project: row.get(0)?,
        key: RepositoryKey::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
    })
}

// Overwrites clone_url and path, never last_synced_at.
fn upsert_repository(tx: &Transaction<'_>, row: &RegistryUpsert) -> Result<()> {
    tx.execute(
        "INSERT INTO repositories (repository_owner, repository_name, clone_url, repository_path)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (repository_owner, repository_name) DO UPDATE SET
            clone_url = excluded.clone_url,
            repository_path = excluded.repository_path",
        params![
            row.key.owner,
            row.key.name,
            row.clone_url,
            path_to_text(&row.local_path),
        ],
    )?;
    Ok(())
}

fn upsert_membership(tx: &Transaction<'_>, project: &str, key: &RepositoryKey) -> Result<bool> {
    let inserted = tx.execute(
        "INSERT INTO projects (project, repository_owner, repository_name)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (project, repository_owner, repository_name) DO NOTHING",
        params![project, key.owner, key.name],
    )?;
    Ok(inserted > 0)
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn is_initialized(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type = 'table' AND name IN ('candidates', 'projects', 'repositories')",
            [],
            |row| row.get(0),
        )?;
        Ok(count == 3)
    }

    // Candidate snapshot operations

    fn replace_candidates(&self, entries: &[CandidateEntry]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM candidates", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO candidates
                    (project, repository_owner, repository_name, query_text, queried_at, clone_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.project,
                    entry.key.owner,
                    entry.key.name,
                    entry.query_text,
                    format_datetime(&entry.queried_at),
                    entry.clone_url,
                ])?;
            }
        }
        let stored: i64 = tx.query_row("SELECT COUNT(*) FROM candidates", [], |row| row.get(0))?;
        tx.commit()?;
        Ok(stored as usize)
    }

    fn list_candidates(&self) -> Result<Vec<CandidateEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT project, repository_owner, repository_name, query_text, queried_at, clone_url
             FROM candidates ORDER BY seq",
        )?;

        let rows = stmt.query_map([], |row| {
            let queried_at: String = row.get(4)?;
            Ok(CandidateEntry {
                project: row.get(0)?,
                key: RepositoryKey::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
                query_text: row.get(3)?,
                queried_at: parse_datetime(&queried_at)
                    .ok_or_else(|| invalid_datetime(4, &queried_at))?,
                clone_url: row.get(5)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Registry writes

    fn apply_merge(&self, rows: &[RegistryUpsert]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for row in rows {
            upsert_membership(&tx, &row.project, &row.key)?;
            upsert_repository(&tx, row)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn apply_project_sync(&self, project: &str, rows: &[RegistryUpsert]) -> Result<SyncReport> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut report = SyncReport::default();

        let existing: Vec<RepositoryKey> = {
            let mut stmt = tx.prepare(
                "SELECT repository_owner, repository_name FROM projects WHERE project = ?1",
            )?;
            let keys = stmt.query_map(params![project], |row| {
                Ok(RepositoryKey::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                ))
            })?;
            keys.collect::<std::result::Result<Vec<_>, _>>()?
        };

        let wanted: HashSet<&RepositoryKey> = rows.iter().map(|r| &r.key).collect();

        for row in rows {
            if upsert_membership(&tx, project, &row.key)? {
                report.added += 1;
            } else {
                report.refreshed += 1;
            }
            upsert_repository(&tx, row)?;
        }

        for key in existing.iter().filter(|k| !wanted.contains(k)) {
            report.removed += tx.execute(
                "DELETE FROM projects
                 WHERE project = ?1 AND repository_owner = ?2 AND repository_name = ?3",
                params![project, key.owner, key.name],
            )?;
        }

        tx.commit()?;
        Ok(report)
    }

    fn prune_orphans(&self) -> Result<usize> {
        let removed = self.conn().execute(
            "DELETE FROM repositories
             WHERE NOT EXISTS (
                SELECT 1 FROM projects
                WHERE projects.repository_owner = repositories.repository_owner
                  AND projects.repository_name = repositories.repository_name
             )",
            [],
        )?;
        Ok(removed)
    }

    fn set_last_synced(&self, key: &RepositoryKey, at: DateTime<Utc>) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE repositories SET last_synced_at = ?1
             WHERE repository_owner = ?2 AND repository_name = ?3",
            params![format_datetime(&at), key.owner, key.name],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(format!("repository {key}")));
        }
        Ok(())
    }

    // Registry reads

    fn get_repository(&self, key: &RepositoryKey) -> Result<Option<RepositoryRecord>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT repository_owner, repository_name, clone_url, repository_path, last_synced_at
             FROM repositories WHERE repository_owner = ?1 AND repository_name = ?2",
            params![key.owner, key.name],
            row_to_record,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_repositories(&self, project: Option<&str>) -> Result<Vec<RepositoryRecord>> {
        let conn = self.conn();

        if let Some(project) = project {
            let mut stmt = conn.prepare(
                "SELECT r.repository_owner, r.repository_name, r.clone_url, r.repository_path,
                        r.last_synced_at
                 FROM repositories r
                 JOIN projects p ON p.repository_owner = r.repository_owner
                    AND p.repository_name = r.repository_name
                 WHERE p.project = ?1
                 ORDER BY r.repository_owner, r.repository_name",
            )?;
            let rows = stmt.query_map(params![project], row_to_record)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::from)
        } else {
            let mut stmt = conn.prepare(
                "SELECT repository_owner, repository_name, clone_url, repository_path, last_synced_at
                 FROM repositories
                 ORDER BY repository_owner, repository_name",
            )?;
            let rows = stmt.query_map([], row_to_record)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::from)
        }
    }

    fn list_members(&self, project: Option<&str>) -> Result<Vec<RepositoryRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT repository_owner, repository_name, clone_url, repository_path, last_synced_at
             FROM repositories r
             WHERE EXISTS (
                SELECT 1 FROM projects p
                WHERE p.repository_owner = r.repository_owner
                  AND p.repository_name = r.repository_name
                  AND (?1 IS NULL OR p.project = ?1)
             )
             ORDER BY repository_owner, repository_name",
        )?;

        let rows = stmt.query_map(params![project], row_to_record)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_memberships(&self, project: Option<&str>) -> Result<Vec<ProjectMembership>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT project, repository_owner, repository_name
             FROM projects
             WHERE ?1 IS NULL OR project = ?1
             ORDER BY project, repository_owner, repository_name",
        )?;

        let rows = stmt.query_map(params![project], row_to_membership)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT project, COUNT(*) FROM projects GROUP BY project ORDER BY project",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(ProjectSummary {
                project: row.get(0)?,
                repositories: row.get(1)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}
