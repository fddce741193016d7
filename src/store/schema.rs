pub const SCHEMA: &str = r#"
-- Result set of the most recent remote query; cleared before every query
CREATE TABLE IF NOT EXISTS candidates (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,  -- insertion order, later rows win
    project TEXT NOT NULL,
    repository_owner TEXT NOT NULL,
    repository_name TEXT NOT NULL,
    query_text TEXT NOT NULL,
    queried_at TEXT NOT NULL,
    clone_url TEXT NOT NULL,

    UNIQUE(repository_owner, repository_name) ON CONFLICT REPLACE
);

-- Project membership: which repositories belong to which project
CREATE TABLE IF NOT EXISTS projects (
    project TEXT NOT NULL,
    repository_owner TEXT NOT NULL,
    repository_name TEXT NOT NULL,
    PRIMARY KEY (project, repository_owner, repository_name)
);

-- Registry of every repository referenced by some project
CREATE TABLE IF NOT EXISTS repositories (
    repository_owner TEXT NOT NULL,
    repository_name TEXT NOT NULL,
    clone_url TEXT NOT NULL,
    repository_path TEXT,         -- NULL until a base path has been applied
    last_synced_at TEXT,          -- NULL = never materialized
    PRIMARY KEY (repository_owner, repository_name)
);

CREATE INDEX IF NOT EXISTS idx_candidates_project ON candidates(project);
CREATE INDEX IF NOT EXISTS idx_projects_repository ON projects(repository_owner, repository_name);
"#;
