use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("setup error: {0}")]
    Setup(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("credentials rejected: {0}")]
    Credential(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("remote search failed: {0}")]
    Remote(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error(
        "no candidates for project '{0}' in the current snapshot; run a query first or pass --allow-empty"
    )]
    EmptySnapshot(String),
}

pub type Result<T> = std::result::Result<T, Error>;
