//! # Repofleet
//!
//! Keeps an inventory of remote repositories grouped into projects and keeps
//! local clones of them up to date. Usable as a standalone binary and as a
//! library.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use repofleet::materialize::Materializer;
//! use repofleet::reconcile::Reconciler;
//! use repofleet::store::{SqliteStore, Store};
//! use repofleet::vcs::LibGit;
//!
//! let store = Arc::new(SqliteStore::new("./repositories.db").unwrap());
//! store.initialize().unwrap();
//!
//! Reconciler::new(store.clone(), "/srv/mirrors").merge().unwrap();
//!
//! let records = store.list_repositories(None).unwrap();
//! let materializer = Materializer::new(Arc::new(LibGit::new()), store).with_workers(4);
//! // materializer.materialize_all(records, true, CancellationToken::new()).await
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the CLI module. Disable with `default-features = false`.
//! - `github` (default, implied by `cli`): GitHub implementation of
//!   [`search::RepositorySearch`].

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod materialize;
pub mod reconcile;
pub mod search;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod vcs;
