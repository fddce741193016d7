use std::fs;
use std::path::Path;

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Cred, CredentialType, ErrorClass, ErrorCode, FetchOptions, RemoteCallbacks, Repository};

use super::{GitError, VersionControl};

/// [`VersionControl`] backed by libgit2.
#[derive(Debug, Clone, Default)]
pub struct LibGit {
    token: Option<String>,
}

impl LibGit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticates HTTPS remotes with an API token.
    #[must_use]
    pub fn with_token(token: Option<String>) -> Self {
        Self { token }
    }

    fn fetch_options(&self) -> FetchOptions<'_> {
        let mut callbacks = RemoteCallbacks::new();
        if let Some(token) = self.token.as_deref() {
            // libgit2 keeps asking while the server answers 401.
            let mut attempted = false;
            callbacks.credentials(move |_url, _username, allowed| {
                if attempted || !allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
                    return Err(git2::Error::new(
                        ErrorCode::Auth,
                        ErrorClass::Http,
                        "credentials rejected by remote",
                    ));
                }
                attempted = true;
                Cred::userpass_plaintext("x-access-token", token)
            });
        }

        let mut options = FetchOptions::new();
        options.remote_callbacks(callbacks);
        options
    }
}

fn classify(err: &git2::Error) -> GitError {
    let message = err.message().to_string();
    match err.code() {
        ErrorCode::Auth | ErrorCode::Certificate => GitError::Auth(message),
        ErrorCode::NotFound | ErrorCode::UnbornBranch => GitError::NotFound(message),
        ErrorCode::Exists => GitError::Refused(message),
        ErrorCode::Conflict
        | ErrorCode::MergeConflict
        | ErrorCode::NotFastForward
        | ErrorCode::Uncommitted
        | ErrorCode::Unmerged => GitError::Conflict(message),
        _ => match err.class() {
            ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssh | ErrorClass::Ssl => {
                let lower = message.to_lowercase();
                if lower.contains("401") || lower.contains("authentication") {
                    GitError::Auth(message)
                } else if lower.contains("404") || lower.contains("not found") {
                    GitError::NotFound(message)
                } else {
                    GitError::Network(message)
                }
            }
            _ => GitError::Internal(message),
        },
    }
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

fn clear_dir(path: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

impl VersionControl for LibGit {
    fn clone_repo(&self, url: &str, path: &Path, depth: u32) -> Result<(), GitError> {
        let existed = path.exists();
        if existed && !path.is_dir() {
            return Err(GitError::Refused(format!(
                "{} exists and is not a directory",
                path.display()
            )));
        }
        let was_empty = existed && is_empty_dir(path);

        let mut fetch = self.fetch_options();
        if depth > 0 {
            fetch.depth(i32::try_from(depth).unwrap_or(i32::MAX));
        }

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch);

        match builder.clone(url, path) {
            Ok(_) => Ok(()),
            Err(e) => {
                // Leave the target as we found it so the next run sees the same state.
                let cleanup = if !existed && path.exists() {
                    fs::remove_dir_all(path)
                } else if was_empty {
                    clear_dir(path)
                } else {
                    Ok(())
                };
                if let Err(ce) = cleanup {
                    tracing::warn!("Failed to clean up {} after clone error: {ce}", path.display());
                }
                Err(classify(&e))
            }
        }
    }

    fn is_valid_repo(&self, path: &Path) -> bool {
        Repository::open(path)
            .map(|repo| !repo.is_bare() && repo.find_remote("origin").is_ok())
            .unwrap_or(false)
    }

    fn pull(&self, path: &Path) -> Result<(), GitError> {
        let repo = Repository::open(path).map_err(|e| classify(&e))?;

        let head = repo.head().map_err(|e| classify(&e))?;
        if !head.is_branch() {
            return Err(GitError::Conflict("HEAD is detached".to_string()));
        }
        let branch = head
            .shorthand()
            .ok_or_else(|| GitError::Internal("branch name is not valid UTF-8".to_string()))?
            .to_string();
        let refname = format!("refs/heads/{branch}");

        let mut remote = repo.find_remote("origin").map_err(|e| classify(&e))?;
        let mut fetch = self.fetch_options();
        remote
            .fetch(&[branch.as_str()], Some(&mut fetch), None)
            .map_err(|e| classify(&e))?;

        let fetch_head = repo
            .find_reference("FETCH_HEAD")
            .map_err(|e| classify(&e))?;
        let incoming = repo
            .reference_to_annotated_commit(&fetch_head)
            .map_err(|e| classify(&e))?;

        let (analysis, _) = repo
            .merge_analysis(&[&incoming])
            .map_err(|e| classify(&e))?;

        if analysis.is_up_to_date() {
            return Ok(());
        }
        if !analysis.is_fast_forward() {
            return Err(GitError::Conflict(format!(
                "{branch} has diverged from origin"
            )));
        }

        // Check out first so a refused checkout leaves the branch where it was.
        let target = repo
            .find_object(incoming.id(), None)
            .map_err(|e| classify(&e))?;
        repo.checkout_tree(&target, Some(CheckoutBuilder::new().safe()))
            .map_err(|e| classify(&e))?;

        let mut reference = repo.find_reference(&refname).map_err(|e| classify(&e))?;
        reference
            .set_target(incoming.id(), "pull: fast-forward")
            .map_err(|e| classify(&e))?;
        repo.set_head(&refname).map_err(|e| classify(&e))?;

        Ok(())
    }
}
