use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::RepositoryKey;

/// Computes where a repository is cloned: `<base>/<owner>/<name>`.
pub fn repository_path(base: &Path, key: &RepositoryKey) -> Result<PathBuf> {
    validate_segment(&key.owner)?;
    validate_segment(&key.name)?;
    Ok(base.join(&key.owner).join(&key.name))
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::InvalidPath(
            "Path segment cannot be empty".to_string(),
        ));
    }

    if segment.len() > 255 {
        return Err(Error::InvalidPath(
            "Path segment cannot exceed 255 characters".to_string(),
        ));
    }

    if segment == "." || segment == ".." {
        return Err(Error::InvalidPath(format!(
            "Path segment '{segment}' is not allowed"
        )));
    }

    const INVALID_CHARS: &[char] = &['\0', '\n', '\r', '/', '\\'];
    if segment.chars().any(|c| INVALID_CHARS.contains(&c)) {
        return Err(Error::InvalidPath(format!(
            "Path segment '{}' contains invalid characters",
            segment.escape_default()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_path_joins_owner_and_name() {
        let key = RepositoryKey::new("psf", "requests");
        assert_eq!(
            repository_path(Path::new("/mnt/scratch"), &key).unwrap(),
            PathBuf::from("/mnt/scratch/psf/requests")
        );
    }

    #[test]
    fn test_repository_path_keeps_dots_inside_names() {
        let key = RepositoryKey::new("owner", "dotfiles.vim");
        assert_eq!(
            repository_path(Path::new("base"), &key).unwrap(),
            PathBuf::from("base/owner/dotfiles.vim")
        );
    }

    #[test]
    fn test_repository_path_rejects_traversal() {
        let base = Path::new("/mnt/scratch");
        assert!(repository_path(base, &RepositoryKey::new("..", "x")).is_err());
        assert!(repository_path(base, &RepositoryKey::new("owner", ".")).is_err());
        assert!(repository_path(base, &RepositoryKey::new("a/b", "x")).is_err());
        assert!(repository_path(base, &RepositoryKey::new("owner", "a\\b")).is_err());
        assert!(repository_path(base, &RepositoryKey::new("", "x")).is_err());
    }
}
