use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory under which clones land as `<base_path>/<owner>/<name>`.
    pub base_path: PathBuf,
    /// History depth for fresh clones. Zero means a full clone.
    pub clone_depth: u32,
    /// Upper bound on repositories materialized at the same time.
    pub workers: usize,
    pub search: SearchSettings,
    /// Default search expression per project, used when `query` gets no
    /// explicit expression.
    pub projects: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub api_url: String,
    pub sort: String,
    pub per_page: u32,
    /// Environment variable holding the API token.
    pub token_env: String,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        if self.search.per_page == 0 || self.search.per_page > 100 {
            return Err(Error::Config(
                "search.per_page must be between 1 and 100".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn query_for(&self, project: &str) -> Option<&str> {
        self.projects.get(project).map(String::as_str)
    }

    #[must_use]
    pub fn api_token(&self) -> Option<String> {
        std::env::var(&self.search.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

impl Default for Settings {
    fn default() -> Self {
        let projects = [
            ("python", "language:python archived:false"),
            ("jupyter", "language:\"Jupyter Notebook\" archived:false"),
            ("java", "language:java archived:false"),
        ]
        .into_iter()
        .map(|(p, q)| (p.to_string(), q.to_string()))
        .collect();

        Self {
            base_path: PathBuf::from("./repositories"),
            clone_depth: 1,
            workers: 4,
            search: SearchSettings::default(),
            projects,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            sort: "stars".to_string(),
            per_page: 100,
            token_env: "GITHUB_TOKEN".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_builtin_projects() {
        let settings = Settings::default();
        assert_eq!(
            settings.query_for("python"),
            Some("language:python archived:false")
        );
        assert!(settings.query_for("java").is_some());
        assert!(settings.query_for("cobol").is_none());
        assert_eq!(settings.clone_depth, 1);
    }

    #[test]
    fn test_from_toml_overrides_and_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
base_path = "/srv/mirrors"
workers = 8

[search]
sort = "updated"

[projects]
rust = "language:rust"
"#,
        )
        .unwrap();

        assert_eq!(settings.base_path, PathBuf::from("/srv/mirrors"));
        assert_eq!(settings.workers, 8);
        assert_eq!(settings.search.sort, "updated");
        assert_eq!(settings.search.api_url, "https://api.github.com");
        assert_eq!(settings.query_for("rust"), Some("language:rust"));
        // An explicit table replaces the builtin templates.
        assert!(settings.query_for("python").is_none());
    }

    #[test]
    fn test_from_toml_rejects_zero_workers() {
        let result = Settings::from_toml("workers = 0");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let result = Settings::load(&temp.path().join("missing.toml"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
