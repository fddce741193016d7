//! CLI integration tests for repofleet.
//!
//! Each test uses an isolated temp directory for the database, settings and
//! clones, ensuring tests can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use chrono::Utc;
use git2::{Repository, Signature};
use predicates::prelude::*;
use repofleet::store::{SqliteStore, Store};
use repofleet::types::{CandidateEntry, RepositoryKey};
use serde_json::Value;
use tempfile::TempDir;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn db(&self) -> String {
        self.path().join("repositories.db").to_string_lossy().to_string()
    }

    fn base_path(&self) -> PathBuf {
        self.path().join("clones")
    }

    fn config(&self) -> String {
        let path = self.path().join("settings.toml");
        if !path.exists() {
            let content = format!(
                "base_path = {:?}\nclone_depth = 0\nworkers = 2\n",
                self.base_path().to_string_lossy()
            );
            fs::write(&path, content).expect("write settings");
        }
        path.to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("repofleet").expect("failed to find binary");
        cmd.current_dir(self.path());
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("GITHUB_TOKEN");
        cmd
    }

    fn run(&self, command: &str, extra: &[&str]) -> assert_cmd::assert::Assert {
        let db = self.db();
        let config = self.config();
        let mut args = vec![command, "--db", db.as_str(), "--config", config.as_str()];
        args.extend_from_slice(extra);
        self.cmd().args(args).assert()
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.run("init", &[])
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::new(self.db()).expect("open store")
    }

    fn seed_snapshot(&self, project: &str, repos: &[(&str, &str, &str)]) {
        let entries: Vec<CandidateEntry> = repos
            .iter()
            .map(|(owner, name, url)| CandidateEntry {
                project: project.to_string(),
                key: RepositoryKey::new(*owner, *name),
                query_text: "language:python".to_string(),
                queried_at: Utc::now(),
                clone_url: url.to_string(),
            })
            .collect();
        self.store()
            .replace_candidates(&entries)
            .expect("seed candidates");
    }

    fn list_json(&self, extra: &[&str]) -> Value {
        let output = self.run("list", &[&["--json"], extra].concat()).get_output().clone();
        serde_json::from_slice(&output.stdout).expect("failed to parse JSON")
    }

    fn repo_names(&self, project: &str) -> Vec<String> {
        let list = self.list_json(&["--project", project]);
        list["repositories"]
            .as_array()
            .expect("repositories not an array")
            .iter()
            .map(|r| r["name"].as_str().expect("name not a string").to_string())
            .collect()
    }

    /// Creates a local repository with one commit to act as a clone source.
    fn origin(&self, name: &str) -> String {
        let path = self.path().join("origins").join(name);
        let repo = Repository::init(&path).expect("init origin");
        fs::write(path.join("README.md"), format!("# {name}\n")).expect("write readme");

        let mut index = repo.index().expect("index");
        index.add_path(Path::new("README.md")).expect("add");
        index.write().expect("write index");
        let tree = repo.find_tree(index.write_tree().expect("tree")).expect("find tree");
        let sig = Signature::now("Test", "test@example.com").expect("signature");
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .expect("commit");

        path.to_string_lossy().to_string()
    }
}

#[test]
fn test_init_creates_database() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("Database created"));

    assert!(Path::new(&ctx.db()).exists());
    assert!(ctx.store().is_initialized().unwrap());
}

#[test]
fn test_init_refuses_existing_database() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_init_overwrite_replaces_database() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.seed_snapshot("python", &[("psf", "requests", "url")]);
    ctx.run("add", &[]).success();

    ctx.run("init", &["--overwrite", "--yes"]).success();

    let list = ctx.list_json(&[]);
    assert_eq!(list["repositories"].as_array().unwrap().len(), 0);
}

#[test]
fn test_commands_require_database() {
    let ctx = TestContext::new();

    for command in ["add", "clean-database", "list"] {
        ctx.run(command, &[])
            .failure()
            .stderr(predicate::str::contains("Database not found"));
    }
    ctx.run("download", &[])
        .failure()
        .stderr(predicate::str::contains("Database not found"));
}

#[test]
fn test_query_unknown_project_without_expression() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.run("query", &["--project", "cobol"])
        .failure()
        .stderr(predicate::str::contains("Unknown project 'cobol'"));
}

#[test]
fn test_add_registers_snapshot() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.seed_snapshot(
        "python",
        &[
            ("psf", "requests", "https://github.com/psf/requests.git"),
            ("pallets", "flask", "https://github.com/pallets/flask.git"),
        ],
    );

    ctx.run("add", &[])
        .success()
        .stdout(predicate::str::contains("Added 2 repositories"));

    let list = ctx.list_json(&[]);
    let projects = list["projects"].as_array().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["project"], "python");
    assert_eq!(projects[0]["repositories"], 2);

    let repos = list["repositories"].as_array().unwrap();
    let requests = repos.iter().find(|r| r["name"] == "requests").unwrap();
    let expected = ctx.base_path().join("psf").join("requests");
    assert_eq!(requests["local_path"], expected.to_string_lossy().as_ref());
    assert!(requests["last_synced_at"].is_null());
}

#[test]
fn test_add_base_path_flag_overrides_settings() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.seed_snapshot("python", &[("psf", "requests", "url")]);
    let other = ctx.path().join("elsewhere");

    ctx.run("add", &["--base-path", &other.to_string_lossy()])
        .success();

    let list = ctx.list_json(&[]);
    let expected = other.join("psf").join("requests");
    assert_eq!(
        list["repositories"][0]["local_path"],
        expected.to_string_lossy().as_ref()
    );
}

#[test]
fn test_add_is_idempotent() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.seed_snapshot("python", &[("psf", "requests", "url")]);

    ctx.run("add", &[]).success();
    let first = ctx.list_json(&[]);
    ctx.run("add", &[]).success();

    assert_eq!(ctx.list_json(&[]), first);
}

#[test]
fn test_sync_replaces_project_membership() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.seed_snapshot("P", &[("o", "a", "ua"), ("o", "b", "ub"), ("o", "c", "uc")]);
    ctx.run("add", &[]).success();

    ctx.seed_snapshot("P", &[("o", "b", "ub"), ("o", "c", "uc"), ("o", "d", "ud")]);
    ctx.run("sync", &["--project", "P"])
        .success()
        .stdout(predicate::str::contains("2 kept, 1 added, 1 removed"));

    assert_eq!(ctx.repo_names("P"), vec!["b", "c", "d"]);
}

#[test]
fn test_sync_refuses_empty_snapshot() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.seed_snapshot("P", &[("o", "a", "ua")]);
    ctx.run("add", &[]).success();
    ctx.seed_snapshot("P", &[]);

    ctx.run("sync", &["--project", "P"])
        .failure()
        .stderr(predicate::str::contains("no candidates for project 'P'"));
    assert_eq!(ctx.repo_names("P"), vec!["a"]);

    ctx.run("sync", &["--project", "P", "--allow-empty"])
        .success();
    assert!(ctx.repo_names("P").is_empty());
}

#[test]
fn test_clean_database_removes_orphans() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.seed_snapshot("P", &[("o", "r1", "u1"), ("o", "r2", "u2")]);
    ctx.run("add", &[]).success();
    ctx.seed_snapshot("P", &[("o", "r1", "u1")]);
    ctx.run("sync", &["--project", "P"]).success();

    ctx.run("clean-database", &[])
        .success()
        .stdout(predicate::str::contains("Removed 1 repositories"));

    let list = ctx.list_json(&[]);
    let repos = list["repositories"].as_array().unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0]["name"], "r1");
}

#[test]
fn test_download_empty_registry() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.run("download", &[])
        .success()
        .stdout(predicate::str::contains("No repositories found."));
}

#[test]
fn test_download_clones_then_skips_then_updates() {
    let ctx = TestContext::new();
    ctx.init().success();
    let origin = ctx.origin("widget");
    ctx.seed_snapshot("tools", &[("acme", "widget", &origin)]);
    ctx.run("add", &[]).success();

    ctx.run("download", &[])
        .success()
        .stdout(predicate::str::contains("1 cloned"));
    let clone = ctx.base_path().join("acme").join("widget");
    assert!(clone.join("README.md").exists());
    assert!(!ctx.list_json(&[])["repositories"][0]["last_synced_at"].is_null());

    ctx.run("download", &[])
        .success()
        .stdout(predicate::str::contains("1 skipped"));

    ctx.run("download", &["--update"])
        .success()
        .stdout(predicate::str::contains("1 updated"));
}

#[test]
fn test_download_reports_failures_per_repository() {
    let ctx = TestContext::new();
    ctx.init().success();
    let good = ctx.origin("good");
    let missing = ctx.path().join("origins").join("missing");
    ctx.seed_snapshot(
        "tools",
        &[
            ("acme", "good", &good),
            ("acme", "missing", &missing.to_string_lossy()),
        ],
    );
    ctx.run("add", &[]).success();

    let output = ctx
        .run("download", &["--json"])
        .success()
        .get_output()
        .clone();
    let outcomes: Value = serde_json::from_slice(&output.stdout).expect("failed to parse JSON");
    let outcomes = outcomes.as_array().unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0]["key"]["name"], "good");
    assert_eq!(outcomes[0]["status"], "cloned");
    assert_eq!(outcomes[1]["key"]["name"], "missing");
    assert_eq!(outcomes[1]["status"], "error");
    assert!(!ctx.base_path().join("acme").join("missing").exists());
}

#[test]
fn test_download_project_filter() {
    let ctx = TestContext::new();
    ctx.init().success();
    let one = ctx.origin("one");
    let two = ctx.origin("two");
    ctx.seed_snapshot("first", &[("acme", "one", &one)]);
    ctx.run("add", &[]).success();
    ctx.seed_snapshot("second", &[("acme", "two", &two)]);
    ctx.run("add", &[]).success();

    ctx.run("download", &["--project", "second"])
        .success()
        .stdout(predicate::str::contains("1 cloned"));

    assert!(ctx.base_path().join("acme").join("two").exists());
    assert!(!ctx.base_path().join("acme").join("one").exists());
}

#[test]
fn test_download_skips_repositories_without_project() {
    let ctx = TestContext::new();
    ctx.init().success();
    let kept = ctx.origin("kept");
    let dropped = ctx.origin("dropped");
    ctx.seed_snapshot("P", &[("o", "dropped", &dropped), ("o", "kept", &kept)]);
    ctx.run("add", &[]).success();
    ctx.seed_snapshot("P", &[("o", "kept", &kept)]);
    ctx.run("sync", &["--project", "P"]).success();

    ctx.run("download", &[])
        .success()
        .stdout(predicate::str::contains("1 cloned"))
        .stdout(predicate::str::contains("o/dropped").not());

    assert!(ctx.base_path().join("o").join("kept").exists());
    assert!(!ctx.base_path().join("o").join("dropped").exists());
    assert_eq!(ctx.list_json(&[])["repositories"].as_array().unwrap().len(), 2);
}
