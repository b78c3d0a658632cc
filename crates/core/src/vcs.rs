//! Version-control checkpoints between steps
//!
//! The pipeline only needs two questions answered: are there uncommitted
//! changes, and can they be committed. [`GitRepository`] answers them by
//! running the `git` executable.

use crate::error::MigrationError;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, info};

/// Parent directories searched for a `.git` entry by default
pub const DEFAULT_SEARCH_DEPTH: usize = 5;

/// Version-control collaborator used for best-effort checkpoints
pub trait VersionControl {
    fn has_uncommitted_changes(&self) -> Result<bool>;

    /// Commit every pending change; `Ok(None)` when there was nothing to commit
    fn commit(&self, message: &str) -> Result<Option<String>>;
}

/// A git working tree driven through the `git` command line
#[derive(Debug, Clone)]
pub struct GitRepository {
    root: PathBuf,
}

impl GitRepository {
    /// Find the working tree containing `start`
    ///
    /// Looks for `.git` in `start` and up to `max_depth` parent directories.
    /// Fails when `git` is not installed, no repository is found, or no author
    /// identity is configured.
    pub fn discover(start: &Path, max_depth: usize) -> Result<Self, MigrationError> {
        run_git(start, &["--version"]).map_err(|err| {
            MigrationError::VersionControl(format!("git executable not usable: {err:#}"))
        })?;

        let root = start
            .ancestors()
            .take(max_depth + 1)
            .find(|dir| dir.join(".git").exists())
            .ok_or_else(|| {
                MigrationError::VersionControl(format!(
                    "no git repository found at '{}' or its {} parent directories",
                    start.display(),
                    max_depth
                ))
            })?
            .to_path_buf();

        let repository = Self { root };
        for key in ["user.name", "user.email"] {
            if repository.config(key).is_none() {
                return Err(MigrationError::VersionControl(format!(
                    "git '{}' is not configured for '{}'",
                    key,
                    repository.root.display()
                )));
            }
        }

        debug!(root = %repository.root.display(), "using git repository");
        Ok(repository)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn config(&self, key: &str) -> Option<String> {
        let output = run_git(&self.root, &["config", "--get", key]).ok()?;
        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!value.is_empty()).then_some(value)
    }

    fn git(&self, args: &[&str]) -> Result<Output> {
        let output = run_git(&self.root, args)?;
        if !output.status.success() {
            bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output)
    }
}

impl VersionControl for GitRepository {
    fn has_uncommitted_changes(&self) -> Result<bool> {
        let output = self.git(&["status", "--porcelain"])?;
        Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }

    fn commit(&self, message: &str) -> Result<Option<String>> {
        if !self.has_uncommitted_changes()? {
            return Ok(None);
        }
        self.git(&["add", "-A"]).context("Failed to stage changes")?;
        self.git(&["commit", "-m", message])
            .context("Failed to create commit")?;

        let output = self.git(&["rev-parse", "HEAD"])?;
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!(commit = %id, %message, "created checkpoint commit");
        Ok(Some(id))
    }
}

fn run_git(dir: &Path, args: &[&str]) -> Result<Output> {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("Failed to run git {}", args.join(" ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn git_available() -> bool {
        Command::new("git").arg("--version").output().is_ok()
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git").args(args).current_dir(dir).status().unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    #[test]
    fn test_discover_without_repository() {
        if !git_available() {
            return;
        }
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir(temp_dir.path().join(".git")).unwrap();

        // .git is two levels up, out of reach with depth 1
        let err = GitRepository::discover(&nested, 1).unwrap_err();
        assert!(matches!(err, MigrationError::VersionControl(_)));
    }

    #[test]
    fn test_commit_roundtrip() {
        if !git_available() {
            return;
        }
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        git(root, &["init", "-q"]);
        git(root, &["config", "user.name", "Migrator Test"]);
        git(root, &["config", "user.email", "migrator@example.com"]);

        let unit = root.join("app_core");
        fs::create_dir(&unit).unwrap();
        let repository = GitRepository::discover(&unit, DEFAULT_SEARCH_DEPTH).unwrap();
        assert_eq!(
            repository.root().canonicalize().unwrap(),
            root.canonicalize().unwrap()
        );

        assert!(!repository.has_uncommitted_changes().unwrap());
        assert!(repository.commit("nothing").unwrap().is_none());

        fs::write(unit.join("build.gradle"), "apply plugin: 'java'\n").unwrap();
        assert!(repository.has_uncommitted_changes().unwrap());

        let id = repository.commit("refactor: first step").unwrap().unwrap();
        assert_eq!(id.len(), 40);
        assert!(!repository.has_uncommitted_changes().unwrap());
    }
}
