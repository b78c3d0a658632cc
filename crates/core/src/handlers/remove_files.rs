//! Delete top-level files matching glob or regex patterns
//!
//! `root-project` patterns apply to the workspace root, `sub-projects`
//! patterns to every project unit. Directories are never deleted.

use crate::discovery::build_glob_matcher;
use crate::fs_ops::FileOperations;
use crate::handler::{MigrationHandler, ProjectUnit};
use crate::report::MigrationReport;
use crate::steps::StepDescriptor;
use anyhow::{Context, Result};
use globset::GlobSet;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const ROOT_PROJECT_OPTION: &str = "root-project";
pub const SUB_PROJECTS_OPTION: &str = "sub-projects";

#[derive(Debug, Default, Deserialize)]
struct PatternOptions {
    #[serde(default)]
    glob: Vec<String>,
    #[serde(default)]
    regex: Vec<String>,
}

/// Compiled file-name patterns of one scope
#[derive(Debug, Default)]
struct FileNameMatcher {
    globs: Option<GlobSet>,
    regexes: Vec<Regex>,
}

impl FileNameMatcher {
    fn compile(options: PatternOptions) -> Result<Self> {
        let globs = if options.glob.is_empty() {
            None
        } else {
            Some(build_glob_matcher(&options.glob).context("invalid glob pattern")?)
        };
        let regexes = options
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(&format!("^(?:{})$", pattern))
                    .with_context(|| format!("invalid regex pattern '{}'", pattern))
            })
            .collect::<Result<_>>()?;
        Ok(Self { globs, regexes })
    }

    fn is_empty(&self) -> bool {
        self.globs.is_none() && self.regexes.is_empty()
    }

    fn matches(&self, file_name: &str) -> bool {
        self.globs.as_ref().is_some_and(|globs| globs.is_match(file_name))
            || self.regexes.iter().any(|regex| regex.is_match(file_name))
    }

    /// Delete the matching regular files directly inside `dir`
    fn delete_in(&self, dir: &Path, ops: &FileOperations<'_>) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("Failed to list '{}'", dir.display()))? {
            let path = entry?.path();
            let matched = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| self.matches(name));
            if path.is_file() && matched {
                files.push(path);
            }
        }
        files.sort();
        for file in files {
            debug!(file = %file.display(), "deleting file");
            ops.delete_path(&file);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RemoveFiles {
    root: FileNameMatcher,
    units: FileNameMatcher,
}

impl MigrationHandler for RemoveFiles {
    fn configure(&mut self, step: &StepDescriptor) -> Result<()> {
        let root: PatternOptions = step.options.get(ROOT_PROJECT_OPTION)?.unwrap_or_default();
        let units: PatternOptions = step.options.get(SUB_PROJECTS_OPTION)?.unwrap_or_default();
        self.root = FileNameMatcher::compile(root)?;
        self.units = FileNameMatcher::compile(units)?;
        Ok(())
    }

    fn migrate_root(&mut self, root: &ProjectUnit, report: &MigrationReport) -> Result<()> {
        info!(root = %root.name, "removing files of root project");
        self.root.delete_in(&root.path, &FileOperations::new(report, &root.name))
    }

    fn migrate(&mut self, unit: &ProjectUnit, report: &MigrationReport) -> Result<()> {
        info!(unit = %unit.name, "removing files");
        self.units.delete_in(&unit.path, &FileOperations::new(report, &unit.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STEP: &str = r#"
migrator: RemoveFiles
options:
  root-project:
    glob:
      - "*.bak"
  sub-projects:
    glob:
      - "*.bak"
    regex:
      - ".*\\.orig"
"#;

    fn handler() -> RemoveFiles {
        let mut handler = RemoveFiles::default();
        handler
            .configure(&StepDescriptor::from_yaml("s.yml", STEP).unwrap())
            .unwrap();
        handler
    }

    #[test]
    fn test_unit_patterns() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for name in ["build.gradle.bak", "a.orig", "a.original", "build.gradle"] {
            fs::write(root.join(name), "").unwrap();
        }
        fs::create_dir(root.join("dir.bak")).unwrap();

        let unit = ProjectUnit::from_path(root);
        let report = MigrationReport::new();
        handler().migrate(&unit, &report).unwrap();

        assert!(!root.join("build.gradle.bak").exists());
        assert!(!root.join("a.orig").exists());
        assert!(root.join("a.original").exists());
        assert!(root.join("build.gradle").exists());
        assert!(root.join("dir.bak").is_dir());
        assert_eq!(report.counts(&unit.name).success, 2);
    }

    #[test]
    fn test_root_patterns() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("settings.gradle.bak"), "").unwrap();
        fs::write(root.join("notes.orig"), "").unwrap();

        let unit = ProjectUnit::from_path(root);
        handler().migrate_root(&unit, &MigrationReport::new()).unwrap();

        assert!(!root.join("settings.gradle.bak").exists());
        assert!(root.join("notes.orig").exists());
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let step = StepDescriptor::from_yaml(
            "s.yml",
            "migrator: RemoveFiles\noptions:\n  sub-projects:\n    regex:\n      - \"*.bak\"\n",
        )
        .unwrap();
        assert!(RemoveFiles::default().configure(&step).is_err());
    }
}
