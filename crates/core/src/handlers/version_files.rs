//! Fold legacy `*.version` files into the `versions` platform project
//!
//! A version file holds `group:name = version` lines. Each one becomes an
//! `api "group:name:version"` constraint of `versions/build.gradle.kts`, and
//! the version files are deleted afterwards.

use super::build_script::{join_lines, read_lines};
use crate::discovery::build_glob_matcher;
use crate::fs_ops::FileOperations;
use crate::handler::{MigrationHandler, ProjectUnit};
use crate::position::Position;
use crate::report::{MigrationReport, OperationKind};
use anyhow::{bail, Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const VERSIONS_DIR: &str = "versions";
pub const BUILD_GRADLE_KTS: &str = "build.gradle.kts";

const CONSTRAINTS_MARKER: &str = "constraints";
const VERSION_FILES: &str = "*.version";
const EXCLUDED_VERSION_FILES: &str = "{.ivy*,.pom*,intershopBuild}.version";

/// File name → migrated `group:name:version` coordinates
pub type VersionData = BTreeMap<String, BTreeSet<String>>;

/// `group:name = version` → `group:name:version`; `None` for anything else
pub fn migrate_version_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || !line.contains('=') {
        return None;
    }
    Some(line.replace(' ', "").replace('=', ":"))
}

/// Top-level `*.version` files of `root`, sorted, without build-tool files
pub fn collect_version_files(root: &Path) -> Result<Vec<PathBuf>> {
    let include = build_glob_matcher(&[VERSION_FILES])?;
    let exclude = build_glob_matcher(&[EXCLUDED_VERSION_FILES])?;

    let mut files = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("Failed to list '{}'", root.display()))? {
        let path = entry?.path();
        let Some(name) = path.file_name() else {
            continue;
        };
        if path.is_file() && include.is_match(name) && !exclude.is_match(name) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Insert the collected constraints right after the `constraints {` line
///
/// Returns `None` when the script has no constraints block.
pub fn insert_constraints(lines: &[String], data: &VersionData) -> Option<Vec<String>> {
    let position = Position::locate(CONSTRAINTS_MARKER, lines);
    let (opening, rest) = position.matched_lines().split_first()?;

    let mut result = position.lines_before().to_vec();
    result.push(opening.clone());
    for (file, coordinates) in data {
        result.push(String::new());
        result.push(format!("        // migrated version information of '{}'", file));
        result.extend(coordinates.iter().map(|coordinate| format!("        api \"{}\"", coordinate)));
    }
    result.push(String::new());
    result.extend_from_slice(rest);
    result.extend_from_slice(position.lines_after());
    Some(result)
}

#[derive(Debug, Default)]
pub struct MigrateVersionFiles;

impl MigrateVersionFiles {
    fn versions_build(root: &ProjectUnit) -> PathBuf {
        root.path.join(VERSIONS_DIR).join(BUILD_GRADLE_KTS)
    }
}

impl MigrationHandler for MigrateVersionFiles {
    fn prepare_root(&mut self, root: &ProjectUnit, report: &MigrationReport) {
        let build = Self::versions_build(root);
        if !build.is_file() {
            report.record_critical_error(format!(
                "'{}' does not exist in '{}'",
                BUILD_GRADLE_KTS,
                root.path.join(VERSIONS_DIR).display()
            ));
        }
    }

    fn migrate_root(&mut self, root: &ProjectUnit, report: &MigrationReport) -> Result<()> {
        let files = collect_version_files(&root.path)?;
        if files.is_empty() {
            info!(root = %root.path.display(), "no version files to migrate");
            return Ok(());
        }

        let mut data = VersionData::new();
        for file in &files {
            info!(file = %file.display(), "migrating version information");
            let coordinates = read_lines(file)?
                .iter()
                .filter_map(|line| migrate_version_line(line))
                .collect();
            let name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            data.insert(name, coordinates);
        }

        let build = Self::versions_build(root);
        let lines = read_lines(&build)?;
        let Some(migrated) = insert_constraints(&lines, &data) else {
            bail!("no '{}' block in '{}'", CONSTRAINTS_MARKER, build.display());
        };
        fs::write(&build, join_lines(&migrated))
            .with_context(|| format!("Failed to write '{}'", build.display()))?;
        report.record_success(&root.name, OperationKind::Modify, &build, &build);

        let ops = FileOperations::new(report, &root.name);
        for file in &files {
            ops.delete_path(file);
        }
        Ok(())
    }

    fn migrate(&mut self, _unit: &ProjectUnit, _report: &MigrationReport) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VERSIONS_BUILD: &str = "plugins {\n    `java-platform`\n}\n\ndependencies {\n    constraints {\n        api(\"a:b:1\")\n    }\n}\n";

    #[test]
    fn test_migrate_version_line() {
        assert_eq!(
            migrate_version_line("com.example:lib = 1.2.3"),
            Some("com.example:lib:1.2.3".to_string())
        );
        assert_eq!(migrate_version_line("# comment"), None);
        assert_eq!(migrate_version_line(""), None);
        assert_eq!(migrate_version_line("garbage"), None);
    }

    #[test]
    fn test_prepare_requires_versions_build() {
        let temp_dir = TempDir::new().unwrap();
        let root = ProjectUnit::from_path(temp_dir.path());
        let report = MigrationReport::new();

        MigrateVersionFiles.prepare_root(&root, &report);
        assert!(report.has_critical_errors());
        assert!(report.critical_errors()[0].starts_with("'build.gradle.kts' does not exist in"));
    }

    #[test]
    fn test_migrate_root() {
        let temp_dir = TempDir::new().unwrap();
        let root_dir = temp_dir.path();
        fs::create_dir(root_dir.join(VERSIONS_DIR)).unwrap();
        fs::write(root_dir.join("versions/build.gradle.kts"), VERSIONS_BUILD).unwrap();
        fs::write(
            root_dir.join("project.version"),
            "# third party\ncom.example:lib = 1.2.3\n\norg.example:other=4.5\n",
        )
        .unwrap();
        fs::write(root_dir.join("intershopBuild.version"), "x:y = 1\n").unwrap();
        fs::write(root_dir.join(".ivyplugin.version"), "x:y = 1\n").unwrap();

        let root = ProjectUnit::from_path(root_dir);
        let report = MigrationReport::new();
        let mut handler = MigrateVersionFiles;
        handler.prepare_root(&root, &report);
        assert!(!report.has_critical_errors());
        handler.migrate_root(&root, &report).unwrap();

        assert_eq!(
            fs::read_to_string(root_dir.join("versions/build.gradle.kts")).unwrap(),
            "plugins {\n    `java-platform`\n}\n\ndependencies {\n    constraints {\n\n        \
             // migrated version information of 'project.version'\n        \
             api \"com.example:lib:1.2.3\"\n        \
             api \"org.example:other:4.5\"\n\n        \
             api(\"a:b:1\")\n    }\n}\n"
        );
        assert!(!root_dir.join("project.version").exists());
        assert!(root_dir.join("intershopBuild.version").exists());
        assert!(root_dir.join(".ivyplugin.version").exists());

        let counts = report.counts(&root.name);
        assert_eq!(counts.success, 2);
    }

    #[test]
    fn test_missing_constraints_block_keeps_version_files() {
        let temp_dir = TempDir::new().unwrap();
        let root_dir = temp_dir.path();
        fs::create_dir(root_dir.join(VERSIONS_DIR)).unwrap();
        fs::write(root_dir.join("versions/build.gradle.kts"), "plugins {}\n").unwrap();
        fs::write(root_dir.join("project.version"), "a:b = 1\n").unwrap();

        let root = ProjectUnit::from_path(root_dir);
        assert!(MigrateVersionFiles.migrate_root(&root, &MigrationReport::new()).is_err());
        assert!(root_dir.join("project.version").exists());
    }
}
