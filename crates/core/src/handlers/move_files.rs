//! Relocate files and folders of the legacy `staticfiles` layout
//!
//! The map-driven handlers read `source-map` and `target-map`, two maps
//! sharing their keys. Paths are relative to the unit and may use
//! `{cartridgeName}`. `MoveArtifacts` needs no options.

use crate::fs_ops::FileOperations;
use crate::handler::{MigrationHandler, ProjectUnit};
use crate::report::{MigrationReport, OperationKind};
use crate::steps::StepDescriptor;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const SOURCE_MAP_OPTION: &str = "source-map";
pub const TARGET_MAP_OPTION: &str = "target-map";
pub const FILTER_MAP_OPTION: &str = "filter-map";

const STATIC_FILES_DIR: &str = "staticfiles";
const STATIC_CARTRIDGE_DIR: &str = "cartridge";

/// Top-level folders of `staticfiles/cartridge` holding artifacts
const ARTIFACT_TYPES: &[&str] = &[
    "config",
    "dbprepare",
    "extensions",
    "impex",
    "localizations",
    "pagelets",
    "pipelines",
    "queries",
    "templates",
    "webforms",
];
const TEMPLATES_DIR: &str = "templates";

/// `(source, target)` templates per artifact key
fn read_mappings(step: &StepDescriptor) -> Result<BTreeMap<String, (String, String)>> {
    let sources = step.options.string_map(SOURCE_MAP_OPTION)?;
    let mut targets = step.options.string_map(TARGET_MAP_OPTION)?;
    let mut mappings = BTreeMap::new();
    for (key, source) in sources {
        let Some(target) = targets.remove(&key) else {
            bail!("'{}' has no entry in '{}'", key, TARGET_MAP_OPTION);
        };
        mappings.insert(key, (source, target));
    }
    if !targets.is_empty() {
        warn!(step = %step.name, keys = ?targets.keys().collect::<Vec<_>>(), "targets without source");
    }
    Ok(mappings)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list '{}'", dir.display()))? {
        entries.push(entry?.path());
    }
    entries.sort();
    Ok(entries)
}

fn compile_filters(step: &StepDescriptor) -> Result<BTreeMap<String, Regex>> {
    step.options
        .string_map(FILTER_MAP_OPTION)?
        .into_iter()
        .map(|(key, pattern)| {
            let filter = Regex::new(&format!("^(?:{})$", pattern))
                .with_context(|| format!("invalid filter for '{}'", key))?;
            Ok((key, filter))
        })
        .collect()
}

/// Delete empty directories below `root`, and `root` itself when it ends up empty
fn remove_empty_dirs(root: &Path) -> Result<()> {
    for entry in WalkDir::new(root).contents_first(true) {
        let entry = entry.with_context(|| format!("Failed to walk '{}'", root.display()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        let is_empty = fs::read_dir(path)
            .with_context(|| format!("Failed to list '{}'", path.display()))?
            .next()
            .is_none();
        if is_empty {
            fs::remove_dir(path).with_context(|| format!("Failed to remove '{}'", path.display()))?;
            debug!(dir = %path.display(), "removed empty directory");
        }
    }
    Ok(())
}

/// Move the files of a folder whose names fully match a filter
#[derive(Debug, Default)]
pub struct MoveFiles {
    mappings: BTreeMap<String, (String, String)>,
    filters: BTreeMap<String, Regex>,
}

impl MoveFiles {
    fn should_move(&self, key: &str, file_name: &str) -> bool {
        self.filters.get(key).is_some_and(|filter| filter.is_match(file_name))
    }
}

impl MigrationHandler for MoveFiles {
    fn configure(&mut self, step: &StepDescriptor) -> Result<()> {
        self.mappings = read_mappings(step)?;
        self.filters = compile_filters(step)?;
        Ok(())
    }

    fn migrate(&mut self, unit: &ProjectUnit, report: &MigrationReport) -> Result<()> {
        info!(unit = %unit.name, "moving files");
        let ops = FileOperations::new(report, &unit.name);

        for (key, (source, target)) in &self.mappings {
            let source = unit.resolve(source);
            if !source.is_dir() {
                debug!(unit = %unit.name, source = %source.display(), "source folder not found");
                continue;
            }
            let target = unit.resolve(target);
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create '{}'", target.display()))?;

            for file in sorted_entries(&source)? {
                if !file.is_file() {
                    continue;
                }
                let Some(name) = file.file_name().and_then(|name| name.to_str()) else {
                    continue;
                };
                if self.should_move(key, name) {
                    ops.move_path(&file, &target.join(name));
                }
            }
        }
        Ok(())
    }
}

/// Move whole folders and flag what is left in `staticfiles`
#[derive(Debug, Default)]
pub struct MoveFolder {
    mappings: BTreeMap<String, (String, String)>,
}

impl MoveFolder {
    /// Record every remaining `staticfiles` entry as UNKNOWN
    fn check_remaining_static_files(unit: &ProjectUnit, report: &MigrationReport) -> Result<()> {
        let static_files = unit.path.join(STATIC_FILES_DIR);
        if !static_files.is_dir() {
            return Ok(());
        }

        let static_cartridge = static_files.join(STATIC_CARTRIDGE_DIR);
        if static_cartridge.is_dir() {
            for dir in sorted_entries(&static_cartridge)?.into_iter().filter(|p| p.is_dir()) {
                warn!(unit = %unit.name, dir = %dir.display(), "unmapped directory in staticfiles/cartridge");
                report.record_unknown(
                    &unit.name,
                    OperationKind::Move,
                    &dir,
                    None,
                    "Unmapped directory in staticfiles/cartridge",
                );
            }
        }

        for entry in sorted_entries(&static_files)? {
            if entry.is_dir() {
                if entry.file_name().is_some_and(|name| name == STATIC_CARTRIDGE_DIR) {
                    continue;
                }
                warn!(unit = %unit.name, dir = %entry.display(), "unmapped directory in staticfiles");
                report.record_unknown(&unit.name, OperationKind::Move, &entry, None, "Unmapped directory in staticfiles");
            } else if entry.is_file() {
                warn!(unit = %unit.name, file = %entry.display(), "unmapped file in staticfiles");
                report.record_unknown(&unit.name, OperationKind::Move, &entry, None, "Unmapped file in staticfiles");
            }
        }
        Ok(())
    }
}

impl MigrationHandler for MoveFolder {
    fn configure(&mut self, step: &StepDescriptor) -> Result<()> {
        self.mappings = read_mappings(step)?;
        Ok(())
    }

    fn migrate(&mut self, unit: &ProjectUnit, report: &MigrationReport) -> Result<()> {
        info!(unit = %unit.name, "moving folders");
        let ops = FileOperations::new(report, &unit.name);
        for (source, target) in self.mappings.values() {
            ops.move_path(&unit.resolve(source), &unit.resolve(target));
        }
        Self::check_remaining_static_files(unit, report)
    }
}

/// Move every file below a folder whose path fully matches a filter
///
/// Filters see the absolute path with `/` separators. Files keep their
/// position relative to the source folder. Empty folders left behind are
/// removed.
#[derive(Debug, Default)]
pub struct MoveFilteredFolder {
    mappings: BTreeMap<String, (String, String)>,
    filters: BTreeMap<String, Regex>,
}

impl MoveFilteredFolder {
    fn matching_files(source: &Path, filter: &Regex) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(source).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk '{}'", source.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let normalized = entry.path().to_string_lossy().replace('\\', "/");
            if filter.is_match(&normalized) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

impl MigrationHandler for MoveFilteredFolder {
    fn configure(&mut self, step: &StepDescriptor) -> Result<()> {
        self.mappings = read_mappings(step)?;
        self.filters = compile_filters(step)?;
        if let Some(key) = self.mappings.keys().find(|key| !self.filters.contains_key(*key)) {
            bail!("'{}' has no entry in '{}'", key, FILTER_MAP_OPTION);
        }
        Ok(())
    }

    fn migrate(&mut self, unit: &ProjectUnit, report: &MigrationReport) -> Result<()> {
        info!(unit = %unit.name, "moving filtered folders");
        let ops = FileOperations::new(report, &unit.name);

        for (key, (source, target)) in &self.mappings {
            let source = unit.resolve(source);
            let target = unit.resolve(target);
            if !source.is_dir() {
                report.record_skipped(
                    &unit.name,
                    OperationKind::Move,
                    &source,
                    &target,
                    "Source folder does not exist",
                );
                continue;
            }
            let Some(filter) = self.filters.get(key) else {
                continue;
            };
            for file in Self::matching_files(&source, filter)? {
                let relative = file.strip_prefix(&source).unwrap_or(file.as_path());
                ops.move_path(&file, &target.join(relative));
            }
            remove_empty_dirs(&source)?;
        }
        Ok(())
    }
}

/// Sort the artifact folders of `staticfiles/cartridge` into `src/main`
///
/// Templates go to `src/main/isml/<cartridge>`, everything else to
/// `src/main/resources/resources/<cartridge>`. Archives stay where they
/// are. Top-level `migration*` and `dbinit*` property files travel with
/// the dbprepare artifacts.
#[derive(Debug, Default)]
pub struct MoveArtifacts;

impl MoveArtifacts {
    fn should_migrate(relative: &Path) -> bool {
        let mut components = relative.components();
        let (Some(first), Some(file_name)) = (components.next(), relative.file_name()) else {
            return false;
        };
        let file_name = file_name.to_string_lossy();
        let top = first.as_os_str().to_string_lossy();
        if ARTIFACT_TYPES.contains(&&*top) {
            return !file_name.ends_with(".jar") && !file_name.ends_with(".zip");
        }
        components.next().is_none()
            && file_name.ends_with(".properties")
            && (file_name.starts_with("migration") || file_name.starts_with("dbinit"))
    }

    fn target(unit: &ProjectUnit, relative: &Path) -> PathBuf {
        let source_main = unit.path.join("src/main");
        match relative.strip_prefix(TEMPLATES_DIR) {
            Ok(rest) if !rest.as_os_str().is_empty() => source_main.join("isml").join(&unit.name).join(rest),
            _ => source_main.join("resources/resources").join(&unit.name).join(relative),
        }
    }
}

impl MigrationHandler for MoveArtifacts {
    fn migrate(&mut self, unit: &ProjectUnit, report: &MigrationReport) -> Result<()> {
        let static_cartridge = unit.path.join(STATIC_FILES_DIR).join(STATIC_CARTRIDGE_DIR);
        if !static_cartridge.is_dir() {
            debug!(unit = %unit.name, dir = %static_cartridge.display(), "no static cartridge folder");
            return Ok(());
        }
        info!(unit = %unit.name, "moving artifacts");

        let mut files = Vec::new();
        let mut artifact_dirs = Vec::new();
        for entry in WalkDir::new(&static_cartridge).min_depth(1).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk '{}'", static_cartridge.display()))?;
            let relative = entry.path().strip_prefix(&static_cartridge)?.to_path_buf();
            if !Self::should_migrate(&relative) {
                continue;
            }
            if entry.file_type().is_dir() {
                if entry.depth() == 1 {
                    artifact_dirs.push(entry.into_path());
                }
            } else {
                files.push(relative);
            }
        }

        let ops = FileOperations::new(report, &unit.name);
        for relative in &files {
            ops.move_path(&static_cartridge.join(relative), &Self::target(unit, relative));
        }
        for dir in &artifact_dirs {
            remove_empty_dirs(dir)?;
        }
        Ok(())
    }
}
