//! Project-unit and file discovery
//!
//! Project units are the direct subdirectories of a workspace root that carry
//! a build descriptor. Files inside a unit are found with gitignore-aware
//! globbing, so generated or ignored trees are never rewritten.

use crate::handler::ProjectUnit;
use ignore::WalkBuilder;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File names that mark a directory as a project unit
pub const BUILD_DESCRIPTORS: &[&str] = &["build.gradle", "build.gradle.kts"];

/// Whether `dir` contains one of the [`BUILD_DESCRIPTORS`]
pub fn is_project_unit(dir: &Path) -> bool {
    BUILD_DESCRIPTORS.iter().any(|name| dir.join(name).is_file())
}

/// Direct subdirectories of `root` that are project units, sorted by name
///
/// Hidden directories (`.git`, `.gradle`, ...) are skipped.
pub fn discover_project_units(root: &Path) -> io::Result<Vec<ProjectUnit>> {
    let mut units = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with('.'));
        if !path.is_dir() || hidden {
            continue;
        }
        if is_project_unit(&path) {
            units.push(ProjectUnit::from_path(path));
        } else {
            debug!(dir = %path.display(), "not a project unit");
        }
    }
    units.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(units)
}

/// Discover files matching glob patterns below `root`
///
/// Patterns are matched against the path relative to `root` (e.g.
/// `src/**/*.java`). Returns absolute paths, excluding files matched by
/// `.gitignore`. An unreadable root or an invalid pattern yields no files.
///
/// # Example
/// ```no_run
/// use layout_migrator_core::discovery;
///
/// let sources = discovery::discover_files(std::path::Path::new("app_core"), &["src/**/*.java"]);
/// println!("Found {} files", sources.len());
/// ```
pub fn discover_files(root: &Path, patterns: &[&str]) -> Vec<PathBuf> {
    // Canonical root keeps every returned path absolute
    let canonical_root = match root.canonicalize() {
        Ok(path) => path,
        Err(err) => {
            debug!(root = %root.display(), %err, "can't canonicalize discovery root");
            return Vec::new();
        }
    };

    let glob_matcher = match build_glob_matcher(patterns) {
        Ok(matcher) => matcher,
        Err(err) => {
            warn!(?patterns, %err, "invalid glob pattern");
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    for result in build_walker(&canonical_root) {
        match result {
            Ok(entry) => {
                if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                    continue;
                }
                if let Ok(rel_path) = entry.path().strip_prefix(&canonical_root) {
                    if glob_matcher.is_match(rel_path) {
                        files.push(entry.into_path());
                    }
                }
            }
            Err(err) => {
                warn!(%err, "error walking directory");
            }
        }
    }
    files.sort();
    files
}

/// Build a glob matcher from the provided patterns
pub(crate) fn build_glob_matcher<S: AsRef<str>>(
    patterns: &[S],
) -> Result<globset::GlobSet, globset::Error> {
    use globset::GlobSetBuilder;

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(globset::Glob::new(pattern.as_ref())?);
    }
    builder.build()
}

/// Build a WalkBuilder with proper ignore configuration
fn build_walker(root: &Path) -> ignore::Walk {
    let mut builder = WalkBuilder::new(root);
    builder
        .git_ignore(true)
        .git_exclude(true)
        .hidden(false)
        .parents(true);

    // Outside a git checkout the walker does not pick up .gitignore by itself
    let gitignore_path = root.join(".gitignore");
    if gitignore_path.exists() {
        if let Some(err) = builder.add_ignore(&gitignore_path) {
            warn!(path = %gitignore_path.display(), %err, "can't read ignore file");
        }
    }

    builder.build()
}
