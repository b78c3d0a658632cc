//! Shared plumbing for handlers that rewrite a unit's build script

use crate::discovery::BUILD_DESCRIPTORS;
use crate::handler::ProjectUnit;
use crate::position::Position;
use crate::properties::LINE_SEP;
use crate::report::{MigrationReport, OperationKind};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Marker of the dependency declaration block
pub const DEPENDENCIES_MARKER: &str = "dependencies";

/// The unit's build script; `build.gradle` wins over `build.gradle.kts`
pub fn locate(unit: &ProjectUnit) -> Result<PathBuf> {
    BUILD_DESCRIPTORS
        .iter()
        .map(|name| unit.path.join(name))
        .find(|path| path.is_file())
        .with_context(|| format!("no build script in '{}'", unit.path.display()))
}

pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    Ok(content.lines().map(str::to_string).collect())
}

pub fn join_lines(lines: &[String]) -> String {
    let mut content = lines.join(LINE_SEP);
    content.push_str(LINE_SEP);
    content
}

/// Apply `convert` to every line inside the `marker` block
///
/// The marker line and the closing line stay as they are. `convert` returns
/// `None` to drop a line. Without a block the lines come back unchanged.
pub fn rewrite_block<F>(marker: &str, lines: &[String], mut convert: F) -> Vec<String>
where
    F: FnMut(&str) -> Option<String>,
{
    let position = Position::locate(marker, lines);
    let matched = position.matched_lines();
    if matched.len() < 2 {
        return lines.to_vec();
    }

    let mut result = position.lines_before().to_vec();
    result.push(matched[0].clone());
    for line in &matched[1..matched.len() - 1] {
        if line.trim().is_empty() {
            result.push(String::new());
        } else if let Some(converted) = convert(line) {
            result.push(converted);
        }
    }
    result.push(matched[matched.len() - 1].clone());
    result.extend_from_slice(position.lines_after());
    result
}

/// Byte range of the first quoted string in `line`, without the quotes
///
/// Both `'` and `"` are accepted; the closing quote must match the opening one.
pub fn quoted_range(line: &str) -> Option<(usize, usize)> {
    let (open, quote) = line.char_indices().find(|(_, c)| *c == '\'' || *c == '"')?;
    let start = open + 1;
    let len = line[start..].find(quote)?;
    Some((start, start + len))
}

/// First quoted string of `line`, e.g. the coordinate of a declaration
pub fn quoted(line: &str) -> Option<&str> {
    quoted_range(line).map(|(start, end)| &line[start..end])
}

/// Write `lines` back to `path` when they differ from the original content
///
/// Records one SUCCESS MODIFY on change. Unchanged files are left untouched
/// and nothing is recorded.
pub fn write_if_changed(
    report: &MigrationReport,
    unit: &ProjectUnit,
    path: &Path,
    original: &[String],
    lines: &[String],
) -> Result<bool> {
    if original == lines {
        debug!(unit = %unit.name, path = %path.display(), "build script unchanged");
        return Ok(false);
    }
    fs::write(path, join_lines(lines))
        .with_context(|| format!("Failed to write '{}'", path.display()))?;
    report.record_success(&unit.name, OperationKind::Modify, path, path);
    Ok(true)
}

/// Rewrite the dependency block of the unit's build script line by line
pub fn rewrite_dependencies<F>(unit: &ProjectUnit, report: &MigrationReport, convert: F) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    let path = locate(unit)?;
    let original = read_lines(&path)?;
    let lines = rewrite_block(DEPENDENCIES_MARKER, &original, convert);
    write_if_changed(report, unit, &path, &original, &lines)?;
    Ok(())
}

/// Fail when a configured option is missing or empty
pub fn require_non_empty<T>(option: &str, values: &[T]) -> Result<()> {
    if values.is_empty() {
        bail!("option '{}' is required", option);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_rewrite_block_keeps_surroundings() {
        let source = lines(
            "apply plugin: 'java'\ndependencies {\n  implementation 'a:b'\n\n  runtimeOnly 'c:d'\n}\ntasks.x()",
        );
        let result = rewrite_block(DEPENDENCIES_MARKER, &source, |line| {
            (!line.contains("c:d")).then(|| line.replace("a:b", "a:z"))
        });

        assert_eq!(
            result,
            lines("apply plugin: 'java'\ndependencies {\n  implementation 'a:z'\n\n}\ntasks.x()")
        );
    }

    #[test]
    fn test_rewrite_block_without_block() {
        let source = lines("apply plugin: 'java'");
        assert_eq!(rewrite_block(DEPENDENCIES_MARKER, &source, |_| None), source);
    }

    #[test]
    fn test_quoted() {
        assert_eq!(quoted("  implementation 'a:b:1'"), Some("a:b:1"));
        assert_eq!(quoted("  cartridge(project(\":app\"))"), Some(":app"));
        assert_eq!(quoted("  implementation \"a:b'"), None);
        assert_eq!(quoted("  implementation platform"), None);
    }
}
