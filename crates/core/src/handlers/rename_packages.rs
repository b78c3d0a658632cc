//! Rename Java package prefixes in source files below `src/`

use crate::discovery::discover_files;
use crate::handler::{MigrationHandler, ProjectUnit};
use crate::report::{MigrationReport, OperationKind};
use crate::steps::StepDescriptor;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const PACKAGE_MAP_OPTION: &str = "package-map";
pub const FILE_EXTENSION_OPTION: &str = "file-extension";

const PACKAGE_SEPARATOR: char = '.';

#[derive(Debug, Default)]
pub struct RenamePackages {
    /// Old → new package, both ending with `.`
    packages: BTreeMap<String, String>,
    extensions: Vec<String>,
}

/// Terminate `package` with a separator so `a.b` does not match `a.bc`
fn package_prefix(package: &str) -> String {
    if package.ends_with(PACKAGE_SEPARATOR) {
        package.to_string()
    } else {
        format!("{}{}", package, PACKAGE_SEPARATOR)
    }
}

impl RenamePackages {
    pub fn new(packages: BTreeMap<String, String>, extensions: Vec<String>) -> Self {
        Self {
            packages: packages
                .iter()
                .map(|(old, new)| (package_prefix(old), package_prefix(new)))
                .collect(),
            extensions,
        }
    }

    fn has_allowed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
    }

    /// Apply every package rename to `content`
    pub fn rename(&self, content: &str) -> String {
        self.packages
            .iter()
            .fold(content.to_string(), |text, (old, new)| {
                if text.contains(old.as_str()) {
                    text.replace(old.as_str(), new)
                } else {
                    text
                }
            })
    }
}

impl MigrationHandler for RenamePackages {
    fn configure(&mut self, step: &StepDescriptor) -> Result<()> {
        *self = Self::new(
            step.options.string_map(PACKAGE_MAP_OPTION)?,
            step.options.string_list(FILE_EXTENSION_OPTION)?,
        );
        Ok(())
    }

    fn migrate(&mut self, unit: &ProjectUnit, report: &MigrationReport) -> Result<()> {
        if !unit.path.join("src").is_dir() {
            debug!(unit = %unit.name, "no source directory");
            return Ok(());
        }
        if self.packages.is_empty() || self.extensions.is_empty() {
            return Ok(());
        }

        for file in discover_files(&unit.path, &["src/**/*"]) {
            if !self.has_allowed_extension(&file) {
                continue;
            }
            let content = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read '{}'", file.display()))?;
            let renamed = self.rename(&content);
            if renamed == content {
                continue;
            }
            debug!(unit = %unit.name, file = %file.display(), "renaming packages");
            match fs::write(&file, renamed) {
                Ok(()) => report.record_success(&unit.name, OperationKind::Modify, &file, &file),
                Err(err) => report.record_failure(&unit.name, OperationKind::Modify, &file, Some(&file), err.to_string()),
            }
        }
        Ok(())
    }
}
