//! Drop dependency declarations that no longer exist

use super::build_script::{quoted, require_non_empty, rewrite_dependencies};
use crate::handler::{MigrationHandler, ProjectUnit};
use crate::report::MigrationReport;
use crate::steps::StepDescriptor;
use anyhow::Result;
use std::collections::BTreeSet;
use tracing::debug;

pub const DEPENDENCIES_OPTION: &str = "dependencies";

#[derive(Debug, Default)]
pub struct RemoveDependency {
    removed: BTreeSet<String>,
}

impl RemoveDependency {
    pub fn new<I: IntoIterator<Item = String>>(removed: I) -> Self {
        Self {
            removed: removed.into_iter().collect(),
        }
    }

    /// Whether the declaration on `line` names a removed coordinate
    pub fn is_removed(&self, line: &str) -> bool {
        quoted(line).is_some_and(|coordinate| self.removed.contains(coordinate))
    }
}

impl MigrationHandler for RemoveDependency {
    fn configure(&mut self, step: &StepDescriptor) -> Result<()> {
        let removed = step.options.string_list(DEPENDENCIES_OPTION)?;
        require_non_empty(DEPENDENCIES_OPTION, &removed)?;
        self.removed = removed.into_iter().collect();
        Ok(())
    }

    fn migrate(&mut self, unit: &ProjectUnit, report: &MigrationReport) -> Result<()> {
        rewrite_dependencies(unit, report, |line| {
            if self.is_removed(line) {
                debug!(unit = %unit.name, line = line.trim(), "removing dependency");
                None
            } else {
                Some(line.to_string())
            }
        })
    }
}
