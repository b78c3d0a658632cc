//! Drop assembly projects, which have no counterpart in the new layout

use super::build_script::{locate, read_lines};
use crate::fs_ops::FileOperations;
use crate::handler::{MigrationHandler, ProjectUnit};
use crate::report::MigrationReport;
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

/// A top-level `assembly { }` block starts at the beginning of a line
fn assembly_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^assembly\s*\{").expect("valid regex"))
}

/// Delete every unit whose build script declares an assembly
#[derive(Debug, Default)]
pub struct RemoveAssembly;

impl MigrationHandler for RemoveAssembly {
    fn migrate(&mut self, unit: &ProjectUnit, report: &MigrationReport) -> Result<()> {
        let build_script = locate(unit)?;
        let lines = read_lines(&build_script)?;
        if !lines.iter().any(|line| assembly_block_regex().is_match(line)) {
            debug!(unit = %unit.name, "not an assembly");
            return Ok(());
        }
        if FileOperations::new(report, &unit.name).delete_path(&unit.path) {
            info!(unit = %unit.name, path = %unit.path.display(), "assembly removed");
        }
        Ok(())
    }
}
