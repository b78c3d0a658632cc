//! Read-only analysis of cartridge dependencies
//!
//! Builds a dependency tree per unit from `build.gradle.kts`, following
//! project cartridges into their sibling directories. Every path from the
//! unit down to a leaf becomes a breadcrumb trail (`a > b > c`); trails feed
//! cycle detection and the marker-cartridge policy check. Findings are
//! recorded as WARNING operations, nothing on disk is changed apart from the
//! optional tree output file.

use crate::dependency::declarations::is_project_reference;
use crate::dependency::markers::Assignments;
use crate::dependency::{
    parse_declarations, Dependency, DependencyKind, DependencyTree, MarkerPolicy, NodeId, TrailGraph,
    EXCLUDED_MARK,
};
use crate::handler::{MigrationHandler, ProjectUnit};
use crate::report::{MigrationReport, OperationKind};
use crate::steps::StepDescriptor;
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::build_script::read_lines;

pub const TREE_FORMAT_OPTION: &str = "treeFormat";
pub const TREE_OUTPUT_FILE_OPTION: &str = "treeOutputFile";
pub const EXCLUDED_CARTRIDGES_OPTION: &str = "excludedCartridges";
pub const APPLICATIONS_OPTION: &str = "applications";
pub const APPLICATIONS_FILE_OPTION: &str = "applicationsFile";
pub const MARKER_CARTRIDGES_OPTION: &str = "markerCartridges";
pub const MARKER_CARTRIDGES_FILE_OPTION: &str = "markerCartridgesFile";

const BUILD_FILE: &str = "build.gradle.kts";
const TRAIL_SEPARATOR: &str = " > ";

/// Standard project cartridges that are not subject to migration
pub const DEFAULT_EXCLUDED_CARTRIDGES: &[&str] = &[
    "pf_configuration_fs",
    "migration",
    "my_cartridge",
    "my_geb_test",
    "versions",
    "versions_test",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TreeFormat {
    #[default]
    Text,
    Json,
}

impl TreeFormat {
    fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("text") {
            Some(TreeFormat::Text)
        } else if value.eq_ignore_ascii_case("json") {
            Some(TreeFormat::Json)
        } else {
            None
        }
    }

    fn render(self, tree: &DependencyTree) -> Result<String> {
        match self {
            TreeFormat::Text => Ok(tree.render_text()),
            TreeFormat::Json => Ok(tree.to_json()? + "\n"),
        }
    }
}

/// Tree and trails of one unit
#[derive(Debug)]
pub struct UnitAnalysis {
    pub tree: DependencyTree,
    pub trails: Vec<String>,
}

#[derive(Debug)]
pub struct ExamineCartridgeDependencies {
    format: TreeFormat,
    output: Option<PathBuf>,
    excluded: Vec<String>,
    policy: MarkerPolicy,
}

impl Default for ExamineCartridgeDependencies {
    fn default() -> Self {
        Self {
            format: TreeFormat::default(),
            output: None,
            excluded: DEFAULT_EXCLUDED_CARTRIDGES.iter().map(|name| name.to_string()).collect(),
            policy: MarkerPolicy::default(),
        }
    }
}

/// Inline table from `key`, or a `key = a, b` file from `file_key`
fn read_assignments(step: &StepDescriptor, key: &str, file_key: &str) -> Result<Assignments> {
    if let Some(table) = step.options.get::<Assignments>(key)? {
        return Ok(table);
    }
    match step.options.string(file_key)? {
        Some(file) => {
            let content =
                fs::read_to_string(&file).with_context(|| format!("Failed to read '{}'", file))?;
            Ok(MarkerPolicy::parse_assignments(&content))
        }
        None => Ok(Assignments::new()),
    }
}

impl ExamineCartridgeDependencies {
    fn is_excluded(&self, name: &str) -> bool {
        self.excluded.iter().any(|excluded| name.contains(excluded.as_str()))
    }

    /// Build the tree and trails for the cartridge in `dir`
    pub fn analyze(&self, name: &str, dir: &Path) -> Result<UnitAnalysis> {
        let mut tree = DependencyTree::new(Dependency::new(
            name,
            Some(BUILD_FILE.to_string()),
            DependencyKind::Root,
        ));
        let mut trail = vec![name.to_string()];
        let mut trails = Vec::new();
        let root = tree.root();
        self.walk(&mut tree, root, dir, &mut trail, &mut trails)?;
        Ok(UnitAnalysis { tree, trails })
    }

    fn walk(
        &self,
        tree: &mut DependencyTree,
        parent: NodeId,
        dir: &Path,
        trail: &mut Vec<String>,
        trails: &mut Vec<String>,
    ) -> Result<()> {
        let build = dir.join(BUILD_FILE);
        if !build.is_file() {
            warn!(dir = %dir.display(), "no {} found", BUILD_FILE);
            trails.push(trail.join(TRAIL_SEPARATOR));
            return Ok(());
        }

        let declarations = parse_declarations(&read_lines(&build)?, BUILD_FILE);
        let mut descended = false;
        for declaration in declarations {
            let name = declaration.name.clone();
            let child = tree.add_child(parent, declaration);
            if name.starts_with(EXCLUDED_MARK) || !is_project_reference(&name) || self.is_excluded(&name) {
                continue;
            }

            descended = true;
            if trail.contains(&name) {
                // closes a cycle; keep the trail but stop here
                trails.push(format!("{}{}{}", trail.join(TRAIL_SEPARATOR), TRAIL_SEPARATOR, name));
                continue;
            }
            let Some(sibling) = dir.parent().map(|parent| parent.join(&name)) else {
                continue;
            };
            trail.push(name);
            self.walk(tree, child, &sibling, trail, trails)?;
            trail.pop();
        }

        if !descended {
            trails.push(trail.join(TRAIL_SEPARATOR));
        }
        Ok(())
    }

    fn write_tree(&self, unit: &ProjectUnit, tree: &DependencyTree) -> Result<()> {
        let rendered = self.format.render(tree)?;
        let Some(output) = &self.output else {
            info!(unit = %unit.name, "dependency tree\n{}", rendered);
            return Ok(());
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(output)
            .with_context(|| format!("Failed to open '{}'", output.display()))?;
        file.write_all(rendered.as_bytes())
            .with_context(|| format!("Failed to write '{}'", output.display()))
    }
}

impl MigrationHandler for ExamineCartridgeDependencies {
    fn configure(&mut self, step: &StepDescriptor) -> Result<()> {
        if let Some(format) = step.options.string(TREE_FORMAT_OPTION)? {
            match TreeFormat::parse(&format) {
                Some(parsed) => self.format = parsed,
                None => warn!(step = %step.name, format = %format, "invalid tree format, using TEXT"),
            }
        }
        self.output = step
            .options
            .string(TREE_OUTPUT_FILE_OPTION)?
            .filter(|file| !file.trim().is_empty())
            .map(PathBuf::from);
        if step.options.contains(EXCLUDED_CARTRIDGES_OPTION) {
            self.excluded = step.options.string_list(EXCLUDED_CARTRIDGES_OPTION)?;
        }
        self.policy = MarkerPolicy::new(
            read_assignments(step, APPLICATIONS_OPTION, APPLICATIONS_FILE_OPTION)?,
            read_assignments(step, MARKER_CARTRIDGES_OPTION, MARKER_CARTRIDGES_FILE_OPTION)?,
        );
        Ok(())
    }

    fn migrate(&mut self, unit: &ProjectUnit, report: &MigrationReport) -> Result<()> {
        if self.is_excluded(&unit.name) {
            debug!(unit = %unit.name, "cartridge excluded from examination");
            return Ok(());
        }
        let build = unit.path.join(BUILD_FILE);
        if !build.is_file() {
            debug!(unit = %unit.name, "no {} to examine", BUILD_FILE);
            return Ok(());
        }

        let analysis = self.analyze(&unit.name, &unit.path)?;
        info!(unit = %unit.name, trails = analysis.trails.len(), "dependencies examined");

        let graph = TrailGraph::from_trails(&analysis.trails);
        for (first, second) in graph.mutual_dependencies() {
            debug!(unit = %unit.name, first = %first, second = %second, "mutual dependency");
        }
        for cycle in graph.cycles() {
            let message = format!("Dependency cycle between {}", cycle.join(", "));
            warn!(unit = %unit.name, "{}", message);
            report.record_warning(&unit.name, OperationKind::Modify, &build, &build, message);
        }
        if !self.policy.is_empty() {
            for fault in self.policy.check(&analysis.trails) {
                warn!(unit = %unit.name, "{}", fault);
                report.record_warning(&unit.name, OperationKind::Modify, &build, &build, fault);
            }
        }

        self.write_tree(unit, &analysis.tree)
    }
}
