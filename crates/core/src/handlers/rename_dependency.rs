//! Rename dependency coordinates inside the `dependencies` block

use super::build_script::{quoted_range, rewrite_dependencies};
use crate::handler::{MigrationHandler, ProjectUnit};
use crate::report::MigrationReport;
use crate::steps::StepDescriptor;
use anyhow::Result;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const DEPENDENCY_MAP_OPTION: &str = "dependency-map";

#[derive(Debug, Default)]
pub struct RenameDependency {
    renames: BTreeMap<String, String>,
}

impl RenameDependency {
    pub fn new(renames: BTreeMap<String, String>) -> Self {
        Self { renames }
    }

    /// Rename the quoted coordinate of `line`
    ///
    /// A key matches the whole coordinate or its `group:artifact` prefix, so
    /// `commons-lang:commons-lang` also renames `commons-lang:commons-lang:2.6`
    /// and keeps the version.
    pub fn convert_line(&self, line: &str) -> String {
        let Some((start, end)) = quoted_range(line) else {
            return line.to_string();
        };
        let coordinate = &line[start..end];

        let renamed = match self.renames.get(coordinate) {
            Some(target) => target.clone(),
            None => {
                let mut parts = coordinate.splitn(3, ':');
                let (Some(group), Some(artifact), version) = (parts.next(), parts.next(), parts.next())
                else {
                    return line.to_string();
                };
                let Some(target) = self.renames.get(&format!("{}:{}", group, artifact)) else {
                    return line.to_string();
                };
                match version {
                    Some(version) => format!("{}:{}", target, version),
                    None => target.clone(),
                }
            }
        };

        debug!(from = coordinate, to = %renamed, "renaming dependency");
        format!("{}{}{}", &line[..start], renamed, &line[end..])
    }
}

impl MigrationHandler for RenameDependency {
    fn configure(&mut self, step: &StepDescriptor) -> Result<()> {
        self.renames = step.options.string_map(DEPENDENCY_MAP_OPTION)?;
        if self.renames.is_empty() {
            warn!(step = %step.name, "no dependencies to rename");
        }
        Ok(())
    }

    fn migrate(&mut self, unit: &ProjectUnit, report: &MigrationReport) -> Result<()> {
        rewrite_dependencies(unit, report, |line| Some(self.convert_line(line)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{OperationKind, OperationStatus};
    use std::fs;
    use tempfile::TempDir;

    fn handler() -> RenameDependency {
        RenameDependency::new(BTreeMap::from([(
            "commons-lang:commons-lang".to_string(),
            "org.apache.commons:commons-lang3".to_string(),
        )]))
    }

    #[test]
    fn test_convert_line() {
        let handler = handler();
        assert_eq!(
            handler.convert_line("    implementation 'commons-lang:commons-lang'"),
            "    implementation 'org.apache.commons:commons-lang3'"
        );
        assert_eq!(
            handler.convert_line("    implementation(\"commons-lang:commons-lang:2.6\")"),
            "    implementation(\"org.apache.commons:commons-lang3:2.6\")"
        );
        assert_eq!(
            handler.convert_line("    implementation 'commons-lang:commons-langx:2.6'"),
            "    implementation 'commons-lang:commons-langx:2.6'"
        );
        assert_eq!(handler.convert_line("    implementation platform"), "    implementation platform");
    }

    #[test]
    fn test_rename_in_build_script() {
        let temp_dir = TempDir::new().unwrap();
        let unit_dir = temp_dir.path().join("app_core");
        fs::create_dir(&unit_dir).unwrap();
        let build = unit_dir.join("build.gradle");
        fs::write(
            &build,
            "plugins {\n    id 'java'\n}\n\ndependencies {\n    implementation 'commons-lang:commons-lang:2.6'\n}\n",
        )
        .unwrap();

        let step = StepDescriptor::from_yaml(
            "030_RenameDependency.yml",
            "migrator: RenameDependency\noptions:\n  dependency-map:\n    \"commons-lang:commons-lang\": \"org.apache.commons:commons-lang3\"\n",
        )
        .unwrap();
        let mut handler = RenameDependency::default();
        handler.configure(&step).unwrap();

        let unit = ProjectUnit::from_path(&unit_dir);
        let report = MigrationReport::new();
        handler.migrate(&unit, &report).unwrap();

        let content = fs::read_to_string(&build).unwrap();
        assert!(content.contains("implementation 'org.apache.commons:commons-lang3:2.6'"));
        assert!(content.starts_with("plugins {\n"));

        let operations = report.operations("app_core");
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].kind, OperationKind::Modify);
        assert_eq!(operations[0].status, OperationStatus::Success);

        // second application changes nothing and records nothing
        handler.migrate(&unit, &report).unwrap();
        assert_eq!(report.counts("app_core").total(), 1);
    }

    #[test]
    fn test_missing_build_script_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let unit = ProjectUnit::from_path(temp_dir.path());
        let err = handler().migrate(&unit, &MigrationReport::new()).unwrap_err();
        assert!(err.to_string().contains("no build script"));
    }
}
