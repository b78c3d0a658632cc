//! Declare cartridge dependencies with the cartridge configurations

use super::build_script::{quoted_range, rewrite_dependencies};
use crate::handler::{MigrationHandler, ProjectUnit};
use crate::report::MigrationReport;
use crate::steps::StepDescriptor;
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

pub const GROUPS_OPTION: &str = "cartridgeDependencyGroups";

fn configuration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*)(implementation|runtimeOnly)\b").expect("valid regex"))
}

/// `implementation` → `cartridge`, `runtimeOnly` → `cartridgeRuntime` for
/// project references and dependencies of the configured groups
#[derive(Debug, Default)]
pub struct ConvertToCartridgeDependency {
    groups: Vec<String>,
}

impl ConvertToCartridgeDependency {
    pub fn new(groups: Vec<String>) -> Self {
        Self { groups }
    }

    pub fn convert_line(&self, line: &str) -> String {
        let Some((start, end)) = quoted_range(line) else {
            return line.to_string();
        };
        let is_cartridge = line[..start].contains("project(")
            || self.groups.iter().any(|group| line[start..end].starts_with(group.as_str()));
        if !is_cartridge {
            return line.to_string();
        }

        configuration_regex()
            .replace(line, |caps: &regex::Captures| {
                let configuration = match &caps[2] {
                    "implementation" => "cartridge",
                    _ => "cartridgeRuntime",
                };
                format!("{}{}", &caps[1], configuration)
            })
            .into_owned()
    }
}

impl MigrationHandler for ConvertToCartridgeDependency {
    fn configure(&mut self, step: &StepDescriptor) -> Result<()> {
        self.groups = step.options.string_list(GROUPS_OPTION)?;
        Ok(())
    }

    fn migrate(&mut self, unit: &ProjectUnit, report: &MigrationReport) -> Result<()> {
        rewrite_dependencies(unit, report, |line| Some(self.convert_line(line)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::StepSource;

    fn bundled_handler() -> ConvertToCartridgeDependency {
        let steps = StepSource::parse("bundled:001_migration_7x10_to_11").load().unwrap();
        let step = steps
            .iter()
            .find(|step| step.handler_name == "ConvertToCartridgeDependency")
            .unwrap();
        let mut handler = ConvertToCartridgeDependency::default();
        handler.configure(step).unwrap();
        handler
    }

    #[test]
    fn test_convert_lines() {
        let handler = bundled_handler();
        let cases = [
            ("    implementation project(':app_core')", "    cartridge project(':app_core')"),
            ("    runtimeOnly project(':app_core')", "    cartridgeRuntime project(':app_core')"),
            (
                "    implementation 'com.intershop.platform:bc_foundation'",
                "    cartridge 'com.intershop.platform:bc_foundation'",
            ),
            (
                "    runtimeOnly 'com.intershop.business:bc_order'",
                "    cartridgeRuntime 'com.intershop.business:bc_order'",
            ),
            (
                "    implementation 'org.apache.commons:commons-lang3'",
                "    implementation 'org.apache.commons:commons-lang3'",
            ),
            (
                "    testImplementation 'com.intershop.platform:test'",
                "    testImplementation 'com.intershop.platform:test'",
            ),
        ];
        for (line, expected) in cases {
            assert_eq!(handler.convert_line(line), expected, "line: {}", line);
        }
    }

    #[test]
    fn test_without_groups_only_projects_convert() {
        let handler = ConvertToCartridgeDependency::new(Vec::new());
        assert_eq!(
            handler.convert_line("implementation 'com.intershop.platform:core'"),
            "implementation 'com.intershop.platform:core'"
        );
        assert_eq!(
            handler.convert_line("implementation(project(\":core\"))"),
            "cartridge(project(\":core\"))"
        );
    }
}
