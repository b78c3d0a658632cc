//! Lift a 7.x build script to the 10.x plugin layout
//!
//! The rewritten script is assembled from its known parts:
//!
//! 1. a `plugins { }` block built from the legacy `apply plugin` lines
//! 2. the `description` taken from the `intershop { displayName }` block
//! 3. every other line, with known legacy task wiring replaced
//! 4. tasks required by the new plugins
//! 5. the `dependencies` block with modern configuration names

use super::build_script::{locate, quoted, read_lines, write_if_changed, DEPENDENCIES_MARKER};
use crate::handler::{MigrationHandler, ProjectUnit};
use crate::position::Position;
use crate::report::MigrationReport;
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

const INTERSHOP_MARKER: &str = "intershop";
const PLUGIN_LINE: &str = "apply plugin";

/// Plugins replaced by another one
const PLUGIN_MAP: &[(&str, &str)] = &[("java-cartridge", "java")];

/// Plugins kept as they are
const PLUGIN_UNTOUCHED: &[&str] = &[
    "com.intershop.gradle.cartridge-resourcelist",
    "com.intershop.gradle.isml",
];

/// Plugins dropped without replacement
const PLUGIN_REMOVED: &[&str] = &["static-cartridge"];

/// Plugins that pull in additional plugins
const PLUGIN_ADDED: &[(&str, &[&str])] = &[(
    "java-cartridge",
    &[
        "com.intershop.icm.cartridge.product",
        "com.intershop.icm.cartridge.external",
    ],
)];

/// Legacy task wiring and its replacement
const REPLACE_LINES: &[(&str, &str)] = &[(
    "zipCartridge.dependsOn lessCompile",
    "tasks.compileJava.dependsOn(tasks.lessCompile)",
)];

/// Task wiring required by a plugin
const PLUGIN_TASK: &[(&str, &str)] = &[("com.intershop.gradle.isml", "tasks.test.dependsOn(tasks.isml)")];

const DEPENDENCY_HINT: &str =
    "// please validate that cartridges use \"cartridge\" as dependency declaration instead of \"implementation\".";

fn configuration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(testCompile|testRuntime|compile|runtime)\b").expect("valid regex"))
}

fn group_notation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"group:\s*['"]([^'"]+)['"]\s*,\s*name:\s*['"]([^'"]+)['"](?:\s*,\s*version:\s*['"]([^'"]+)['"])?"#,
        )
        .expect("valid regex")
    })
}

/// Map legacy plugin ids to their 10.x replacements, sorted
pub fn map_plugins<S: AsRef<str>>(plugins: &[S]) -> Vec<String> {
    let mut result = Vec::new();
    for plugin in plugins {
        let plugin = plugin.as_ref();
        let mut known = false;
        if let Some((_, mapped)) = PLUGIN_MAP.iter().find(|(old, _)| *old == plugin) {
            result.push(mapped.to_string());
            known = true;
        }
        if PLUGIN_UNTOUCHED.contains(&plugin) {
            result.push(plugin.to_string());
            known = true;
        }
        if PLUGIN_REMOVED.contains(&plugin) {
            known = true;
        }
        if let Some((_, added)) = PLUGIN_ADDED.iter().find(|(old, _)| *old == plugin) {
            result.extend(added.iter().map(|p| p.to_string()));
            known = true;
        }
        if !known {
            warn!(plugin, "unknown plugin kept as is");
            result.push(plugin.to_string());
        }
    }
    result.sort();
    result
}

/// Modernize one dependency declaration
///
/// Legacy configurations are renamed and the map notation
/// `group: 'g', name: 'n'` becomes `'g:n'`. The result is trimmed.
pub fn convert_dependency_line(line: &str) -> String {
    let trimmed = line.trim();
    let renamed = configuration_regex().replace(trimmed, |caps: &regex::Captures| {
        let configuration = match &caps[1] {
            "testCompile" => "testImplementation",
            "testRuntime" => "testRuntimeOnly",
            "compile" => "implementation",
            _ => "runtimeOnly",
        };
        configuration.to_string()
    });
    group_notation_regex()
        .replace(&renamed, |caps: &regex::Captures| match caps.get(3) {
            Some(version) => format!("'{}:{}:{}'", &caps[1], &caps[2], version.as_str()),
            None => format!("'{}:{}'", &caps[1], &caps[2]),
        })
        .trim()
        .to_string()
}

/// Rewrite a whole build script; `None` when it has no legacy plugin lines
pub fn migrate_lines(lines: &[String]) -> Option<Vec<String>> {
    let mut old_plugins = Vec::new();
    let mut remaining = Vec::new();
    for line in lines {
        match quoted(line).filter(|_| line.contains(PLUGIN_LINE)) {
            Some(plugin) => old_plugins.push(plugin.to_string()),
            None => remaining.push(line.clone()),
        }
    }
    if old_plugins.is_empty() {
        return None;
    }
    let plugins = map_plugins(&old_plugins);

    let dependencies = Position::locate(DEPENDENCIES_MARKER, &remaining);
    let dependency_lines = dependencies.matched_lines().to_vec();
    let remaining = dependencies.non_matched_lines();

    let intershop = Position::locate(INTERSHOP_MARKER, &remaining);
    let description = intershop
        .matched_lines()
        .iter()
        .filter(|line| line.contains("displayName"))
        .filter_map(|line| quoted(line))
        .last()
        .map(str::to_string);
    let remaining = intershop.non_matched_lines();

    let mut result = vec!["plugins {".to_string()];
    result.extend(plugins.iter().map(|plugin| format!("    id '{}'", plugin)));
    result.push("}".to_string());
    result.push(String::new());

    if let Some(description) = description {
        result.push(format!("description = '{}'", description));
        result.push(String::new());
    }

    let body: Vec<String> = remaining
        .iter()
        .map(|line| {
            REPLACE_LINES
                .iter()
                .find(|(old, _)| *old == line.trim())
                .map_or_else(|| line.clone(), |(_, new)| new.to_string())
        })
        .collect();
    let first = body.iter().position(|line| !line.trim().is_empty());
    let last = body.iter().rposition(|line| !line.trim().is_empty());
    if let (Some(first), Some(last)) = (first, last) {
        result.extend_from_slice(&body[first..=last]);
        result.push(String::new());
    }

    let tasks: Vec<String> = plugins
        .iter()
        .filter_map(|plugin| PLUGIN_TASK.iter().find(|(p, _)| *p == plugin.as_str()))
        .map(|(_, task)| task.to_string())
        .collect();
    if !tasks.is_empty() {
        result.extend(tasks);
        result.push(String::new());
    }

    if dependency_lines.len() >= 2 {
        result.push(DEPENDENCY_HINT.to_string());
        result.push(dependency_lines[0].trim().to_string());
        for line in &dependency_lines[1..dependency_lines.len() - 1] {
            let converted = convert_dependency_line(line);
            if converted.is_empty() {
                result.push(converted);
            } else {
                result.push(format!("    {}", converted));
            }
        }
        result.push("}".to_string());
    } else if result.last().is_some_and(|line| line.is_empty()) {
        result.pop();
    }
    Some(result)
}

/// Registered as `UpdateGradleBuild`
#[derive(Debug, Default)]
pub struct UpdateGradleBuild;

impl MigrationHandler for UpdateGradleBuild {
    fn migrate(&mut self, unit: &ProjectUnit, report: &MigrationReport) -> Result<()> {
        let path = locate(unit)?;
        let original = read_lines(&path)?;
        match migrate_lines(&original) {
            Some(lines) => {
                write_if_changed(report, unit, &path, &original, &lines)?;
            }
            None => debug!(unit = %unit.name, "no legacy plugins, build script left as is"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_map_plugins() {
        let mapped = map_plugins(&[
            "java-cartridge",
            "static-cartridge",
            "com.intershop.gradle.cartridge-resourcelist",
            "com.intershop.gradle.isml",
        ]);
        assert_eq!(
            mapped,
            vec![
                "com.intershop.gradle.cartridge-resourcelist",
                "com.intershop.gradle.isml",
                "com.intershop.icm.cartridge.external",
                "com.intershop.icm.cartridge.product",
                "java",
            ]
        );
        assert_eq!(map_plugins(&["custom"]), vec!["custom"]);
    }

    #[test]
    fn test_convert_dependency_line() {
        assert_eq!(
            convert_dependency_line("  compile 'commons-collections:commons-collections'"),
            "implementation 'commons-collections:commons-collections'"
        );
        assert_eq!(
            convert_dependency_line("\tcompile group: 'com.intershop.platform', name: 'ui_web_library'"),
            "implementation 'com.intershop.platform:ui_web_library'"
        );
        assert_eq!(
            convert_dependency_line("testCompile group: 'junit', name: 'junit', version: '4.12'"),
            "testImplementation 'junit:junit:4.12'"
        );
        assert_eq!(
            convert_dependency_line("runtime 'com.example:runtime-support'"),
            "runtimeOnly 'com.example:runtime-support'"
        );
        assert_eq!(convert_dependency_line(" "), "");
    }

    #[test]
    fn test_migrate_build_script() {
        let source = lines(
            "apply plugin: 'java-cartridge'\n\
             apply plugin: 'static-cartridge'\n\
             apply plugin: \"com.intershop.gradle.isml\"\n\
             \n\
             intershop {\n\
             \x20   displayName = 'Application - Starter Store'\n\
             }\n\
             \n\
             zipCartridge.dependsOn lessCompile\n\
             \n\
             dependencies {\n\
             \x20   compile group: 'com.intershop.platform', name: 'core'\n\
             \n\
             \x20   testCompile 'junit:junit'\n\
             }\n",
        );

        let expected = lines(
            "plugins {\n\
             \x20   id 'com.intershop.gradle.isml'\n\
             \x20   id 'com.intershop.icm.cartridge.external'\n\
             \x20   id 'com.intershop.icm.cartridge.product'\n\
             \x20   id 'java'\n\
             }\n\
             \n\
             description = 'Application - Starter Store'\n\
             \n\
             tasks.compileJava.dependsOn(tasks.lessCompile)\n\
             \n\
             tasks.test.dependsOn(tasks.isml)\n\
             \n\
             // please validate that cartridges use \"cartridge\" as dependency declaration instead of \"implementation\".\n\
             dependencies {\n\
             \x20   implementation 'com.intershop.platform:core'\n\
             \n\
             \x20   testImplementation 'junit:junit'\n\
             }",
        );

        assert_eq!(migrate_lines(&source).unwrap(), expected);
    }

    #[test]
    fn test_already_migrated_script_is_untouched() {
        let source = lines("plugins {\n    id 'java'\n}\n");
        assert!(migrate_lines(&source).is_none());
    }
}
