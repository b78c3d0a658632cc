//! Classification of `dependencies { ... }` declarations in Kotlin build scripts

use super::tree::{Dependency, DependencyKind};
use crate::position::Position;
use tracing::debug;

/// Name prefix of dependencies declared through `exclude(...)`
pub const EXCLUDED_MARK: &str = "(excl.)";

const DEPENDENCIES_MARKER: &str = "dependencies";

/// Extract the declared dependencies of a Kotlin build script
///
/// Only the first `dependencies` block is inspected. Lines are expected in the
/// `keyword("target")` form; anything else is skipped. `source` is recorded as
/// the artifact reference of every returned dependency.
pub fn parse_declarations(lines: &[String], source: &str) -> Vec<Dependency> {
    let position = Position::locate(DEPENDENCIES_MARKER, lines);
    let block = position.matched_lines();
    if block.is_empty() {
        debug!(source, "no dependencies block");
        return Vec::new();
    }

    // drop the marker line and the closing brace
    let mut body = &block[1..];
    if body.last().is_some_and(|line| line.trim().ends_with('}')) {
        body = &body[..body.len() - 1];
    }

    body.iter()
        .filter_map(|line| classify_line(line))
        .map(|(name, kind)| Dependency::new(name, Some(source.to_string()), kind))
        .collect()
}

/// Classify a single declaration line into `(name, kind)`
///
/// The target must be the only quoted string on the line, quoted with either
/// `"` or `'`.
pub fn classify_line(line: &str) -> Option<(String, DependencyKind)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("//") {
        return None;
    }

    let quote = line.chars().find(|c| *c == '"' || *c == '\'')?;
    let parts: Vec<&str> = line.split(quote).collect();
    if parts.len() != 3 {
        return None;
    }
    let prefix = parts[0].trim();
    let target = parts[1].trim();
    if target.is_empty() {
        return None;
    }

    if prefix.starts_with("exclude") {
        return Some((
            format!("{}{}", EXCLUDED_MARK, strip_project_prefix(target)),
            DependencyKind::Cartridge,
        ));
    }

    let kind = if prefix.starts_with("implementation(")
        || prefix.starts_with("cartridge(")
        || prefix.starts_with("cartridgeRuntime(project(")
    {
        DependencyKind::Cartridge
    } else if prefix.starts_with("runtimeOnly(") || prefix.starts_with("cartridgeRuntime(") {
        DependencyKind::Package
    } else {
        DependencyKind::Unknown
    };

    Some((strip_project_prefix(target).to_string(), kind))
}

/// Whether `reference` names a cartridge of the same project
///
/// External references carry a `group:name[:version]` coordinate.
pub fn is_project_reference(reference: &str) -> bool {
    !reference.contains(':')
}

fn strip_project_prefix(name: &str) -> &str {
    match name.strip_prefix(':') {
        Some(stripped) if stripped.len() > 1 => stripped,
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &str) -> Vec<String> {
        raw.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_classify_declarations() {
        assert_eq!(
            classify_line(r#"    implementation(project(":app_core"))"#),
            Some(("app_core".into(), DependencyKind::Cartridge))
        );
        assert_eq!(
            classify_line(r#"cartridge("com.intershop.platform:core")"#),
            Some(("com.intershop.platform:core".into(), DependencyKind::Cartridge))
        );
        assert_eq!(
            classify_line(r#"cartridgeRuntime(project(":app_storefront"))"#),
            Some(("app_storefront".into(), DependencyKind::Cartridge))
        );
        assert_eq!(
            classify_line(r#"cartridgeRuntime("com.intershop.business:smc")"#),
            Some(("com.intershop.business:smc".into(), DependencyKind::Package))
        );
        assert_eq!(
            classify_line("runtimeOnly('org.slf4j:slf4j-api')"),
            Some(("org.slf4j:slf4j-api".into(), DependencyKind::Package))
        );
        assert_eq!(
            classify_line(r#"testImplementation("junit:junit")"#),
            Some(("junit:junit".into(), DependencyKind::Unknown))
        );
    }

    #[test]
    fn test_classify_excluded_and_skipped_lines() {
        assert_eq!(
            classify_line(r#"exclude(":legacy_cartridge")"#),
            Some(("(excl.)legacy_cartridge".into(), DependencyKind::Cartridge))
        );
        assert_eq!(classify_line(r#"// implementation("a:b")"#), None);
        assert_eq!(classify_line("implementation(libs.foo)"), None);
        assert_eq!(classify_line(r#"exclude(group = "a", module = "b")"#), None);
        assert_eq!(classify_line(r#"implementation("")"#), None);
    }

    #[test]
    fn test_single_character_project_name_keeps_colon() {
        assert_eq!(strip_project_prefix(":a"), ":a");
        assert_eq!(strip_project_prefix(":ab"), "ab");
    }

    #[test]
    fn test_parse_declarations_from_block() {
        let script = lines(
            r#"plugins {
    id("com.intershop.icm.cartridge.product")
}

dependencies {
    implementation(project(":app_core"))
    // runtimeOnly("ignored:dep")
    cartridgeRuntime("com.intershop.business:smc")
}
"#,
        );
        let deps = parse_declarations(&script, "build.gradle.kts");

        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "app_core");
        assert_eq!(deps[0].artifact_ref.as_deref(), Some("build.gradle.kts"));
        assert_eq!(deps[1].kind, DependencyKind::Package);
    }

    #[test]
    fn test_parse_without_block() {
        let script = lines("plugins {\n}\n");
        assert!(parse_declarations(&script, "build.gradle.kts").is_empty());
    }

    #[test]
    fn test_project_reference() {
        assert!(is_project_reference("app_core"));
        assert!(!is_project_reference("com.intershop.platform:core"));
    }
}
