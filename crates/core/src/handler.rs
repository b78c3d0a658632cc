//! Transformation handler contract and the name-keyed registry

use crate::error::MigrationError;
use crate::handlers;
use crate::report::MigrationReport;
use crate::steps::StepDescriptor;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A project unit: one buildable subdirectory, or the workspace root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectUnit {
    pub name: String,
    pub path: PathBuf,
}

impl ProjectUnit {
    /// Unit named after the last component of `path`
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }

    /// Resolve a configured relative path, substituting `{cartridgeName}`
    pub fn resolve(&self, template: &str) -> PathBuf {
        self.path.join(template.replace(CARTRIDGE_NAME_PLACEHOLDER, &self.name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Placeholder replaced by the project-unit name in paths and messages
pub const CARTRIDGE_NAME_PLACEHOLDER: &str = "{cartridgeName}";

/// One named transformation
///
/// Handlers are created fresh per run and configured once from their step
/// descriptor. Per-unit failures are returned as errors and end up as FAILED
/// operations; they never abort the run. Only `prepare_root` can stop a run,
/// by recording a critical error on the report.
pub trait MigrationHandler {
    /// Read options from the step descriptor
    fn configure(&mut self, _step: &StepDescriptor) -> anyhow::Result<()> {
        Ok(())
    }

    /// Validate preconditions on the workspace root before anything is modified
    fn prepare_root(&mut self, _root: &ProjectUnit, _report: &MigrationReport) {}

    /// Transform the workspace root itself
    fn migrate_root(&mut self, _root: &ProjectUnit, _report: &MigrationReport) -> anyhow::Result<()> {
        Ok(())
    }

    /// Transform one project unit
    fn migrate(&mut self, unit: &ProjectUnit, report: &MigrationReport) -> anyhow::Result<()>;
}

/// Constructor of a handler instance
pub type HandlerFactory = fn() -> Box<dyn MigrationHandler>;

/// Maps handler names from step descriptors to constructors
#[derive(Default)]
pub struct HandlerRegistry {
    factories: BTreeMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in handler and its historical aliases
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        handlers::register_all(&mut registry);
        registry
    }

    pub fn register(&mut self, name: &str, factory: HandlerFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    /// Register `factory` under a canonical name and every alias
    pub fn register_with_aliases(&mut self, name: &str, aliases: &[&str], factory: HandlerFactory) {
        self.register(name, factory);
        for alias in aliases {
            self.register(alias, factory);
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Create a handler for `name`
    ///
    /// An exact match wins. Otherwise a dotted, fully qualified name falls back
    /// to its last segment.
    pub fn resolve(&self, name: &str) -> Result<Box<dyn MigrationHandler>, MigrationError> {
        let name = name.trim();
        let factory = self.factories.get(name).or_else(|| {
            name.rsplit_once('.')
                .and_then(|(_, short)| self.factories.get(short))
        });
        factory
            .map(|factory| factory())
            .ok_or_else(|| MigrationError::UnknownHandler(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl MigrationHandler for Noop {
        fn migrate(&mut self, _unit: &ProjectUnit, _report: &MigrationReport) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn noop() -> Box<dyn MigrationHandler> {
        Box::new(Noop)
    }

    #[test]
    fn test_resolve_exact_and_qualified_names() {
        let mut registry = HandlerRegistry::new();
        registry.register_with_aliases("RenameDependency", &["RenamedDependency"], noop);

        assert!(registry.resolve("RenameDependency").is_ok());
        assert!(registry.resolve(" RenamedDependency ").is_ok());
        assert!(registry
            .resolve("com.intershop.customization.migration.gradle.RenamedDependency")
            .is_ok());
    }

    #[test]
    fn test_unknown_handler_is_configuration_error() {
        let registry = HandlerRegistry::new();
        let err = registry.resolve("com.example.Missing").err().unwrap();
        assert!(matches!(err, MigrationError::UnknownHandler(ref name) if name == "com.example.Missing"));
    }

    #[test]
    fn test_default_registry_contains_catalog() {
        let registry = HandlerRegistry::with_defaults();
        for name in [
            "RenameDependency",
            "RemoveDependency",
            "ConvertToCartridgeDependency",
            "UpdateGradleBuild",
            "UpdateGradleBuild7to10",
            "AddSiteContentPreparer",
            "RenamePackages",
            "MoveFiles",
            "MoveFolder",
            "MoveFilteredFolder",
            "MoveArtifacts",
            "RemoveAssembly",
            "RemoveFiles",
            "MigrateVersionFiles",
            "ExamineCartridgeDependencies",
        ] {
            assert!(registry.resolve(name).is_ok(), "missing handler {}", name);
        }
    }

    #[test]
    fn test_project_unit_resolve() {
        let unit = ProjectUnit::from_path("/work/app_core");
        assert_eq!(unit.name, "app_core");
        assert_eq!(
            unit.resolve("src/main/resources/resources/{cartridgeName}"),
            PathBuf::from("/work/app_core/src/main/resources/resources/app_core")
        );
    }
}
