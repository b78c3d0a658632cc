//! Step descriptors and where they come from
//!
//! A step descriptor is a small YAML document:
//!
//! ```yaml
//! type: specs.intershop.com/v1beta/migrate
//! migrator: RenameDependency
//! message: "refactor: rename dependencies to newer group/artifact"
//! options:
//!   dependency-map:
//!     "commons-lang:commons-lang": "org.apache.commons:commons-lang3"
//! ```
//!
//! Steps are read from a directory or from the catalog compiled into this
//! crate, and are always applied in file-name order.

use crate::error::MigrationError;
use crate::handler::CARTRIDGE_NAME_PLACEHOLDER;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Prefix selecting the compiled-in catalog on the command line
pub const BUNDLED_SCHEME: &str = "bundled:";

/// Default file extension of step descriptors
pub const STEP_EXTENSION: &str = "yml";

macro_rules! bundled {
    ($($path:literal),* $(,)?) => {
        &[$(($path, include_str!(concat!("../steps/", $path)))),*]
    };
}

/// Step descriptors shipped with the crate, keyed by catalog path
static BUNDLED_STEPS: &[(&str, &str)] = bundled![
    "001_migration_7x10_to_11/010_UpdateGradleBuild.yml",
    "001_migration_7x10_to_11/020_ConvertToCartridgeDependency.yml",
    "001_migration_7x10_to_11/030_RenameDependency.yml",
    "001_migration_7x10_to_11/040_RemoveDependency.yml",
    "001_migration_7x10_to_11/050_MoveFiles.yml",
    "001_migration_7x10_to_11/060_MoveFolder.yml",
    "001_migration_7x10_to_11/070_AddSiteContentPreparer.yml",
    "001_migration_7x10_to_11/080_RenamePackages.yml",
    "001_migration_7x10_to_11/090_RemoveFiles.yml",
    "001_migration_7x10_to_11/100_MigrateVersionFiles.yml",
];

#[derive(Debug, Deserialize)]
struct StepDocument {
    #[serde(rename = "type", default)]
    schema: Option<String>,
    #[serde(alias = "handlerName")]
    migrator: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    options: Option<serde_yaml::Mapping>,
}

/// Handler-specific options of a step, deserialized on demand
#[derive(Debug, Clone, Default)]
pub struct StepOptions(serde_yaml::Mapping);

impl StepOptions {
    pub fn new(mapping: serde_yaml::Mapping) -> Self {
        Self(mapping)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Deserialize the option `key`; `Ok(None)` when it is absent or null
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_yaml::Error> {
        match self.0.get(key) {
            None | Some(serde_yaml::Value::Null) => Ok(None),
            Some(value) => serde_yaml::from_value(value.clone()).map(Some),
        }
    }

    /// String-to-string map option, empty when absent
    pub fn string_map(&self, key: &str) -> Result<BTreeMap<String, String>, serde_yaml::Error> {
        Ok(self.get(key)?.unwrap_or_default())
    }

    /// List-of-strings option, empty when absent
    pub fn string_list(&self, key: &str) -> Result<Vec<String>, serde_yaml::Error> {
        Ok(self.get(key)?.unwrap_or_default())
    }

    pub fn string(&self, key: &str) -> Result<Option<String>, serde_yaml::Error> {
        self.get(key)
    }
}

/// One parsed step
#[derive(Debug, Clone)]
pub struct StepDescriptor {
    /// File name the step was loaded from; determines its order
    pub name: String,
    /// Informational schema tag (`type`)
    pub schema: Option<String>,
    pub handler_name: String,
    pub options: StepOptions,
    /// Commit message template; may contain `{cartridgeName}`
    pub commit_message: Option<String>,
}

impl StepDescriptor {
    pub fn from_yaml(name: &str, content: &str) -> Result<Self, MigrationError> {
        let document: StepDocument =
            serde_yaml::from_str(content).map_err(|source| MigrationError::StepParse {
                name: name.to_string(),
                source,
            })?;

        Ok(Self {
            name: name.to_string(),
            schema: document.schema,
            handler_name: document.migrator.trim().to_string(),
            options: StepOptions::new(document.options.unwrap_or_default()),
            commit_message: document.message,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, MigrationError> {
        let content = fs::read_to_string(path).map_err(|source| MigrationError::StepIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&file_name(path), &content)
    }

    /// Commit message for `unit`, with `{cartridgeName}` substituted
    pub fn commit_message_for(&self, unit: &str) -> String {
        match &self.commit_message {
            Some(template) => template.replace(CARTRIDGE_NAME_PLACEHOLDER, unit),
            None => format!("migration: apply step '{}' to '{}'", self.name, unit),
        }
    }
}

/// Where step descriptors are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepSource {
    /// All `*.yml`/`*.yaml` files of a directory
    Directory(PathBuf),
    /// Compiled-in catalog entries below `prefix` ending in `.extension`
    Bundled { prefix: String, extension: String },
}

impl StepSource {
    /// Interpret a command-line argument: `bundled:<prefix>` or a directory path
    pub fn parse(arg: &str) -> Self {
        match arg.strip_prefix(BUNDLED_SCHEME) {
            Some(prefix) => StepSource::Bundled {
                prefix: prefix.trim_matches('/').to_string(),
                extension: STEP_EXTENSION.to_string(),
            },
            None => StepSource::Directory(PathBuf::from(arg)),
        }
    }

    /// Load and parse every descriptor, sorted by file name
    pub fn load(&self) -> Result<Vec<StepDescriptor>, MigrationError> {
        let steps = match self {
            StepSource::Directory(dir) => load_directory(dir)?,
            StepSource::Bundled { prefix, extension } => load_bundled(prefix, extension)?,
        };
        debug!(count = steps.len(), "loaded step descriptors");
        Ok(steps)
    }
}

/// Names of the bundled catalog entries, in catalog order
pub fn bundled_entries() -> impl Iterator<Item = &'static str> {
    BUNDLED_STEPS.iter().map(|(path, _)| *path)
}

fn load_directory(dir: &Path) -> Result<Vec<StepDescriptor>, MigrationError> {
    let io_error = |source| MigrationError::StepIo {
        path: dir.to_path_buf(),
        source,
    };

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        let is_step = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"));
        if path.is_file() && is_step {
            files.push(path);
        }
    }
    files.sort_by_key(|path| file_name(path));

    if files.is_empty() {
        warn!(dir = %dir.display(), "no step descriptors found");
    }
    files.iter().map(|path| StepDescriptor::from_file(path)).collect()
}

fn load_bundled(prefix: &str, extension: &str) -> Result<Vec<StepDescriptor>, MigrationError> {
    let suffix = format!(".{}", extension.trim_start_matches('.'));
    let mut entries: Vec<(&str, &str)> = BUNDLED_STEPS
        .iter()
        .filter(|(path, _)| path.starts_with(prefix) && path.ends_with(&suffix))
        .copied()
        .collect();
    if entries.is_empty() {
        return Err(MigrationError::NoBundledSteps(prefix.to_string()));
    }
    entries.sort_by_key(|(path, _)| file_name(Path::new(path)));

    entries
        .into_iter()
        .map(|(path, content)| StepDescriptor::from_yaml(&file_name(Path::new(path)), content))
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
