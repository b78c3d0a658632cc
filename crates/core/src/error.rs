//! Run-level error taxonomy
//!
//! Only configuration-level problems are errors in the `Result` sense: they
//! abort the whole run before further project units are touched. Failures of a
//! single handler on a single unit are recorded on the
//! [`MigrationReport`](crate::report::MigrationReport) instead.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that abort a migration run
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A step descriptor names a handler that is not registered
    #[error("unknown migration handler '{0}'")]
    UnknownHandler(String),

    /// A handler rejected the options of its step descriptor
    #[error("invalid options for handler '{handler}' in step '{step}': {message}")]
    InvalidOptions {
        handler: String,
        step: String,
        message: String,
    },

    /// A step descriptor file or step directory could not be read
    #[error("can't read step descriptors at '{}': {source}", path.display())]
    StepIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A step descriptor is not a valid YAML document of the expected shape
    #[error("malformed step descriptor '{name}': {source}")]
    StepParse {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The workspace root could not be scanned for project units
    #[error("can't discover project units in '{}': {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No bundled step descriptor matches the requested prefix
    #[error("no bundled step descriptors found for '{0}'")]
    NoBundledSteps(String),

    /// Handlers reported critical errors during the prepare phase
    #[error("migration aborted: {}", .0.join("; "))]
    Critical(Vec<String>),

    /// The version-control collaborator is required but unusable
    #[error("version control unavailable: {0}")]
    VersionControl(String),
}
