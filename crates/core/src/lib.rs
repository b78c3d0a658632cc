//! Layout Migrator Core Library
//!
//! Migrates a multi-module cartridge workspace from the legacy layout to the
//! new one. An ordered list of steps is applied to every project unit, each
//! step delegating to a named [`MigrationHandler`]. Every file-level effect is
//! recorded in a [`MigrationReport`].

pub mod dependency;
pub mod discovery;
pub mod error;
pub mod fs_ops;
pub mod handler;
pub mod handlers;
pub mod pipeline;
pub mod position;
pub mod properties;
pub mod report;
pub mod steps;
pub mod vcs;

// Re-export commonly used types
pub use error::MigrationError;
pub use handler::{HandlerRegistry, MigrationHandler, ProjectUnit};
pub use pipeline::{AutoCommit, Pipeline, StepHook};
pub use report::{MigrationReport, Operation, OperationKind, OperationStatus};
pub use steps::{StepDescriptor, StepSource};
pub use vcs::{GitRepository, VersionControl};
