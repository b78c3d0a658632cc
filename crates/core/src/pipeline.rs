//! Step pipeline: load descriptors, resolve handlers, apply them to units
//!
//! Execution is sequential. Steps run in file-name order and, within a step,
//! over the project units in discovery order, because later steps read the
//! file-system state earlier ones left behind.

use crate::discovery::discover_project_units;
use crate::error::MigrationError;
use crate::handler::{HandlerRegistry, MigrationHandler, ProjectUnit};
use crate::report::{MigrationReport, OperationKind};
use crate::steps::{StepDescriptor, StepSource};
use crate::vcs::VersionControl;
use std::path::Path;
use tracing::{debug, error, info};

/// Callback run after a step was applied to one unit
pub trait StepHook {
    fn after_step(&self, step: &StepDescriptor, unit: &ProjectUnit, report: &MigrationReport);
}

/// Commit pending changes after every step, best effort
pub struct AutoCommit<V: VersionControl> {
    vcs: V,
}

impl<V: VersionControl> AutoCommit<V> {
    pub fn new(vcs: V) -> Self {
        Self { vcs }
    }
}

impl<V: VersionControl> StepHook for AutoCommit<V> {
    fn after_step(&self, step: &StepDescriptor, unit: &ProjectUnit, _report: &MigrationReport) {
        match self.vcs.has_uncommitted_changes() {
            Ok(false) => debug!(step = %step.name, unit = %unit.name, "nothing to commit"),
            Ok(true) => {
                let message = step.commit_message_for(&unit.name);
                if let Err(err) = self.vcs.commit(&message) {
                    error!(step = %step.name, unit = %unit.name, "commit failed: {err:#}");
                }
            }
            Err(err) => error!(step = %step.name, unit = %unit.name, "can't check for changes: {err:#}"),
        }
    }
}

struct ConfiguredStep {
    descriptor: StepDescriptor,
    handler: Box<dyn MigrationHandler>,
}

/// Applies an ordered set of steps to project units
pub struct Pipeline {
    registry: HandlerRegistry,
    hooks: Vec<Box<dyn StepHook>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(HandlerRegistry::with_defaults())
    }
}

impl Pipeline {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry,
            hooks: Vec::new(),
        }
    }

    pub fn with_hook(mut self, hook: impl StepHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Apply every step of `source` to `units`, without root phases
    pub fn run(&self, units: &[ProjectUnit], source: &StepSource) -> Result<MigrationReport, MigrationError> {
        let mut steps = self.configure(source)?;
        let report = MigrationReport::new();

        for step in &mut steps {
            info!(step = %step.descriptor.name, handler = %step.descriptor.handler_name, "applying step");
            for unit in units {
                let result = step.handler.migrate(unit, &report);
                self.finish_unit(&step.descriptor, unit, result, &report);
            }
        }
        Ok(report)
    }

    /// Apply every step of `source` to the workspace at `root`
    ///
    /// All handlers validate the root first; a critical error recorded there
    /// aborts the run before anything is modified. Each step then migrates the
    /// root itself, followed by every discovered project unit.
    pub fn run_workspace(&self, root: &Path, source: &StepSource) -> Result<MigrationReport, MigrationError> {
        let mut steps = self.configure(source)?;
        let units = discover_project_units(root).map_err(|source| MigrationError::Discovery {
            path: root.to_path_buf(),
            source,
        })?;
        let root_unit = ProjectUnit::from_path(root);
        info!(root = %root.display(), units = units.len(), "discovered project units");

        let report = MigrationReport::new();
        for step in &mut steps {
            step.handler.prepare_root(&root_unit, &report);
        }
        if report.has_critical_errors() {
            return Err(MigrationError::Critical(report.critical_errors()));
        }

        for step in &mut steps {
            info!(step = %step.descriptor.name, handler = %step.descriptor.handler_name, "applying step");
            let result = step.handler.migrate_root(&root_unit, &report);
            self.finish_unit(&step.descriptor, &root_unit, result, &report);

            for unit in &units {
                let result = step.handler.migrate(unit, &report);
                self.finish_unit(&step.descriptor, unit, result, &report);
            }
        }
        Ok(report)
    }

    /// Load descriptors and create one configured handler per step
    fn configure(&self, source: &StepSource) -> Result<Vec<ConfiguredStep>, MigrationError> {
        source
            .load()?
            .into_iter()
            .map(|descriptor| {
                let mut handler = self.registry.resolve(&descriptor.handler_name)?;
                handler
                    .configure(&descriptor)
                    .map_err(|err| MigrationError::InvalidOptions {
                        handler: descriptor.handler_name.clone(),
                        step: descriptor.name.clone(),
                        message: format!("{err:#}"),
                    })?;
                Ok(ConfiguredStep { descriptor, handler })
            })
            .collect()
    }

    fn finish_unit(
        &self,
        step: &StepDescriptor,
        unit: &ProjectUnit,
        result: anyhow::Result<()>,
        report: &MigrationReport,
    ) {
        if let Err(err) = result {
            // Target is the step, so failures of different steps stay distinct
            report.record_failure(
                &unit.name,
                OperationKind::Modify,
                &unit.path,
                Some(Path::new(&step.name)),
                format!("step {}: {err:#}", step.name),
            );
        }
        for hook in &self.hooks {
            hook.after_step(step, unit, report);
        }
    }
}
