//! Aggregated outcome of a migration run
//!
//! Handlers record every file-system effect as an [`Operation`] against the
//! project unit it touched. The report deduplicates identical operations,
//! keeps per-status counters and renders the final summary.
//!
//! All state sits behind a [`Mutex`], so a report can be shared by reference
//! between handlers (and threads) without further locking.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{error, warn};

/// What happened to a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Move,
    Copy,
    Delete,
    Create,
    Modify,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Move => "MOVE",
            OperationKind::Copy => "COPY",
            OperationKind::Delete => "DELETE",
            OperationKind::Create => "CREATE",
            OperationKind::Modify => "MODIFY",
        };
        f.write_str(name)
    }
}

/// How it went
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationStatus {
    Success,
    Skipped,
    /// Needs human review, e.g. leftovers after a move
    Unknown,
    Warning,
    Failed,
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationStatus::Success => "SUCCESS",
            OperationStatus::Skipped => "SKIPPED",
            OperationStatus::Unknown => "UNKNOWN",
            OperationStatus::Warning => "WARNING",
            OperationStatus::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// One recorded operation
///
/// Equality and hashing ignore `message`: the same effect recorded twice with
/// different wording still counts once.
#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub source: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub status: OperationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.source == other.source
            && self.target == other.target
            && self.status == other.status
    }
}

impl Eq for Operation {}

impl Hash for Operation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.source.hash(state);
        self.target.hash(state);
        self.status.hash(state);
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |path: &Option<PathBuf>| {
            path.as_ref()
                .map_or_else(|| "N/A".to_string(), |p| p.display().to_string())
        };
        write!(f, "{} {}: ", self.status, self.kind)?;
        if self.source == self.target {
            write!(f, "{}", show(&self.source))?;
        } else {
            write!(f, "{} -> {}", show(&self.source), show(&self.target))?;
        }
        if let Some(message) = &self.message {
            write!(f, " ({})", message)?;
        }
        Ok(())
    }
}

/// Per-status operation counts of one project unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub success: usize,
    pub skipped: usize,
    pub unknown: usize,
    pub warning: usize,
    pub failed: usize,
}

impl StatusCounts {
    fn bump(&mut self, status: OperationStatus) {
        match status {
            OperationStatus::Success => self.success += 1,
            OperationStatus::Skipped => self.skipped += 1,
            OperationStatus::Unknown => self.unknown += 1,
            OperationStatus::Warning => self.warning += 1,
            OperationStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.skipped + self.unknown + self.warning + self.failed
    }
}

#[derive(Debug, Default)]
struct ProjectOperations {
    ordered: Vec<Operation>,
    seen: HashSet<Operation>,
    counts: StatusCounts,
}

#[derive(Debug, Default)]
struct ReportState {
    projects: BTreeMap<String, ProjectOperations>,
    critical_errors: Vec<String>,
}

/// Serializable snapshot of one project unit
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub counts: StatusCounts,
    pub operations: Vec<Operation>,
}

/// Serializable snapshot of a whole report
#[derive(Debug, Clone, Serialize)]
pub struct ReportSnapshot {
    pub projects: BTreeMap<String, ProjectSummary>,
    pub critical_errors: Vec<String>,
}

/// Concurrency-safe, append-only collection of operations
#[derive(Debug, Default)]
pub struct MigrationReport {
    state: Mutex<ReportState>,
}

impl MigrationReport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ReportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an operation; returns `false` when an equal one was already recorded
    pub fn record(
        &self,
        project: &str,
        kind: OperationKind,
        source: Option<&Path>,
        target: Option<&Path>,
        status: OperationStatus,
        message: Option<String>,
    ) -> bool {
        let operation = Operation {
            kind,
            source: source.map(Path::to_path_buf),
            target: target.map(Path::to_path_buf),
            status,
            message,
        };

        let mut state = self.lock();
        let entry = state.projects.entry(project.to_string()).or_default();
        if !entry.seen.insert(operation.clone()) {
            return false;
        }
        entry.counts.bump(status);
        if status == OperationStatus::Failed {
            warn!(project, operation = %operation, "failed operation");
        }
        entry.ordered.push(operation);
        true
    }

    pub fn record_success(&self, project: &str, kind: OperationKind, source: &Path, target: &Path) {
        self.record(project, kind, Some(source), Some(target), OperationStatus::Success, None);
    }

    pub fn record_skipped(
        &self,
        project: &str,
        kind: OperationKind,
        source: &Path,
        target: &Path,
        reason: impl Into<String>,
    ) {
        self.record(
            project,
            kind,
            Some(source),
            Some(target),
            OperationStatus::Skipped,
            Some(reason.into()),
        );
    }

    pub fn record_unknown(
        &self,
        project: &str,
        kind: OperationKind,
        source: &Path,
        target: Option<&Path>,
        reason: impl Into<String>,
    ) {
        self.record(
            project,
            kind,
            Some(source),
            target,
            OperationStatus::Unknown,
            Some(reason.into()),
        );
    }

    pub fn record_warning(
        &self,
        project: &str,
        kind: OperationKind,
        source: &Path,
        target: &Path,
        warning: impl Into<String>,
    ) {
        self.record(
            project,
            kind,
            Some(source),
            Some(target),
            OperationStatus::Warning,
            Some(warning.into()),
        );
    }

    pub fn record_failure(
        &self,
        project: &str,
        kind: OperationKind,
        source: &Path,
        target: Option<&Path>,
        error: impl Into<String>,
    ) {
        self.record(
            project,
            kind,
            Some(source),
            target,
            OperationStatus::Failed,
            Some(error.into()),
        );
    }

    /// Record an error that makes continuing the run pointless
    pub fn record_critical_error(&self, message: impl Into<String>) {
        let message = message.into();
        error!(%message, "critical migration error");
        self.lock().critical_errors.push(message);
    }

    pub fn has_critical_errors(&self) -> bool {
        !self.lock().critical_errors.is_empty()
    }

    pub fn critical_errors(&self) -> Vec<String> {
        self.lock().critical_errors.clone()
    }

    pub fn counts(&self, project: &str) -> StatusCounts {
        self.lock()
            .projects
            .get(project)
            .map(|p| p.counts)
            .unwrap_or_default()
    }

    /// Operations of `project` in recording order
    pub fn operations(&self, project: &str) -> Vec<Operation> {
        self.lock()
            .projects
            .get(project)
            .map(|p| p.ordered.clone())
            .unwrap_or_default()
    }

    pub fn projects(&self) -> Vec<String> {
        self.lock().projects.keys().cloned().collect()
    }

    /// Sum of counts across all project units
    pub fn totals(&self) -> StatusCounts {
        let state = self.lock();
        let mut totals = StatusCounts::default();
        for project in state.projects.values() {
            totals.success += project.counts.success;
            totals.skipped += project.counts.skipped;
            totals.unknown += project.counts.unknown;
            totals.warning += project.counts.warning;
            totals.failed += project.counts.failed;
        }
        totals
    }

    pub fn snapshot(&self) -> ReportSnapshot {
        let state = self.lock();
        ReportSnapshot {
            projects: state
                .projects
                .iter()
                .map(|(name, project)| {
                    (
                        name.clone(),
                        ProjectSummary {
                            counts: project.counts,
                            operations: project.ordered.clone(),
                        },
                    )
                })
                .collect(),
            critical_errors: state.critical_errors.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    /// Human-readable summary, one block per project unit in name order
    pub fn summary(&self) -> String {
        let state = self.lock();
        let mut out = String::from("Migration Summary Report:\n");

        for (name, project) in &state.projects {
            let c = project.counts;
            out.push_str(&format!(
                "Project '{}': {} operations ({} successful, {} skipped, {} unknown, {} warnings, {} failed)\n",
                name,
                c.total(),
                c.success,
                c.skipped,
                c.unknown,
                c.warning,
                c.failed
            ));

            for (status, count, title) in [
                (OperationStatus::Unknown, c.unknown, "Unknown operations"),
                (OperationStatus::Warning, c.warning, "Warnings"),
                (OperationStatus::Failed, c.failed, "Failed operations"),
            ] {
                if count == 0 {
                    continue;
                }
                out.push_str(&format!("  {}:\n", title));
                for operation in project.ordered.iter().filter(|op| op.status == status) {
                    out.push_str(&format!("    - {}\n", operation));
                }
            }
        }

        if !state.critical_errors.is_empty() {
            out.push_str("Critical errors:\n");
            for message in &state.critical_errors {
                out.push_str(&format!("  - {}\n", message));
            }
        }
        out
    }
}
