//! File-system operations that report their outcome
//!
//! Every call records exactly one operation for the project unit it was
//! created for. Errors never propagate: they become FAILED operations.

use crate::report::{MigrationReport, OperationKind};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// File mover/copier bound to one project unit of a report
pub struct FileOperations<'a> {
    report: &'a MigrationReport,
    project: &'a str,
}

impl<'a> FileOperations<'a> {
    pub fn new(report: &'a MigrationReport, project: &'a str) -> Self {
        Self { report, project }
    }

    /// Move a file or directory; returns whether it moved
    ///
    /// A missing source or an existing target is SKIPPED. Missing parent
    /// directories of the target are created.
    pub fn move_path(&self, source: &Path, target: &Path) -> bool {
        if !source.exists() {
            self.report.record_skipped(
                self.project,
                OperationKind::Move,
                source,
                target,
                "Source does not exist",
            );
            return false;
        }
        if target.exists() {
            self.report.record_skipped(
                self.project,
                OperationKind::Move,
                source,
                target,
                "Target already exists",
            );
            return false;
        }
        self.finish(OperationKind::Move, source, target, move_path(source, target))
    }

    /// Copy a single file, replacing an existing target
    pub fn copy_file(&self, source: &Path, target: &Path) -> bool {
        let result = ensure_parent(target).and_then(|()| fs::copy(source, target).map(|_| ()));
        self.finish(OperationKind::Copy, source, target, result)
    }

    /// Delete a file or a whole directory tree
    pub fn delete_path(&self, path: &Path) -> bool {
        let result = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        self.finish(OperationKind::Delete, path, path, result)
    }

    fn finish(&self, kind: OperationKind, source: &Path, target: &Path, result: io::Result<()>) -> bool {
        match result {
            Ok(()) => {
                debug!(project = self.project, %kind, source = %source.display(), "file operation done");
                self.report.record_success(self.project, kind, source, target);
                true
            }
            Err(err) => {
                self.report
                    .record_failure(self.project, kind, source, Some(target), err.to_string());
                false
            }
        }
    }
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Rename, falling back to copy and delete across file systems
fn move_path(source: &Path, target: &Path) -> io::Result<()> {
    ensure_parent(target)?;
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(err) => {
            debug!(source = %source.display(), error = %err, "rename failed, copying instead");
            copy_and_remove(source, target)
        }
    }
}

fn copy_and_remove(source: &Path, target: &Path) -> io::Result<()> {
    if !source.is_dir() {
        fs::copy(source, target)?;
        return fs::remove_file(source);
    }
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let destination = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
        } else {
            fs::copy(entry.path(), &destination)?;
        }
    }
    fs::remove_dir_all(source)
}
