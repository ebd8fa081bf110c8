use crate::config::app_paths;
use crate::record::MediaBatch;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UndoLog {
    root: PathBuf,
    operations: Vec<RenameOperation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenameOperation {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameFailure {
    pub from: PathBuf,
    pub to: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApplyResult {
    pub applied: usize,
    pub unchanged: usize,
    pub operations: Vec<RenameOperation>,
    pub failures: Vec<RenameFailure>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Where to record completed renames for [`undo_from`]; `None` keeps no log.
    pub undo_log: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoResult {
    pub restored: usize,
    pub skipped: usize,
}

/// Renames every record whose computed name differs from its current one.
///
/// Files are renamed one at a time inside their own directory. An occupied
/// target or an OS error is recorded as a failure for that file and the rest
/// of the batch continues.
pub fn apply_batch(batch: &MediaBatch, options: &ApplyOptions) -> Result<ApplyResult> {
    let mut result = ApplyResult::default();

    for record in &batch.records {
        let Some(new_name) = record.new_name.as_deref() else {
            continue;
        };
        if !record.needs_rename() {
            result.unchanged += 1;
            continue;
        }

        let target = record.path.with_file_name(new_name);
        match rename_one(&record.path, &target) {
            Ok(()) => {
                info!(from = %record.name, to = %new_name, "renamed");
                result.operations.push(RenameOperation {
                    from: record.path.clone(),
                    to: target,
                });
            }
            Err(reason) => {
                warn!(from = %record.name, to = %new_name, reason = %reason, "rename skipped");
                result.failures.push(RenameFailure {
                    from: record.path.clone(),
                    to: target,
                    reason,
                });
            }
        }
    }

    result.applied = result.operations.len();
    // Written even when empty so `undo` never reaches back to an older run.
    if let Some(undo_path) = options.undo_log.as_deref() {
        if let Err(err) = persist_undo(undo_path, &batch.root, &result.operations) {
            warn!(path = %undo_path.display(), error = %err, "cannot record undo log");
        }
    }

    Ok(result)
}

fn rename_one(from: &Path, to: &Path) -> std::result::Result<(), String> {
    if from.parent() != to.parent() {
        return Err("target is outside the source directory".to_string());
    }
    if !from.exists() {
        return Err("source file no longer exists".to_string());
    }
    if to.exists() {
        return Err("target already exists".to_string());
    }
    fs::rename(from, to).map_err(|err| err.to_string())
}

pub fn undo_last() -> Result<UndoResult> {
    let paths = app_paths()?;
    undo_from(&paths.undo_path)
}

pub fn undo_from(undo_path: &Path) -> Result<UndoResult> {
    if !undo_path.exists() {
        bail!("nothing to undo");
    }

    let raw = fs::read_to_string(undo_path)
        .with_context(|| format!("cannot read undo log: {}", undo_path.display()))?;
    let log = serde_json::from_str::<UndoLog>(&raw).context("undo log is corrupt")?;

    let result = restore_operations(&log);

    fs::remove_file(undo_path)
        .with_context(|| format!("cannot remove undo log: {}", undo_path.display()))?;

    info!(root = %log.root.display(), restored = result.restored, skipped = result.skipped, "undo finished");
    Ok(result)
}

fn restore_operations(log: &UndoLog) -> UndoResult {
    let mut restored = 0usize;
    let mut skipped = 0usize;
    for op in log.operations.iter().rev() {
        if !op.to.exists() || op.from.exists() {
            skipped += 1;
            continue;
        }
        match fs::rename(&op.to, &op.from) {
            Ok(()) => restored += 1,
            Err(err) => {
                warn!(from = %op.to.display(), to = %op.from.display(), error = %err, "undo rename failed");
                skipped += 1;
            }
        }
    }
    UndoResult { restored, skipped }
}

fn persist_undo(undo_path: &Path, root: &Path, operations: &[RenameOperation]) -> Result<()> {
    if let Some(dir) = undo_path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create directory: {}", dir.display()))?;
    }

    let log = UndoLog {
        root: root.to_path_buf(),
        operations: operations.to_vec(),
    };
    let body = serde_json::to_string_pretty(&log).context("cannot serialize undo log")?;
    fs::write(undo_path, body)
        .with_context(|| format!("cannot write undo log: {}", undo_path.display()))?;
    Ok(())
}
