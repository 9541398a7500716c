//! Audit channel (spec §4.7): one JSON line per mutation, written through
//! the Data Accessor's `appendLog` for durability and mirrored to a
//! standalone `audit-log.json` under `.cleo/` that rotates past ~10MiB
//! (spec §4.7 "`audit-log-<iso>.json`"), keeping the 20 most recent
//! rotated files — the same shift-and-cap scheme as the teacher's
//! `rotate_bak_path`, generalised from a fixed 3-slot `.bak`/`.bak.N` ladder
//! to a timestamped name since rotated audit logs are inspected by date,
//! not by recency rank.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use cleo_core::{AuditLogRow, CleoError};
use cleo_storage::{DataAccessor, SafeAccessor};
use fs2::FileExt;

/// Checked post-write, not pre-write, so the common path (append one line)
/// never has to stat the file twice.
const ROTATE_THRESHOLD_BYTES: u64 = 10 * 1024 * 1024;
const RETAIN_ROTATED: usize = 20;

pub struct AuditWriter {
    path: PathBuf,
}

impl AuditWriter {
    pub fn new(cleo_home: &Path) -> Self {
        Self { path: cleo_home.join("audit-log.json") }
    }

    /// Append `row` to the accessor's own audit table and to the standalone
    /// rotating file, then rotate if the file just crossed the threshold.
    pub async fn record(&self, accessor: &SafeAccessor, row: &AuditLogRow) -> Result<(), CleoError> {
        accessor.append_log(row).await?;
        self.append_line(row)?;
        self.rotate_if_oversized()?;
        Ok(())
    }

    fn append_line(&self, row: &AuditLogRow) -> Result<(), CleoError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.lock_exclusive().map_err(|e| CleoError::lock_timeout(e.to_string()))?;
        let mut line = serde_json::to_string(row)?;
        line.push('\n');
        {
            let mut f = &file;
            f.write_all(line.as_bytes())?;
            f.sync_all()?;
        }
        FileExt::unlock(&file).map_err(|e| CleoError::file_error(e.to_string()))?;
        Ok(())
    }

    fn rotate_if_oversized(&self) -> Result<(), CleoError> {
        let size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if size < ROTATE_THRESHOLD_BYTES {
            return Ok(());
        }
        let dest = rotated_path(&self.path);
        fs::rename(&self.path, &dest)?;
        prune_rotated(&self.path, RETAIN_ROTATED)?;
        Ok(())
    }
}

/// `audit-log-<iso>.json` next to `audit-log.json` (spec §4.7).
fn rotated_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("audit-log");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{stem}-{stamp}.{ext}"))
}

/// Keep only the `retain` most recently rotated files matching
/// `<stem>-*.json`, deleting the rest (spec §4.7: "keeping the N most
/// recent"; SPEC_FULL §10 sets N=20).
fn prune_rotated(path: &Path, retain: usize) -> Result<(), CleoError> {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("audit-log").to_string();
    let parent = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    let prefix = format!("{stem}-");

    let mut rotated: Vec<(PathBuf, std::time::SystemTime)> = fs::read_dir(&parent)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
        .filter_map(|e| e.metadata().ok().and_then(|m| m.modified().ok()).map(|t| (e.path(), t)))
        .collect();
    rotated.sort_by_key(|(_, t)| std::cmp::Reverse(*t));
    for (stale, _) in rotated.into_iter().skip(retain) {
        let _ = fs::remove_file(stale);
    }
    Ok(())
}

/// Hook used by tests to force a rotation without writing 10MiB of lines.
#[cfg(test)]
pub(crate) fn force_rotate_for_test(path: &Path) -> Result<(), CleoError> {
    let dest = rotated_path(path);
    if path.exists() {
        fs::rename(path, &dest)?;
    } else {
        File::create(&dest)?;
    }
    prune_rotated(path, RETAIN_ROTATED)
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
