//! `SafeAccessor` (spec §4.1, §4.2): the mandatory decorator around any
//! [`DataAccessor`] that does monotone ID allocation with collision
//! retry, read-after-write verification, and debounced backup snapshots.
//! Not constructible except through [`open`] — domain operations take
//! `&SafeAccessor` concretely (never `&dyn DataAccessor`) so the wrapper
//! can never be bypassed (spec §4.2: "cannot be bypassed from above").

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cleo_core::{
    AuditLogRow, BackgroundJob, BackgroundJobId, CleoConfig, CleoError, Evidence, GateResult,
    LifecyclePipeline, LifecycleStageRow, Session, SessionId, StorageEngineKind, Task, TaskDependency,
    TaskId, TaskRelation, TaskUpdate, TaskWorkEntry, Transition,
};
use parking_lot::Mutex;

use crate::accessor::{DataAccessor, TaskListFilter};
use crate::aggregate::{ArchiveFile, SessionsFile, TaskFile};
use crate::dual::DualAccessor;
use crate::json::JsonAccessor;
use crate::sqlite::SqliteAccessor;

const ID_COLLISION_RETRIES: u32 = 5;
const SNAPSHOT_DEBOUNCE: Duration = Duration::from_secs(30);
const SNAPSHOT_RETAIN: usize = 10;

/// Construct the configured engine, always wrapped in [`SafeAccessor`]
/// (spec §4.2: "The safety wrapper is mandatory at factory level").
pub fn open(engine: StorageEngineKind, cleo_home: &Path) -> Result<SafeAccessor, CleoError> {
    let db_path = cleo_home.join("tasks.db");
    let json_root = cleo_home.join("json");
    let inner: Box<dyn DataAccessor> = match engine {
        StorageEngineKind::Sqlite => Box::new(SqliteAccessor::open(&db_path)?),
        StorageEngineKind::Json => Box::new(JsonAccessor::open(&json_root)?),
        StorageEngineKind::Dual => Box::new(DualAccessor::open(&db_path, &json_root)?),
    };
    Ok(SafeAccessor::new(inner))
}

pub struct SafeAccessor {
    inner: Box<dyn DataAccessor>,
    last_snapshot: Mutex<Option<Instant>>,
    snapshot_seq: AtomicI64,
}

impl SafeAccessor {
    pub fn new(inner: Box<dyn DataAccessor>) -> Self {
        Self { inner, last_snapshot: Mutex::new(None), snapshot_seq: AtomicI64::new(0) }
    }

    /// Allocate the next `T<n>` id, retrying with jitter on collision
    /// (spec §4.1: "retry up to N times with a jittered read").
    pub async fn allocate_task_id(&self) -> Result<TaskId, CleoError> {
        let mut candidate = self.inner.max_task_numeric_id().await? + 1;
        for attempt in 0..ID_COLLISION_RETRIES {
            if self.inner.get_task(TaskId::from_numeric(candidate)).await?.is_none() {
                return Ok(TaskId::from_numeric(candidate));
            }
            let jitter = 1 + (std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.subsec_nanos() as u64)
                .unwrap_or(0)
                % (attempt as u64 + 2));
            candidate += jitter;
        }
        Err(CleoError::id_collision(&format!("T{candidate}")))
    }

    /// Insert a task and re-read it to confirm the primary attributes
    /// landed (spec §4.1: "read-after-write verification").
    pub async fn insert_task_verified(&self, task: &Task) -> Result<(), CleoError> {
        self.inner.insert_task(task).await?;
        let readback = self
            .inner
            .get_task(task.id)
            .await?
            .ok_or_else(|| CleoError::write_verify_failed(format!("task {} missing after insert", task.id)))?;
        if readback.title != task.title || readback.status != task.status {
            return Err(CleoError::write_verify_failed(format!("task {} readback mismatch", task.id)));
        }
        Ok(())
    }

    /// Insert a session and verify it is readable afterward.
    pub async fn insert_session_verified(&self, session: &Session) -> Result<(), CleoError> {
        self.inner.insert_session(session).await?;
        self.inner
            .get_session(&session.id)
            .await?
            .ok_or_else(|| CleoError::write_verify_failed(format!("session {} missing after insert", session.id)))?;
        Ok(())
    }

    /// Apply a partial update and re-read to confirm it landed (spec §4.1:
    /// "re-reads the just-written row after every insert/update").
    pub async fn update_task_verified(&self, id: TaskId, update: &TaskUpdate) -> Result<Task, CleoError> {
        let updated = self.inner.update_task(id, update).await?;
        let readback = self
            .inner
            .get_task(id)
            .await?
            .ok_or_else(|| CleoError::write_verify_failed(format!("task {id} missing after update")))?;
        if readback.status != updated.status || readback.title != updated.title {
            return Err(CleoError::write_verify_failed(format!("task {id} readback mismatch after update")));
        }
        Ok(readback)
    }

    /// Replace a task wholesale and re-read to confirm it landed.
    pub async fn replace_task_verified(&self, task: &Task) -> Result<(), CleoError> {
        self.inner.replace_task(task).await?;
        let readback = self
            .inner
            .get_task(task.id)
            .await?
            .ok_or_else(|| CleoError::write_verify_failed(format!("task {} missing after replace", task.id)))?;
        if readback.status != task.status {
            return Err(CleoError::write_verify_failed(format!("task {} readback mismatch after replace", task.id)));
        }
        Ok(())
    }

    /// Replace a session wholesale and re-read to confirm it landed.
    pub async fn replace_session_verified(&self, session: &Session) -> Result<(), CleoError> {
        self.inner.replace_session(session).await?;
        let readback = self
            .inner
            .get_session(&session.id)
            .await?
            .ok_or_else(|| CleoError::write_verify_failed(format!("session {} missing after replace", session.id)))?;
        if readback.status != session.status {
            return Err(CleoError::write_verify_failed(format!(
                "session {} readback mismatch after replace",
                session.id
            )));
        }
        Ok(())
    }

    /// Replace a lifecycle pipeline row and re-read to confirm it landed.
    pub async fn replace_pipeline_verified(&self, pipeline: &LifecyclePipeline) -> Result<(), CleoError> {
        self.inner.replace_pipeline(pipeline).await?;
        let readback = self.inner.get_pipeline(pipeline.task_id).await?.ok_or_else(|| {
            CleoError::write_verify_failed(format!("pipeline for task {} missing after replace", pipeline.task_id))
        })?;
        if readback.current_stage_id != pipeline.current_stage_id || readback.status != pipeline.status {
            return Err(CleoError::write_verify_failed(format!(
                "pipeline for task {} readback mismatch after replace",
                pipeline.task_id
            )));
        }
        Ok(())
    }

    /// Replace a lifecycle stage row and re-read to confirm it landed.
    pub async fn replace_stage_verified(&self, stage: &LifecycleStageRow) -> Result<(), CleoError> {
        self.inner.replace_stage(stage).await?;
        let stages = self.inner.list_stages(stage.pipeline_id).await?;
        let readback = stages
            .into_iter()
            .find(|s| s.id == stage.id)
            .ok_or_else(|| CleoError::write_verify_failed(format!("stage {} missing after replace", stage.id)))?;
        if readback.status != stage.status {
            return Err(CleoError::write_verify_failed(format!("stage {} readback mismatch after replace", stage.id)));
        }
        Ok(())
    }

    /// Replace a background job row and re-read to confirm it landed.
    pub async fn replace_job_verified(&self, job: &BackgroundJob) -> Result<(), CleoError> {
        self.inner.replace_job(job).await?;
        let readback = self
            .inner
            .get_job(job.id)
            .await?
            .ok_or_else(|| CleoError::write_verify_failed(format!("job {} missing after replace", job.id)))?;
        if readback.status != job.status {
            return Err(CleoError::write_verify_failed(format!("job {} readback mismatch after replace", job.id)));
        }
        Ok(())
    }

    /// Debounced backup snapshot: no-ops unless `SNAPSHOT_DEBOUNCE` has
    /// elapsed since the last one (spec §4.1: "every >=30s of wall-clock").
    pub async fn maybe_snapshot(&self, backups_dir: &Path) -> Result<(), CleoError> {
        let due = {
            let mut last = self.last_snapshot.lock();
            let due = last.map(|t| t.elapsed() >= SNAPSHOT_DEBOUNCE).unwrap_or(true);
            if due {
                *last = Some(Instant::now());
            }
            due
        };
        if due {
            self.force_snapshot(backups_dir).await?;
        }
        Ok(())
    }

    /// Snapshot unconditionally, bypassing the debounce (spec §4.1:
    /// "forced on session end").
    pub async fn force_snapshot(&self, backups_dir: &Path) -> Result<(), CleoError> {
        std::fs::create_dir_all(backups_dir)?;
        let now = chrono::Utc::now();
        let seq = self.snapshot_seq.fetch_add(1, Ordering::Relaxed);
        let name = format!("tasks-{}-{:03}", now.format("%Y%m%d-%H%M%S"), seq);
        let dest = backups_dir.join(name);
        self.inner.snapshot(&dest).await?;
        *self.last_snapshot.lock() = Some(Instant::now());
        rotate_snapshots(backups_dir, SNAPSHOT_RETAIN)?;
        Ok(())
    }
}

/// Keep only the `retain` most recently modified snapshot entries under
/// `dir`, deleting the rest (spec §4.1: "retain the 10 most recent").
fn rotate_snapshots(dir: &Path, retain: usize) -> Result<(), CleoError> {
    let mut entries: Vec<(PathBuf, std::time::SystemTime)> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok().and_then(|m| m.modified().ok()).map(|t| (e.path(), t)))
        .collect();
    entries.sort_by_key(|(_, t)| std::cmp::Reverse(*t));
    for (path, _) in entries.into_iter().skip(retain) {
        if path.is_dir() {
            let _ = std::fs::remove_dir_all(path);
        } else {
            let _ = std::fs::remove_file(path);
        }
    }
    Ok(())
}

#[async_trait]
impl DataAccessor for SafeAccessor {
    async fn load_task_file(&self) -> Result<TaskFile, CleoError> {
        self.inner.load_task_file().await
    }
    async fn save_task_file(&self, file: &TaskFile) -> Result<(), CleoError> {
        self.inner.save_task_file(file).await
    }
    async fn load_archive(&self) -> Result<ArchiveFile, CleoError> {
        self.inner.load_archive().await
    }
    async fn save_archive(&self, file: &ArchiveFile) -> Result<(), CleoError> {
        self.inner.save_archive(file).await
    }
    async fn load_sessions(&self) -> Result<SessionsFile, CleoError> {
        self.inner.load_sessions().await
    }
    async fn save_sessions(&self, file: &SessionsFile) -> Result<(), CleoError> {
        self.inner.save_sessions(file).await
    }
    async fn append_log(&self, row: &AuditLogRow) -> Result<(), CleoError> {
        self.inner.append_log(row).await
    }
    async fn close(&self) -> Result<(), CleoError> {
        self.inner.close().await
    }

    async fn insert_task(&self, task: &Task) -> Result<(), CleoError> {
        self.insert_task_verified(task).await
    }
    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, CleoError> {
        self.inner.get_task(id).await
    }
    async fn update_task(&self, id: TaskId, update: &TaskUpdate) -> Result<Task, CleoError> {
        self.update_task_verified(id, update).await
    }
    async fn replace_task(&self, task: &Task) -> Result<(), CleoError> {
        self.replace_task_verified(task).await
    }
    async fn delete_task(&self, id: TaskId) -> Result<(), CleoError> {
        self.inner.delete_task(id).await
    }
    async fn list_tasks(&self, filter: &TaskListFilter) -> Result<Vec<Task>, CleoError> {
        self.inner.list_tasks(filter).await
    }
    async fn max_task_numeric_id(&self) -> Result<u64, CleoError> {
        self.inner.max_task_numeric_id().await
    }

    async fn add_dependency(&self, dep: TaskDependency) -> Result<(), CleoError> {
        self.inner.add_dependency(dep).await
    }
    async fn list_dependencies(&self, task_id: TaskId) -> Result<Vec<TaskDependency>, CleoError> {
        self.inner.list_dependencies(task_id).await
    }
    async fn list_dependents(&self, task_id: TaskId) -> Result<Vec<TaskDependency>, CleoError> {
        self.inner.list_dependents(task_id).await
    }
    async fn add_relation(&self, rel: TaskRelation) -> Result<(), CleoError> {
        self.inner.add_relation(rel).await
    }
    async fn list_relations(&self, task_id: TaskId) -> Result<Vec<TaskRelation>, CleoError> {
        self.inner.list_relations(task_id).await
    }

    async fn insert_session(&self, session: &Session) -> Result<(), CleoError> {
        self.insert_session_verified(session).await
    }
    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, CleoError> {
        self.inner.get_session(id).await
    }
    async fn replace_session(&self, session: &Session) -> Result<(), CleoError> {
        self.replace_session_verified(session).await
    }
    async fn list_sessions(&self) -> Result<Vec<Session>, CleoError> {
        self.inner.list_sessions().await
    }
    async fn current_session_id(&self) -> Result<Option<SessionId>, CleoError> {
        self.inner.current_session_id().await
    }
    async fn set_current_session_id(&self, id: Option<SessionId>) -> Result<(), CleoError> {
        self.inner.set_current_session_id(id).await
    }

    async fn append_task_work(&self, entry: &TaskWorkEntry) -> Result<(), CleoError> {
        self.inner.append_task_work(entry).await
    }
    async fn open_task_work(&self, session_id: &SessionId) -> Result<Option<TaskWorkEntry>, CleoError> {
        self.inner.open_task_work(session_id).await
    }
    async fn close_task_work(
        &self,
        session_id: &SessionId,
        task_id: TaskId,
        cleared_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), CleoError> {
        self.inner.close_task_work(session_id, task_id, cleared_at).await
    }
    async fn task_work_history(&self, session_id: &SessionId) -> Result<Vec<TaskWorkEntry>, CleoError> {
        self.inner.task_work_history(session_id).await
    }

    async fn get_pipeline(&self, task_id: TaskId) -> Result<Option<LifecyclePipeline>, CleoError> {
        self.inner.get_pipeline(task_id).await
    }
    async fn create_pipeline(&self, task_id: TaskId) -> Result<LifecyclePipeline, CleoError> {
        self.inner.create_pipeline(task_id).await
    }
    async fn replace_pipeline(&self, pipeline: &LifecyclePipeline) -> Result<(), CleoError> {
        self.replace_pipeline_verified(pipeline).await
    }
    async fn list_stages(&self, pipeline_id: i64) -> Result<Vec<LifecycleStageRow>, CleoError> {
        self.inner.list_stages(pipeline_id).await
    }
    async fn replace_stage(&self, stage: &LifecycleStageRow) -> Result<(), CleoError> {
        self.replace_stage_verified(stage).await
    }
    async fn record_gate(&self, gate: &GateResult) -> Result<(), CleoError> {
        self.inner.record_gate(gate).await
    }
    async fn list_gates(&self, stage_id: i64) -> Result<Vec<GateResult>, CleoError> {
        self.inner.list_gates(stage_id).await
    }
    async fn add_evidence(&self, evidence: &Evidence) -> Result<(), CleoError> {
        self.inner.add_evidence(evidence).await
    }
    async fn list_evidence(&self, stage_id: i64) -> Result<Vec<Evidence>, CleoError> {
        self.inner.list_evidence(stage_id).await
    }
    async fn record_transition(&self, transition: &Transition) -> Result<(), CleoError> {
        self.inner.record_transition(transition).await
    }
    async fn list_transitions(&self, pipeline_id: i64) -> Result<Vec<Transition>, CleoError> {
        self.inner.list_transitions(pipeline_id).await
    }

    async fn insert_job(&self, job: &BackgroundJob) -> Result<(), CleoError> {
        self.inner.insert_job(job).await
    }
    async fn get_job(&self, id: BackgroundJobId) -> Result<Option<BackgroundJob>, CleoError> {
        self.inner.get_job(id).await
    }
    async fn replace_job(&self, job: &BackgroundJob) -> Result<(), CleoError> {
        self.replace_job_verified(job).await
    }
    async fn list_jobs(&self) -> Result<Vec<BackgroundJob>, CleoError> {
        self.inner.list_jobs().await
    }
    async fn delete_job(&self, id: BackgroundJobId) -> Result<(), CleoError> {
        self.inner.delete_job(id).await
    }

    async fn load_config(&self) -> Result<CleoConfig, CleoError> {
        self.inner.load_config().await
    }
    async fn save_config(&self, config: &CleoConfig) -> Result<(), CleoError> {
        self.inner.save_config(config).await
    }

    async fn snapshot(&self, dest: &Path) -> Result<(), CleoError> {
        self.inner.snapshot(dest).await
    }
}

#[cfg(test)]
#[path = "safe_tests.rs"]
mod tests;
