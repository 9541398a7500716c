//! JSON-file-backed `DataAccessor` (spec §4.2).
//!
//! Every mutating aggregate keeps its whole-file shape in memory behind a
//! single `tokio::sync::Mutex<JsonState>` and round-trips it to disk on
//! every call: atomic temp-file write + `fsync` + rename, preceded by an
//! advisory lock on the target path (spec §5 — "readers tolerate the brief
//! window between rename and read"). There is no per-row granularity here;
//! the trait's granular methods are implemented in terms of the in-memory
//! aggregate, matching how the teacher's `snapshot.rs` treats its state
//! file as the unit of persistence.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;

use cleo_core::{
    AuditLogRow, BackgroundJob, BackgroundJobId, CleoConfig, CleoError, Evidence, GateResult,
    LifecyclePipeline, LifecycleStageRow, PipelineStatus, Session, SessionId, Task, TaskDependency,
    TaskId, TaskRelation, TaskStatus, TaskUpdate, TaskWorkEntry, Transition,
};

use crate::accessor::{DataAccessor, TaskListFilter};
use crate::aggregate::{ArchiveFile, SessionsFile, TaskFile};

/// Everything the JSON engine keeps in-process between calls, mirroring
/// the SQLite schema's tables so the two engines answer identically
/// (spec §9: "read SQLite-authoritative with JSON fallback").
#[derive(Debug, Clone, Default, Serialize, serde::Deserialize)]
struct LifecycleState {
    #[serde(default)]
    pipelines: Vec<LifecyclePipeline>,
    #[serde(default)]
    stages: Vec<LifecycleStageRow>,
    #[serde(default)]
    gates: Vec<GateResult>,
    #[serde(default)]
    evidence: Vec<Evidence>,
    #[serde(default)]
    transitions: Vec<Transition>,
    #[serde(default)]
    next_id: i64,
}

impl LifecycleState {
    fn alloc(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

struct JsonState {
    tasks: TaskFile,
    archive: ArchiveFile,
    sessions: SessionsFile,
    lifecycle: LifecycleState,
    jobs: Vec<BackgroundJob>,
    config: CleoConfig,
}

pub struct JsonAccessor {
    root: PathBuf,
    state: Mutex<JsonState>,
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, CleoError> {
    if !path.exists() {
        return Ok(T::default());
    }
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak`/`.bak.N` path, rotating older backups out. Keeps up
/// to [`MAX_BAK_FILES`] generations: `.bak`, `.bak.2`, `.bak.3` (spec §4.2:
/// "rolling .bak/.bak.2/.bak.3 backups, same rotation discipline the
/// storage engine's snapshot uses").
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| if n == 1 { path.with_extension("bak") } else { path.with_extension(format!("bak.{n}")) };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }
    bak(1)
}

/// Atomic write: lock the target for the duration, rotate the existing
/// file into `.bak`, write to a sibling `.tmp` file, `fsync` it, then
/// rename over the target (spec §5, §4.2).
fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), CleoError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let lock_file = File::options().create(true).write(true).truncate(false).open(path)?;
    lock_file.lock_exclusive().map_err(|e| CleoError::lock_timeout(e.to_string()))?;

    if path.exists() {
        let bak_path = rotate_bak_path(path);
        let _ = fs::copy(path, &bak_path);
    }

    let tmp_path = path.with_extension("tmp");
    let bytes = serde_json::to_vec_pretty(value)?;
    {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&bytes)?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    FileExt::unlock(&lock_file).map_err(|e| CleoError::file_error(e.to_string()))?;
    Ok(())
}

impl JsonAccessor {
    /// Open (or initialise) the JSON aggregate files under `root`.
    pub fn open(root: &Path) -> Result<Self, CleoError> {
        fs::create_dir_all(root)?;
        let tasks = load_or_default(&root.join("tasks.json"))?;
        let archive = load_or_default(&root.join("archive.json"))?;
        let sessions = load_or_default(&root.join("sessions.json"))?;
        let lifecycle = load_or_default(&root.join("lifecycle.json"))?;
        let jobs = load_or_default(&root.join("jobs.json"))?;
        let config = load_or_default(&root.join("config.json"))?;
        Ok(Self { root: root.to_path_buf(), state: Mutex::new(JsonState { tasks, archive, sessions, lifecycle, jobs, config }) })
    }

    fn tasks_path(&self) -> PathBuf {
        self.root.join("tasks.json")
    }
    fn archive_path(&self) -> PathBuf {
        self.root.join("archive.json")
    }
    fn sessions_path(&self) -> PathBuf {
        self.root.join("sessions.json")
    }
    fn lifecycle_path(&self) -> PathBuf {
        self.root.join("lifecycle.json")
    }
    fn jobs_path(&self) -> PathBuf {
        self.root.join("jobs.json")
    }
    fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }
    fn audit_path(&self) -> PathBuf {
        self.root.join("audit-log.jsonl")
    }
}

#[async_trait]
impl DataAccessor for JsonAccessor {
    async fn load_task_file(&self) -> Result<TaskFile, CleoError> {
        Ok(self.state.lock().await.tasks.clone())
    }

    async fn save_task_file(&self, file: &TaskFile) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        state.tasks = file.clone();
        write_atomic(&self.tasks_path(), &state.tasks)
    }

    async fn load_archive(&self) -> Result<ArchiveFile, CleoError> {
        Ok(self.state.lock().await.archive.clone())
    }

    async fn save_archive(&self, file: &ArchiveFile) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        state.archive = file.clone();
        write_atomic(&self.archive_path(), &state.archive)
    }

    async fn load_sessions(&self) -> Result<SessionsFile, CleoError> {
        Ok(self.state.lock().await.sessions.clone())
    }

    async fn save_sessions(&self, file: &SessionsFile) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        state.sessions = file.clone();
        write_atomic(&self.sessions_path(), &state.sessions)
    }

    async fn append_log(&self, row: &AuditLogRow) -> Result<(), CleoError> {
        if let Some(parent) = self.audit_path().parent() {
            fs::create_dir_all(parent)?;
        }
        let lock_file = File::options().create(true).append(true).open(self.audit_path())?;
        lock_file.lock_exclusive().map_err(|e| CleoError::lock_timeout(e.to_string()))?;
        let mut line = serde_json::to_string(row)?;
        line.push('\n');
        {
            let mut f = &lock_file;
            f.write_all(line.as_bytes())?;
            f.sync_all()?;
        }
        FileExt::unlock(&lock_file).map_err(|e| CleoError::file_error(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), CleoError> {
        Ok(())
    }

    async fn insert_task(&self, task: &Task) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        state.tasks.tasks.push(task.clone());
        if task.id.numeric() >= state.tasks.next_id {
            state.tasks.next_id = task.id.numeric() + 1;
        }
        write_atomic(&self.tasks_path(), &state.tasks)
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, CleoError> {
        let state = self.state.lock().await;
        Ok(state.tasks.tasks.iter().chain(state.archive.tasks.iter()).find(|t| t.id == id).cloned())
    }

    async fn update_task(&self, id: TaskId, update: &TaskUpdate) -> Result<Task, CleoError> {
        let mut state = self.state.lock().await;
        let task = state
            .tasks
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| CleoError::not_found("task", &id.to_string()))?;

        if let Some(title) = &update.title {
            task.title = title.clone();
        }
        if let Some(description) = &update.description {
            task.description = description.clone();
        }
        if let Some(status) = update.status {
            task.status = status;
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }
        if let Some(phase) = &update.phase {
            task.phase = Some(phase.clone());
        }
        if let Some(size) = update.size {
            task.size = Some(size);
        }
        if let Some(labels) = &update.labels {
            task.labels = labels.clone();
        }
        if let Some(notes) = &update.notes {
            task.notes = notes.clone();
        }
        if let Some(ac) = &update.acceptance_criteria {
            task.acceptance_criteria = ac.clone();
        }
        if let Some(files) = &update.files {
            task.files = files.clone();
        }
        task.updated_at = chrono::Utc::now();
        let result = task.clone();
        write_atomic(&self.tasks_path(), &state.tasks)?;
        Ok(result)
    }

    async fn replace_task(&self, task: &Task) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        state.tasks.tasks.retain(|t| t.id != task.id);
        state.archive.tasks.retain(|t| t.id != task.id);
        if task.status == TaskStatus::Archived {
            state.archive.tasks.push(task.clone());
            write_atomic(&self.archive_path(), &state.archive)?;
            write_atomic(&self.tasks_path(), &state.tasks)
        } else {
            state.tasks.tasks.push(task.clone());
            write_atomic(&self.tasks_path(), &state.tasks)
        }
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        state.tasks.tasks.retain(|t| t.id != id);
        state.tasks.dependencies.retain(|d| d.task_id != id && d.depends_on != id);
        state.tasks.relations.retain(|r| r.task_id != id && r.related_to != id);
        state.archive.tasks.retain(|t| t.id != id);
        write_atomic(&self.archive_path(), &state.archive)?;
        write_atomic(&self.tasks_path(), &state.tasks)
    }

    async fn list_tasks(&self, filter: &TaskListFilter) -> Result<Vec<Task>, CleoError> {
        let state = self.state.lock().await;
        let source: Vec<&Task> = if filter.status == Some(TaskStatus::Archived) {
            state.archive.tasks.iter().collect()
        } else {
            state.tasks.tasks.iter().collect()
        };
        let mut out: Vec<Task> = source
            .into_iter()
            .filter(|t| filter.status.map(|s| t.status == s).unwrap_or(true))
            .filter(|t| filter.parent_id.map(|p| t.parent_id == Some(p)).unwrap_or(true))
            .filter(|t| filter.task_type.map(|ty| t.task_type == ty).unwrap_or(true))
            .filter(|t| filter.phase.as_ref().map(|p| t.phase.as_deref() == Some(p.as_str())).unwrap_or(true))
            .cloned()
            .collect();
        out.sort_by_key(|t| t.position);
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn max_task_numeric_id(&self) -> Result<u64, CleoError> {
        let state = self.state.lock().await;
        Ok(state
            .tasks
            .tasks
            .iter()
            .chain(state.archive.tasks.iter())
            .map(|t| t.id.numeric())
            .max()
            .unwrap_or(0))
    }

    async fn add_dependency(&self, dep: TaskDependency) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        if !state.tasks.dependencies.contains(&dep) {
            state.tasks.dependencies.push(dep);
        }
        write_atomic(&self.tasks_path(), &state.tasks)
    }

    async fn list_dependencies(&self, task_id: TaskId) -> Result<Vec<TaskDependency>, CleoError> {
        let state = self.state.lock().await;
        Ok(state.tasks.dependencies.iter().filter(|d| d.task_id == task_id).copied().collect())
    }

    async fn list_dependents(&self, task_id: TaskId) -> Result<Vec<TaskDependency>, CleoError> {
        let state = self.state.lock().await;
        Ok(state.tasks.dependencies.iter().filter(|d| d.depends_on == task_id).copied().collect())
    }

    async fn add_relation(&self, rel: TaskRelation) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        if !state.tasks.relations.contains(&rel) {
            state.tasks.relations.push(rel);
        }
        write_atomic(&self.tasks_path(), &state.tasks)
    }

    async fn list_relations(&self, task_id: TaskId) -> Result<Vec<TaskRelation>, CleoError> {
        let state = self.state.lock().await;
        Ok(state.tasks.relations.iter().filter(|r| r.task_id == task_id).copied().collect())
    }

    async fn insert_session(&self, session: &Session) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        state.sessions.sessions.push(session.clone());
        write_atomic(&self.sessions_path(), &state.sessions)
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, CleoError> {
        let state = self.state.lock().await;
        Ok(state.sessions.sessions.iter().find(|s| &s.id == id).cloned())
    }

    async fn replace_session(&self, session: &Session) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        state.sessions.sessions.retain(|s| s.id != session.id);
        state.sessions.sessions.push(session.clone());
        write_atomic(&self.sessions_path(), &state.sessions)
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, CleoError> {
        Ok(self.state.lock().await.sessions.sessions.clone())
    }

    async fn current_session_id(&self) -> Result<Option<SessionId>, CleoError> {
        Ok(self.state.lock().await.sessions.current_session_id.clone())
    }

    async fn set_current_session_id(&self, id: Option<SessionId>) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        state.sessions.current_session_id = id;
        write_atomic(&self.sessions_path(), &state.sessions)
    }

    async fn append_task_work(&self, entry: &TaskWorkEntry) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        state.tasks.task_work.push(entry.clone());
        write_atomic(&self.tasks_path(), &state.tasks)
    }

    async fn open_task_work(&self, session_id: &SessionId) -> Result<Option<TaskWorkEntry>, CleoError> {
        let state = self.state.lock().await;
        Ok(state
            .tasks
            .task_work
            .iter()
            .rev()
            .find(|e| &e.session_id == session_id && e.is_open())
            .cloned())
    }

    async fn close_task_work(
        &self,
        session_id: &SessionId,
        task_id: TaskId,
        cleared_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        if let Some(entry) = state
            .tasks
            .task_work
            .iter_mut()
            .find(|e| &e.session_id == session_id && e.task_id == task_id && e.is_open())
        {
            entry.cleared_at = Some(cleared_at);
        }
        write_atomic(&self.tasks_path(), &state.tasks)
    }

    async fn task_work_history(&self, session_id: &SessionId) -> Result<Vec<TaskWorkEntry>, CleoError> {
        let state = self.state.lock().await;
        Ok(state.tasks.task_work.iter().filter(|e| &e.session_id == session_id).cloned().collect())
    }

    async fn get_pipeline(&self, task_id: TaskId) -> Result<Option<LifecyclePipeline>, CleoError> {
        let state = self.state.lock().await;
        Ok(state.lifecycle.pipelines.iter().find(|p| p.task_id == task_id).cloned())
    }

    async fn create_pipeline(&self, task_id: TaskId) -> Result<LifecyclePipeline, CleoError> {
        let mut state = self.state.lock().await;
        let pipeline_id = state.lifecycle.alloc();
        let now = chrono::Utc::now();

        let mut first_stage_id = 0;
        for (seq, stage) in cleo_core::PipelineStage::ORDERED.iter().enumerate() {
            let stage_id = state.lifecycle.alloc();
            if seq == 0 {
                first_stage_id = stage_id;
            }
            state.lifecycle.stages.push(LifecycleStageRow {
                id: stage_id,
                pipeline_id,
                stage_name: *stage,
                sequence: seq as u8,
                status: cleo_core::StageStatus::Pending,
                started_at: None,
                completed_at: None,
                blocked_at: None,
                skipped_at: None,
                reason: None,
                notes: Vec::new(),
                metadata: serde_json::json!({}),
            });
        }
        let pipeline = LifecyclePipeline {
            id: pipeline_id,
            task_id,
            status: PipelineStatus::Active,
            current_stage_id: first_stage_id,
            started_at: now,
            completed_at: None,
        };
        state.lifecycle.pipelines.push(pipeline.clone());
        write_atomic(&self.lifecycle_path(), &state.lifecycle)?;
        Ok(pipeline)
    }

    async fn replace_pipeline(&self, pipeline: &LifecyclePipeline) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        if let Some(slot) = state.lifecycle.pipelines.iter_mut().find(|p| p.id == pipeline.id) {
            *slot = pipeline.clone();
        }
        write_atomic(&self.lifecycle_path(), &state.lifecycle)
    }

    async fn list_stages(&self, pipeline_id: i64) -> Result<Vec<LifecycleStageRow>, CleoError> {
        let state = self.state.lock().await;
        let mut out: Vec<LifecycleStageRow> =
            state.lifecycle.stages.iter().filter(|s| s.pipeline_id == pipeline_id).cloned().collect();
        out.sort_by_key(|s| s.sequence);
        Ok(out)
    }

    async fn replace_stage(&self, stage: &LifecycleStageRow) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        if let Some(slot) = state.lifecycle.stages.iter_mut().find(|s| s.id == stage.id) {
            *slot = stage.clone();
        }
        write_atomic(&self.lifecycle_path(), &state.lifecycle)
    }

    async fn record_gate(&self, gate: &GateResult) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        let mut gate = gate.clone();
        gate.id = state.lifecycle.alloc();
        state.lifecycle.gates.push(gate);
        write_atomic(&self.lifecycle_path(), &state.lifecycle)
    }

    async fn list_gates(&self, stage_id: i64) -> Result<Vec<GateResult>, CleoError> {
        let state = self.state.lock().await;
        Ok(state.lifecycle.gates.iter().filter(|g| g.stage_id == stage_id).cloned().collect())
    }

    async fn add_evidence(&self, evidence: &Evidence) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        let mut evidence = evidence.clone();
        evidence.id = state.lifecycle.alloc();
        state.lifecycle.evidence.push(evidence);
        write_atomic(&self.lifecycle_path(), &state.lifecycle)
    }

    async fn list_evidence(&self, stage_id: i64) -> Result<Vec<Evidence>, CleoError> {
        let state = self.state.lock().await;
        Ok(state.lifecycle.evidence.iter().filter(|e| e.stage_id == stage_id).cloned().collect())
    }

    async fn record_transition(&self, transition: &Transition) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        let mut transition = transition.clone();
        transition.id = state.lifecycle.alloc();
        state.lifecycle.transitions.push(transition);
        write_atomic(&self.lifecycle_path(), &state.lifecycle)
    }

    async fn list_transitions(&self, pipeline_id: i64) -> Result<Vec<Transition>, CleoError> {
        let state = self.state.lock().await;
        Ok(state.lifecycle.transitions.iter().filter(|t| t.pipeline_id == pipeline_id).cloned().collect())
    }

    async fn insert_job(&self, job: &BackgroundJob) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        state.jobs.push(job.clone());
        write_atomic(&self.jobs_path(), &state.jobs)
    }

    async fn get_job(&self, id: BackgroundJobId) -> Result<Option<BackgroundJob>, CleoError> {
        let state = self.state.lock().await;
        Ok(state.jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn replace_job(&self, job: &BackgroundJob) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        state.jobs.retain(|j| j.id != job.id);
        state.jobs.push(job.clone());
        write_atomic(&self.jobs_path(), &state.jobs)
    }

    async fn list_jobs(&self) -> Result<Vec<BackgroundJob>, CleoError> {
        Ok(self.state.lock().await.jobs.clone())
    }

    async fn delete_job(&self, id: BackgroundJobId) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        state.jobs.retain(|j| j.id != id);
        write_atomic(&self.jobs_path(), &state.jobs)
    }

    async fn load_config(&self) -> Result<CleoConfig, CleoError> {
        Ok(self.state.lock().await.config.clone())
    }

    async fn save_config(&self, config: &CleoConfig) -> Result<(), CleoError> {
        let mut state = self.state.lock().await;
        state.config = config.clone();
        write_atomic(&self.config_path(), &state.config)
    }

    async fn snapshot(&self, dest: &Path) -> Result<(), CleoError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir_all(dest)?;
        for name in ["tasks.json", "archive.json", "sessions.json", "lifecycle.json", "jobs.json", "config.json"] {
            let src = self.root.join(name);
            if src.exists() {
                fs::copy(&src, dest.join(name))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
