//! The `DataAccessor` contract (spec §4.2): business logic is
//! storage-agnostic above this trait. The whole-aggregate methods
//! (`load_task_file`/`save_task_file`/…) are the contract named in the
//! spec; the granular per-row methods below them are the practical surface
//! `cleo-domain` actually calls against a relational engine without paying
//! for a full-aggregate round-trip on every operation.

use async_trait::async_trait;
use cleo_core::{
    AuditLogRow, BackgroundJob, BackgroundJobId, CleoConfig, CleoError, Evidence, GateResult,
    LifecyclePipeline, LifecycleStageRow, Session, SessionId, Task, TaskDependency, TaskId,
    TaskRelation, TaskUpdate, TaskWorkEntry, Transition,
};

use crate::aggregate::{ArchiveFile, SessionsFile, TaskFile};

/// Filter for `tasks.list` (spec §4.3).
#[derive(Debug, Clone, Default)]
pub struct TaskListFilter {
    pub status: Option<cleo_core::TaskStatus>,
    pub parent_id: Option<TaskId>,
    pub task_type: Option<cleo_core::TaskType>,
    pub phase: Option<String>,
    pub limit: Option<usize>,
}

#[async_trait]
pub trait DataAccessor: Send + Sync {
    // --- whole-aggregate operations (spec §4.2) ---

    async fn load_task_file(&self) -> Result<TaskFile, CleoError>;
    async fn save_task_file(&self, file: &TaskFile) -> Result<(), CleoError>;
    async fn load_archive(&self) -> Result<ArchiveFile, CleoError>;
    async fn save_archive(&self, file: &ArchiveFile) -> Result<(), CleoError>;
    async fn load_sessions(&self) -> Result<SessionsFile, CleoError>;
    async fn save_sessions(&self, file: &SessionsFile) -> Result<(), CleoError>;
    async fn append_log(&self, row: &AuditLogRow) -> Result<(), CleoError>;
    async fn close(&self) -> Result<(), CleoError>;

    // --- tasks ---

    /// Insert a task that already carries its allocated id (the safety
    /// wrapper owns allocation, see `SafeAccessor`).
    async fn insert_task(&self, task: &Task) -> Result<(), CleoError>;
    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, CleoError>;
    async fn update_task(&self, id: TaskId, update: &TaskUpdate) -> Result<Task, CleoError>;
    async fn replace_task(&self, task: &Task) -> Result<(), CleoError>;
    async fn delete_task(&self, id: TaskId) -> Result<(), CleoError>;
    async fn list_tasks(&self, filter: &TaskListFilter) -> Result<Vec<Task>, CleoError>;
    async fn max_task_numeric_id(&self) -> Result<u64, CleoError>;

    // --- dependencies / relations ---

    async fn add_dependency(&self, dep: TaskDependency) -> Result<(), CleoError>;
    async fn list_dependencies(&self, task_id: TaskId) -> Result<Vec<TaskDependency>, CleoError>;
    async fn list_dependents(&self, task_id: TaskId) -> Result<Vec<TaskDependency>, CleoError>;
    async fn add_relation(&self, rel: TaskRelation) -> Result<(), CleoError>;
    async fn list_relations(&self, task_id: TaskId) -> Result<Vec<TaskRelation>, CleoError>;

    // --- sessions ---

    async fn insert_session(&self, session: &Session) -> Result<(), CleoError>;
    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, CleoError>;
    async fn replace_session(&self, session: &Session) -> Result<(), CleoError>;
    async fn list_sessions(&self) -> Result<Vec<Session>, CleoError>;
    async fn current_session_id(&self) -> Result<Option<SessionId>, CleoError>;
    async fn set_current_session_id(&self, id: Option<SessionId>) -> Result<(), CleoError>;

    // --- task-work (focus) history ---

    async fn append_task_work(&self, entry: &TaskWorkEntry) -> Result<(), CleoError>;
    async fn open_task_work(&self, session_id: &SessionId) -> Result<Option<TaskWorkEntry>, CleoError>;
    async fn close_task_work(
        &self,
        session_id: &SessionId,
        task_id: TaskId,
        cleared_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), CleoError>;
    async fn task_work_history(&self, session_id: &SessionId) -> Result<Vec<TaskWorkEntry>, CleoError>;

    // --- lifecycle ---

    async fn get_pipeline(&self, task_id: TaskId) -> Result<Option<LifecyclePipeline>, CleoError>;
    async fn create_pipeline(&self, task_id: TaskId) -> Result<LifecyclePipeline, CleoError>;
    async fn replace_pipeline(&self, pipeline: &LifecyclePipeline) -> Result<(), CleoError>;
    async fn list_stages(&self, pipeline_id: i64) -> Result<Vec<LifecycleStageRow>, CleoError>;
    async fn replace_stage(&self, stage: &LifecycleStageRow) -> Result<(), CleoError>;
    async fn record_gate(&self, gate: &GateResult) -> Result<(), CleoError>;
    async fn list_gates(&self, stage_id: i64) -> Result<Vec<GateResult>, CleoError>;
    async fn add_evidence(&self, evidence: &Evidence) -> Result<(), CleoError>;
    async fn list_evidence(&self, stage_id: i64) -> Result<Vec<Evidence>, CleoError>;
    async fn record_transition(&self, transition: &Transition) -> Result<(), CleoError>;
    async fn list_transitions(&self, pipeline_id: i64) -> Result<Vec<Transition>, CleoError>;

    // --- jobs ---

    async fn insert_job(&self, job: &BackgroundJob) -> Result<(), CleoError>;
    async fn get_job(&self, id: BackgroundJobId) -> Result<Option<BackgroundJob>, CleoError>;
    async fn replace_job(&self, job: &BackgroundJob) -> Result<(), CleoError>;
    async fn list_jobs(&self) -> Result<Vec<BackgroundJob>, CleoError>;
    async fn delete_job(&self, id: BackgroundJobId) -> Result<(), CleoError>;

    // --- config ---

    async fn load_config(&self) -> Result<CleoConfig, CleoError>;
    async fn save_config(&self, config: &CleoConfig) -> Result<(), CleoError>;

    /// Snapshot the backing store to `dest` (spec §4.1's `VACUUM INTO`
    /// rotation). A no-op for engines with nothing meaningful to snapshot
    /// (e.g. an in-memory test double); [`crate::SqliteAccessor`] and
    /// [`crate::JsonAccessor`] override this.
    async fn snapshot(&self, _dest: &std::path::Path) -> Result<(), CleoError> {
        Ok(())
    }
}
