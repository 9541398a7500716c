//! `DualAccessor` (spec §4.2): best-effort write to both SQLite and JSON
//! engines, reads SQLite-authoritative with JSON fallback on read error
//! (spec §9 Open Question — "reads as SQLite-authoritative with JSON
//! fallback", reviewed and retained as-is; see DESIGN.md OQ-1).
//!
//! Writes go to SQLite first (the authoritative engine); a JSON-side write
//! failure is logged and swallowed rather than surfaced, since the SQLite
//! write already succeeded and the caller's mutation is durable. A SQLite
//! write failure is surfaced as usual — the JSON mirror is never written
//! to paper over a failed authoritative write.

use std::path::Path;

use async_trait::async_trait;
use tracing::warn;

use cleo_core::{
    AuditLogRow, BackgroundJob, BackgroundJobId, CleoConfig, CleoError, Evidence, GateResult,
    LifecyclePipeline, LifecycleStageRow, Session, SessionId, Task, TaskDependency, TaskId,
    TaskRelation, TaskUpdate, TaskWorkEntry, Transition,
};

use crate::accessor::{DataAccessor, TaskListFilter};
use crate::aggregate::{ArchiveFile, SessionsFile, TaskFile};
use crate::json::JsonAccessor;
use crate::sqlite::SqliteAccessor;

pub struct DualAccessor {
    sqlite: SqliteAccessor,
    json: JsonAccessor,
}

impl DualAccessor {
    pub fn open(db_path: &Path, json_root: &Path) -> Result<Self, CleoError> {
        Ok(Self { sqlite: SqliteAccessor::open(db_path)?, json: JsonAccessor::open(json_root)? })
    }
}

/// Run `$json_call` for its side effect only, logging (not propagating)
/// a failure — the mirror write is best-effort by spec.
macro_rules! mirror {
    ($self:ident, $json_call:expr) => {
        if let Err(e) = $json_call {
            warn!(error = %e, "dual accessor: json mirror write failed");
        }
    };
}

#[async_trait]
impl DataAccessor for DualAccessor {
    async fn load_task_file(&self) -> Result<TaskFile, CleoError> {
        match self.sqlite.load_task_file().await {
            Ok(file) => Ok(file),
            Err(e) => {
                warn!(error = %e, "dual accessor: sqlite read failed, falling back to json");
                self.json.load_task_file().await
            }
        }
    }

    async fn save_task_file(&self, file: &TaskFile) -> Result<(), CleoError> {
        self.sqlite.save_task_file(file).await?;
        mirror!(self, self.json.save_task_file(file).await);
        Ok(())
    }

    async fn load_archive(&self) -> Result<ArchiveFile, CleoError> {
        match self.sqlite.load_archive().await {
            Ok(file) => Ok(file),
            Err(_) => self.json.load_archive().await,
        }
    }

    async fn save_archive(&self, file: &ArchiveFile) -> Result<(), CleoError> {
        self.sqlite.save_archive(file).await?;
        mirror!(self, self.json.save_archive(file).await);
        Ok(())
    }

    async fn load_sessions(&self) -> Result<SessionsFile, CleoError> {
        match self.sqlite.load_sessions().await {
            Ok(file) => Ok(file),
            Err(_) => self.json.load_sessions().await,
        }
    }

    async fn save_sessions(&self, file: &SessionsFile) -> Result<(), CleoError> {
        self.sqlite.save_sessions(file).await?;
        mirror!(self, self.json.save_sessions(file).await);
        Ok(())
    }

    async fn append_log(&self, row: &AuditLogRow) -> Result<(), CleoError> {
        self.sqlite.append_log(row).await?;
        mirror!(self, self.json.append_log(row).await);
        Ok(())
    }

    async fn close(&self) -> Result<(), CleoError> {
        self.sqlite.close().await?;
        self.json.close().await
    }

    async fn insert_task(&self, task: &Task) -> Result<(), CleoError> {
        self.sqlite.insert_task(task).await?;
        mirror!(self, self.json.insert_task(task).await);
        Ok(())
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, CleoError> {
        match self.sqlite.get_task(id).await {
            Ok(task) => Ok(task),
            Err(_) => self.json.get_task(id).await,
        }
    }

    async fn update_task(&self, id: TaskId, update: &TaskUpdate) -> Result<Task, CleoError> {
        let result = self.sqlite.update_task(id, update).await?;
        mirror!(self, self.json.update_task(id, update).await);
        Ok(result)
    }

    async fn replace_task(&self, task: &Task) -> Result<(), CleoError> {
        self.sqlite.replace_task(task).await?;
        mirror!(self, self.json.replace_task(task).await);
        Ok(())
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), CleoError> {
        self.sqlite.delete_task(id).await?;
        mirror!(self, self.json.delete_task(id).await);
        Ok(())
    }

    async fn list_tasks(&self, filter: &TaskListFilter) -> Result<Vec<Task>, CleoError> {
        match self.sqlite.list_tasks(filter).await {
            Ok(tasks) => Ok(tasks),
            Err(_) => self.json.list_tasks(filter).await,
        }
    }

    async fn max_task_numeric_id(&self) -> Result<u64, CleoError> {
        self.sqlite.max_task_numeric_id().await
    }

    async fn add_dependency(&self, dep: TaskDependency) -> Result<(), CleoError> {
        self.sqlite.add_dependency(dep).await?;
        mirror!(self, self.json.add_dependency(dep).await);
        Ok(())
    }

    async fn list_dependencies(&self, task_id: TaskId) -> Result<Vec<TaskDependency>, CleoError> {
        self.sqlite.list_dependencies(task_id).await
    }

    async fn list_dependents(&self, task_id: TaskId) -> Result<Vec<TaskDependency>, CleoError> {
        self.sqlite.list_dependents(task_id).await
    }

    async fn add_relation(&self, rel: TaskRelation) -> Result<(), CleoError> {
        self.sqlite.add_relation(rel).await?;
        mirror!(self, self.json.add_relation(rel).await);
        Ok(())
    }

    async fn list_relations(&self, task_id: TaskId) -> Result<Vec<TaskRelation>, CleoError> {
        self.sqlite.list_relations(task_id).await
    }

    async fn insert_session(&self, session: &Session) -> Result<(), CleoError> {
        self.sqlite.insert_session(session).await?;
        mirror!(self, self.json.insert_session(session).await);
        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, CleoError> {
        match self.sqlite.get_session(id).await {
            Ok(s) => Ok(s),
            Err(_) => self.json.get_session(id).await,
        }
    }

    async fn replace_session(&self, session: &Session) -> Result<(), CleoError> {
        self.sqlite.replace_session(session).await?;
        mirror!(self, self.json.replace_session(session).await);
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, CleoError> {
        self.sqlite.list_sessions().await
    }

    async fn current_session_id(&self) -> Result<Option<SessionId>, CleoError> {
        self.sqlite.current_session_id().await
    }

    async fn set_current_session_id(&self, id: Option<SessionId>) -> Result<(), CleoError> {
        self.sqlite.set_current_session_id(id.clone()).await?;
        mirror!(self, self.json.set_current_session_id(id).await);
        Ok(())
    }

    async fn append_task_work(&self, entry: &TaskWorkEntry) -> Result<(), CleoError> {
        self.sqlite.append_task_work(entry).await?;
        mirror!(self, self.json.append_task_work(entry).await);
        Ok(())
    }

    async fn open_task_work(&self, session_id: &SessionId) -> Result<Option<TaskWorkEntry>, CleoError> {
        self.sqlite.open_task_work(session_id).await
    }

    async fn close_task_work(
        &self,
        session_id: &SessionId,
        task_id: TaskId,
        cleared_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), CleoError> {
        self.sqlite.close_task_work(session_id, task_id, cleared_at).await?;
        mirror!(self, self.json.close_task_work(session_id, task_id, cleared_at).await);
        Ok(())
    }

    async fn task_work_history(&self, session_id: &SessionId) -> Result<Vec<TaskWorkEntry>, CleoError> {
        self.sqlite.task_work_history(session_id).await
    }

    async fn get_pipeline(&self, task_id: TaskId) -> Result<Option<LifecyclePipeline>, CleoError> {
        self.sqlite.get_pipeline(task_id).await
    }

    async fn create_pipeline(&self, task_id: TaskId) -> Result<LifecyclePipeline, CleoError> {
        let pipeline = self.sqlite.create_pipeline(task_id).await?;
        mirror!(self, self.json.create_pipeline(task_id).await);
        Ok(pipeline)
    }

    async fn replace_pipeline(&self, pipeline: &LifecyclePipeline) -> Result<(), CleoError> {
        self.sqlite.replace_pipeline(pipeline).await?;
        mirror!(self, self.json.replace_pipeline(pipeline).await);
        Ok(())
    }

    async fn list_stages(&self, pipeline_id: i64) -> Result<Vec<LifecycleStageRow>, CleoError> {
        self.sqlite.list_stages(pipeline_id).await
    }

    async fn replace_stage(&self, stage: &LifecycleStageRow) -> Result<(), CleoError> {
        self.sqlite.replace_stage(stage).await?;
        mirror!(self, self.json.replace_stage(stage).await);
        Ok(())
    }

    async fn record_gate(&self, gate: &GateResult) -> Result<(), CleoError> {
        self.sqlite.record_gate(gate).await?;
        mirror!(self, self.json.record_gate(gate).await);
        Ok(())
    }

    async fn list_gates(&self, stage_id: i64) -> Result<Vec<GateResult>, CleoError> {
        self.sqlite.list_gates(stage_id).await
    }

    async fn add_evidence(&self, evidence: &Evidence) -> Result<(), CleoError> {
        self.sqlite.add_evidence(evidence).await?;
        mirror!(self, self.json.add_evidence(evidence).await);
        Ok(())
    }

    async fn list_evidence(&self, stage_id: i64) -> Result<Vec<Evidence>, CleoError> {
        self.sqlite.list_evidence(stage_id).await
    }

    async fn record_transition(&self, transition: &Transition) -> Result<(), CleoError> {
        self.sqlite.record_transition(transition).await?;
        mirror!(self, self.json.record_transition(transition).await);
        Ok(())
    }

    async fn list_transitions(&self, pipeline_id: i64) -> Result<Vec<Transition>, CleoError> {
        self.sqlite.list_transitions(pipeline_id).await
    }

    async fn insert_job(&self, job: &BackgroundJob) -> Result<(), CleoError> {
        self.sqlite.insert_job(job).await?;
        mirror!(self, self.json.insert_job(job).await);
        Ok(())
    }

    async fn get_job(&self, id: BackgroundJobId) -> Result<Option<BackgroundJob>, CleoError> {
        self.sqlite.get_job(id).await
    }

    async fn replace_job(&self, job: &BackgroundJob) -> Result<(), CleoError> {
        self.sqlite.replace_job(job).await?;
        mirror!(self, self.json.replace_job(job).await);
        Ok(())
    }

    async fn list_jobs(&self) -> Result<Vec<BackgroundJob>, CleoError> {
        self.sqlite.list_jobs().await
    }

    async fn delete_job(&self, id: BackgroundJobId) -> Result<(), CleoError> {
        self.sqlite.delete_job(id).await?;
        mirror!(self, self.json.delete_job(id).await);
        Ok(())
    }

    async fn load_config(&self) -> Result<CleoConfig, CleoError> {
        self.sqlite.load_config().await
    }

    async fn save_config(&self, config: &CleoConfig) -> Result<(), CleoError> {
        self.sqlite.save_config(config).await?;
        mirror!(self, self.json.save_config(config).await);
        Ok(())
    }

    async fn snapshot(&self, dest: &Path) -> Result<(), CleoError> {
        self.sqlite.snapshot(dest).await
    }
}

#[cfg(test)]
#[path = "dual_tests.rs"]
mod tests;
