//! SQLite-backed `DataAccessor` (spec §4.1, §4.2).
//!
//! Opened with `foreign_keys=ON`, `busy_timeout=5000`, and a WAL-verify loop
//! that reads `PRAGMA journal_mode` back after setting it, retrying up to
//! 3x with `200ms * attempt` back-off; refuses to proceed if the final mode
//! isn't `wal` (spec §4.1, §5 — "running the core in delete journal mode
//! under concurrency is a silent-data-loss bug").
//!
//! The connection lives behind a `tokio::sync::Mutex` rather than
//! `parking_lot`, because handlers hold it across `.await` points
//! (SPEC_FULL §5).

mod convert;
mod ops_jobs;
mod ops_lifecycle;
mod ops_misc;
mod ops_sessions;
mod ops_tasks;
mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use cleo_core::{
    AuditLogRow, BackgroundJob, BackgroundJobId, CleoConfig, CleoError, Evidence, GateResult,
    LifecyclePipeline, LifecycleStageRow, Session, SessionId, Task, TaskDependency, TaskId,
    TaskRelation, TaskUpdate, TaskWorkEntry, Transition,
};

use crate::accessor::{DataAccessor, TaskListFilter};
use crate::aggregate::{ArchiveFile, SessionsFile, TaskFile};
use crate::rusqlite_err;

const WAL_VERIFY_ATTEMPTS: u32 = 3;

/// `BEGIN IMMEDIATE` ... `COMMIT`/`ROLLBACK` RAII guard around the
/// delete-then-insert pairs `replace_*` uses for row updates, so a crash
/// between the two statements can't leave a row missing (SPEC_FULL §5).
/// Rolls back on drop unless explicitly committed.
struct Transaction<'a> {
    conn: &'a Connection,
    committed: bool,
}

impl<'a> Transaction<'a> {
    fn begin(conn: &'a Connection) -> Result<Self, CleoError> {
        conn.execute_batch("BEGIN IMMEDIATE").map_err(rusqlite_err)?;
        Ok(Self { conn, committed: false })
    }

    fn commit(mut self) -> Result<(), CleoError> {
        self.conn.execute_batch("COMMIT").map_err(rusqlite_err)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

pub struct SqliteAccessor {
    conn: Mutex<Connection>,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl SqliteAccessor {
    /// Open (creating if absent), verify WAL mode, and apply pending
    /// migrations. Fails closed if WAL mode cannot be confirmed.
    pub fn open(db_path: &Path) -> Result<Self, CleoError> {
        let mut conn = Connection::open(db_path).map_err(rusqlite_err)?;
        conn.pragma_update(None, "foreign_keys", true).map_err(rusqlite_err)?;
        conn.busy_timeout(Duration::from_millis(5000)).map_err(rusqlite_err)?;

        let mut verified = false;
        for attempt in 1..=WAL_VERIFY_ATTEMPTS {
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0)).map_err(rusqlite_err)?;
            if mode.eq_ignore_ascii_case("wal") {
                verified = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(200 * attempt as u64));
        }
        if !verified {
            let observed: String =
                conn.pragma_query_value(None, "journal_mode", |row| row.get(0)).map_err(rusqlite_err)?;
            return Err(CleoError::wal_mode_refused(&observed));
        }

        schema::migrate(&mut conn)?;

        Ok(Self { conn: Mutex::new(conn), db_path: db_path.to_path_buf() })
    }

    /// `VACUUM INTO` a snapshot path (used by `SafeAccessor`'s debounced
    /// rotation, spec §4.1).
    pub async fn vacuum_into(&self, dest: &Path) -> Result<(), CleoError> {
        let conn = self.conn.lock().await;
        let dest_str = dest.to_string_lossy().into_owned();
        conn.execute("VACUUM INTO ?1", rusqlite::params![dest_str]).map_err(rusqlite_err)?;
        Ok(())
    }
}

#[async_trait]
impl DataAccessor for SqliteAccessor {
    async fn load_task_file(&self) -> Result<TaskFile, CleoError> {
        let conn = self.conn.lock().await;
        let tasks = ops_tasks::list_tasks(&conn, &TaskListFilter::default())?
            .into_iter()
            .filter(|t| t.status != cleo_core::TaskStatus::Archived)
            .collect::<Vec<_>>();
        let mut dependencies = Vec::new();
        let mut relations = Vec::new();
        let mut task_work = Vec::new();
        for task in &tasks {
            dependencies.extend(ops_tasks::list_dependencies(&conn, task.id)?);
            relations.extend(ops_tasks::list_relations(&conn, task.id)?);
        }
        for session in ops_sessions::list_sessions(&conn)? {
            task_work.extend(ops_sessions::task_work_history(&conn, &session.id)?);
        }
        let next_id = ops_tasks::max_task_numeric_id(&conn)? + 1;
        Ok(TaskFile { tasks, dependencies, relations, task_work, next_id })
    }

    async fn save_task_file(&self, file: &TaskFile) -> Result<(), CleoError> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM task_dependencies", []).map_err(rusqlite_err)?;
        conn.execute("DELETE FROM task_relations", []).map_err(rusqlite_err)?;
        conn.execute("DELETE FROM tasks WHERE status != 'archived'", []).map_err(rusqlite_err)?;
        for task in &file.tasks {
            ops_tasks::insert_task(&conn, task)?;
        }
        for dep in &file.dependencies {
            ops_tasks::add_dependency(&conn, *dep)?;
        }
        for rel in &file.relations {
            ops_tasks::add_relation(&conn, *rel)?;
        }
        Ok(())
    }

    async fn load_archive(&self) -> Result<ArchiveFile, CleoError> {
        let conn = self.conn.lock().await;
        let mut filter = TaskListFilter::default();
        filter.status = Some(cleo_core::TaskStatus::Archived);
        Ok(ArchiveFile { tasks: ops_tasks::list_tasks(&conn, &filter)? })
    }

    async fn save_archive(&self, file: &ArchiveFile) -> Result<(), CleoError> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM tasks WHERE status = 'archived'", []).map_err(rusqlite_err)?;
        for task in &file.tasks {
            ops_tasks::insert_task(&conn, task)?;
        }
        Ok(())
    }

    async fn load_sessions(&self) -> Result<SessionsFile, CleoError> {
        let conn = self.conn.lock().await;
        Ok(SessionsFile {
            sessions: ops_sessions::list_sessions(&conn)?,
            current_session_id: ops_sessions::current_session_id(&conn)?,
        })
    }

    async fn save_sessions(&self, file: &SessionsFile) -> Result<(), CleoError> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM sessions", []).map_err(rusqlite_err)?;
        for session in &file.sessions {
            ops_sessions::insert_session(&conn, session)?;
        }
        ops_sessions::set_current_session_id(&conn, file.current_session_id.clone())?;
        Ok(())
    }

    async fn append_log(&self, row: &AuditLogRow) -> Result<(), CleoError> {
        let conn = self.conn.lock().await;
        ops_misc::append_log(&conn, row)
    }

    async fn close(&self) -> Result<(), CleoError> {
        Ok(())
    }

    async fn insert_task(&self, task: &Task) -> Result<(), CleoError> {
        ops_tasks::insert_task(&*self.conn.lock().await, task)
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, CleoError> {
        ops_tasks::get_task(&*self.conn.lock().await, id)
    }

    async fn update_task(&self, id: TaskId, update: &TaskUpdate) -> Result<Task, CleoError> {
        ops_tasks::update_task(&*self.conn.lock().await, id, update)
    }

    async fn replace_task(&self, task: &Task) -> Result<(), CleoError> {
        let conn = self.conn.lock().await;
        let txn = Transaction::begin(&conn)?;
        ops_tasks::replace_task(&conn, task)?;
        txn.commit()
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), CleoError> {
        ops_tasks::delete_task(&*self.conn.lock().await, id)
    }

    async fn list_tasks(&self, filter: &TaskListFilter) -> Result<Vec<Task>, CleoError> {
        ops_tasks::list_tasks(&*self.conn.lock().await, filter)
    }

    async fn max_task_numeric_id(&self) -> Result<u64, CleoError> {
        ops_tasks::max_task_numeric_id(&*self.conn.lock().await)
    }

    async fn add_dependency(&self, dep: TaskDependency) -> Result<(), CleoError> {
        ops_tasks::add_dependency(&*self.conn.lock().await, dep)
    }

    async fn list_dependencies(&self, task_id: TaskId) -> Result<Vec<TaskDependency>, CleoError> {
        ops_tasks::list_dependencies(&*self.conn.lock().await, task_id)
    }

    async fn list_dependents(&self, task_id: TaskId) -> Result<Vec<TaskDependency>, CleoError> {
        ops_tasks::list_dependents(&*self.conn.lock().await, task_id)
    }

    async fn add_relation(&self, rel: TaskRelation) -> Result<(), CleoError> {
        ops_tasks::add_relation(&*self.conn.lock().await, rel)
    }

    async fn list_relations(&self, task_id: TaskId) -> Result<Vec<TaskRelation>, CleoError> {
        ops_tasks::list_relations(&*self.conn.lock().await, task_id)
    }

    async fn insert_session(&self, session: &Session) -> Result<(), CleoError> {
        ops_sessions::insert_session(&*self.conn.lock().await, session)
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, CleoError> {
        ops_sessions::get_session(&*self.conn.lock().await, id)
    }

    async fn replace_session(&self, session: &Session) -> Result<(), CleoError> {
        let conn = self.conn.lock().await;
        let txn = Transaction::begin(&conn)?;
        ops_sessions::replace_session(&conn, session)?;
        txn.commit()
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, CleoError> {
        ops_sessions::list_sessions(&*self.conn.lock().await)
    }

    async fn current_session_id(&self) -> Result<Option<SessionId>, CleoError> {
        ops_sessions::current_session_id(&*self.conn.lock().await)
    }

    async fn set_current_session_id(&self, id: Option<SessionId>) -> Result<(), CleoError> {
        ops_sessions::set_current_session_id(&*self.conn.lock().await, id)
    }

    async fn append_task_work(&self, entry: &TaskWorkEntry) -> Result<(), CleoError> {
        ops_sessions::append_task_work(&*self.conn.lock().await, entry)
    }

    async fn open_task_work(&self, session_id: &SessionId) -> Result<Option<TaskWorkEntry>, CleoError> {
        ops_sessions::open_task_work(&*self.conn.lock().await, session_id)
    }

    async fn close_task_work(
        &self,
        session_id: &SessionId,
        task_id: TaskId,
        cleared_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), CleoError> {
        ops_sessions::close_task_work(&*self.conn.lock().await, session_id, task_id, cleared_at)
    }

    async fn task_work_history(&self, session_id: &SessionId) -> Result<Vec<TaskWorkEntry>, CleoError> {
        ops_sessions::task_work_history(&*self.conn.lock().await, session_id)
    }

    async fn get_pipeline(&self, task_id: TaskId) -> Result<Option<LifecyclePipeline>, CleoError> {
        ops_lifecycle::get_pipeline(&*self.conn.lock().await, task_id)
    }

    async fn create_pipeline(&self, task_id: TaskId) -> Result<LifecyclePipeline, CleoError> {
        ops_lifecycle::create_pipeline(&*self.conn.lock().await, task_id)
    }

    async fn replace_pipeline(&self, pipeline: &LifecyclePipeline) -> Result<(), CleoError> {
        let conn = self.conn.lock().await;
        let txn = Transaction::begin(&conn)?;
        ops_lifecycle::replace_pipeline(&conn, pipeline)?;
        txn.commit()
    }

    async fn list_stages(&self, pipeline_id: i64) -> Result<Vec<LifecycleStageRow>, CleoError> {
        ops_lifecycle::list_stages(&*self.conn.lock().await, pipeline_id)
    }

    async fn replace_stage(&self, stage: &LifecycleStageRow) -> Result<(), CleoError> {
        let conn = self.conn.lock().await;
        let txn = Transaction::begin(&conn)?;
        ops_lifecycle::replace_stage(&conn, stage)?;
        txn.commit()
    }

    async fn record_gate(&self, gate: &GateResult) -> Result<(), CleoError> {
        ops_lifecycle::record_gate(&*self.conn.lock().await, gate)
    }

    async fn list_gates(&self, stage_id: i64) -> Result<Vec<GateResult>, CleoError> {
        ops_lifecycle::list_gates(&*self.conn.lock().await, stage_id)
    }

    async fn add_evidence(&self, evidence: &Evidence) -> Result<(), CleoError> {
        ops_lifecycle::add_evidence(&*self.conn.lock().await, evidence)
    }

    async fn list_evidence(&self, stage_id: i64) -> Result<Vec<Evidence>, CleoError> {
        ops_lifecycle::list_evidence(&*self.conn.lock().await, stage_id)
    }

    async fn record_transition(&self, transition: &Transition) -> Result<(), CleoError> {
        ops_lifecycle::record_transition(&*self.conn.lock().await, transition)
    }

    async fn list_transitions(&self, pipeline_id: i64) -> Result<Vec<Transition>, CleoError> {
        ops_lifecycle::list_transitions(&*self.conn.lock().await, pipeline_id)
    }

    async fn insert_job(&self, job: &BackgroundJob) -> Result<(), CleoError> {
        ops_jobs::insert_job(&*self.conn.lock().await, job)
    }

    async fn get_job(&self, id: BackgroundJobId) -> Result<Option<BackgroundJob>, CleoError> {
        ops_jobs::get_job(&*self.conn.lock().await, id)
    }

    async fn replace_job(&self, job: &BackgroundJob) -> Result<(), CleoError> {
        let conn = self.conn.lock().await;
        let txn = Transaction::begin(&conn)?;
        ops_jobs::replace_job(&conn, job)?;
        txn.commit()
    }

    async fn list_jobs(&self) -> Result<Vec<BackgroundJob>, CleoError> {
        ops_jobs::list_jobs(&*self.conn.lock().await)
    }

    async fn delete_job(&self, id: BackgroundJobId) -> Result<(), CleoError> {
        ops_jobs::delete_job(&*self.conn.lock().await, id)
    }

    async fn load_config(&self) -> Result<CleoConfig, CleoError> {
        ops_misc::load_config(&*self.conn.lock().await)
    }

    async fn save_config(&self, config: &CleoConfig) -> Result<(), CleoError> {
        ops_misc::save_config(&*self.conn.lock().await, config)
    }

    async fn snapshot(&self, dest: &Path) -> Result<(), CleoError> {
        self.vacuum_into(dest).await
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
