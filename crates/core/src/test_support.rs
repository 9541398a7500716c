//! Test builders for the aggregate types, enabled under `cfg(test)` or the
//! `test-support` feature so downstream crates' tests can build fixtures
//! without hand-rolling every field (teacher precedent: `builder!`).

use chrono::Utc;

use crate::id::TaskId;
use crate::session::{Session, SessionScope, SessionStats, SessionStatus};
use crate::task::{Priority, Provenance, Task, TaskSize, TaskStatus, TaskType, VerificationMeta};

crate::builder! {
    pub struct TaskBuilder => Task {
        set { id: TaskId = TaskId::from_numeric(1) }
        into { title: String = "Untitled" }
        into { description: String = "" }
        set { status: TaskStatus = TaskStatus::Pending }
        set { priority: Priority = Priority::Medium }
        set { task_type: TaskType = TaskType::Task }
        option { parent_id: TaskId = None }
        option { phase: String = None }
        option { size: TaskSize = None }
        set { position: i64 = 0 }
        set { position_version: i64 = 1 }
        computed { created_at: chrono::DateTime<Utc> = Utc::now() }
        computed { updated_at: chrono::DateTime<Utc> = Utc::now() }
        option { completed_at: chrono::DateTime<Utc> = None }
        option { cancelled_at: chrono::DateTime<Utc> = None }
        option { archived_at: chrono::DateTime<Utc> = None }
        option { archive_reason: String = None }
        option { cycle_time_days: f64 = None }
        computed { provenance: Provenance = Provenance {
            created_by: "test".to_string(),
            modified_by: "test".to_string(),
            session_id: None,
        } }
        computed { labels: Vec<String> = Vec::new() }
        computed { notes: Vec<String> = Vec::new() }
        computed { acceptance_criteria: Vec<String> = Vec::new() }
        computed { files: Vec<String> = Vec::new() }
        computed { verification: VerificationMeta = VerificationMeta::default() }
    }
}

crate::builder! {
    pub struct SessionBuilder => Session {
        computed { id: crate::id::SessionId = crate::id::SessionId::generate(Utc::now()) }
        option { name: String = None }
        set { status: SessionStatus = SessionStatus::Active }
        set { scope: SessionScope = SessionScope::Global }
        option { current_task: TaskId = None }
        option { task_started_at: chrono::DateTime<Utc> = None }
        option { agent: String = None }
        computed { notes: Vec<String> = Vec::new() }
        computed { tasks_completed: Vec<TaskId> = Vec::new() }
        computed { tasks_created: Vec<TaskId> = Vec::new() }
        option { previous_session_id: crate::id::SessionId = None }
        option { next_session_id: crate::id::SessionId = None }
        option { handoff: String = None }
        option { debrief: String = None }
        computed { stats: SessionStats = SessionStats::default() }
        set { graded: bool = false }
        computed { started_at: chrono::DateTime<Utc> = Utc::now() }
        option { ended_at: chrono::DateTime<Utc> = None }
    }
}
