//! `task-work` (a.k.a. focus) domain (spec §4.3): `start/stop/current/history`.
//! The accessor guarantees at most one open (`clearedAt IS NULL`) row per
//! session; these functions only ever closes the previous open row before
//! opening a new one.

use chrono::Utc;
use cleo_core::{CleoError, SessionId, Task, TaskId, TaskWorkEntry};
use cleo_storage::{DataAccessor, SafeAccessor};

/// `task-work.start`: closes any currently open focus for the session,
/// then opens a new one on `task_id`.
pub async fn start(accessor: &SafeAccessor, session_id: &SessionId, task_id: TaskId) -> Result<TaskWorkEntry, CleoError> {
    accessor
        .get_task(task_id)
        .await?
        .ok_or_else(|| CleoError::not_found("task", &task_id.to_string()))?;

    let now = Utc::now();
    if let Some(open) = accessor.open_task_work(session_id).await? {
        accessor.close_task_work(session_id, open.task_id, now).await?;
    }
    let entry = TaskWorkEntry { session_id: session_id.clone(), task_id, set_at: now, cleared_at: None };
    accessor.append_task_work(&entry).await?;

    if let Some(mut session) = accessor.get_session(session_id).await? {
        session.current_task = Some(task_id);
        session.task_started_at = Some(now);
        accessor.replace_session(&session).await?;
    }
    Ok(entry)
}

/// `task-work.stop`: closes the open focus row, if any.
pub async fn stop(accessor: &SafeAccessor, session_id: &SessionId) -> Result<(), CleoError> {
    let Some(open) = accessor.open_task_work(session_id).await? else {
        return Ok(());
    };
    accessor.close_task_work(session_id, open.task_id, Utc::now()).await?;
    if let Some(mut session) = accessor.get_session(session_id).await? {
        session.current_task = None;
        session.task_started_at = None;
        accessor.replace_session(&session).await?;
    }
    Ok(())
}

/// `task-work.current`: the focused task, or `E_FOCUS_REQUIRED` if none
/// (spec §6 exit code 38).
pub async fn current(accessor: &SafeAccessor, session_id: &SessionId) -> Result<Task, CleoError> {
    let open = accessor.open_task_work(session_id).await?.ok_or_else(CleoError::focus_required)?;
    accessor
        .get_task(open.task_id)
        .await?
        .ok_or_else(|| CleoError::not_found("task", &open.task_id.to_string()))
}

/// `task-work.history`: the full append-only log for a session.
pub async fn history(accessor: &SafeAccessor, session_id: &SessionId) -> Result<Vec<TaskWorkEntry>, CleoError> {
    accessor.task_work_history(session_id).await
}

#[cfg(test)]
#[path = "task_work_tests.rs"]
mod tests;
