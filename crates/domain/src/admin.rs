//! `admin`/`system` domain (spec §4.3): dashboard aggregates, health,
//! config get/set, safe-stop.

use std::collections::BTreeMap;

use cleo_core::{CleoConfig, CleoError, Session, SessionId, SessionStatus, TaskStatus};
use cleo_storage::{DataAccessor, SafeAccessor, TaskListFilter};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_tasks: u32,
    pub by_status: BTreeMap<String, u32>,
    pub active_sessions: u32,
    pub open_focus_sessions: u32,
}

/// `admin.dashboard`: cross-cutting counts over tasks and sessions.
pub async fn dashboard(accessor: &SafeAccessor) -> Result<Dashboard, CleoError> {
    let tasks = accessor.list_tasks(&TaskListFilter::default()).await?;
    let sessions = accessor.list_sessions().await?;
    let mut by_status: BTreeMap<String, u32> = BTreeMap::new();
    for task in &tasks {
        *by_status.entry(task.status.to_string()).or_insert(0) += 1;
    }
    let active_sessions = sessions.iter().filter(|s| s.status == SessionStatus::Active).count() as u32;
    let open_focus_sessions = sessions.iter().filter(|s| s.current_task.is_some()).count() as u32;
    Ok(Dashboard { total_tasks: tasks.len() as u32, by_status, active_sessions, open_focus_sessions })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub storage_ok: bool,
    pub task_count: u32,
    pub current_session: Option<SessionId>,
}

/// `admin.health`: a cheap liveness probe — can the accessor answer at
/// all, and is there a dangling `.current-session` pointer to an unknown
/// session.
pub async fn health(accessor: &SafeAccessor) -> Result<Health, CleoError> {
    let task_count = accessor.list_tasks(&TaskListFilter::default()).await?.len() as u32;
    let current_session = accessor.current_session_id().await?;
    if let Some(id) = &current_session {
        if accessor.get_session(id).await?.is_none() {
            return Err(CleoError::new(
                "E_INTEGRITY_SEQUENCE",
                cleo_core::ErrorKind::Integrity,
                format!(".current-session points at missing session {id}"),
            ));
        }
    }
    Ok(Health { storage_ok: true, task_count, current_session })
}

pub async fn config_get(accessor: &SafeAccessor) -> Result<CleoConfig, CleoError> {
    accessor.load_config().await
}

pub async fn config_set(accessor: &SafeAccessor, config: CleoConfig) -> Result<(), CleoError> {
    accessor.save_config(&config).await
}

/// `admin.safestop`: gracefully end the active session (with a handoff
/// note if provided) before an external shutdown request (spec §4.3).
/// A no-op, not an error, when no session is active.
pub async fn safe_stop(accessor: &SafeAccessor, handoff: Option<String>) -> Result<Option<Session>, CleoError> {
    let Some(id) = accessor.current_session_id().await? else {
        return Ok(None);
    };
    let Some(mut session) = accessor.get_session(&id).await? else {
        accessor.set_current_session_id(None).await?;
        return Ok(None);
    };
    session.handoff = handoff;
    session.status = SessionStatus::Ended;
    session.ended_at = Some(chrono::Utc::now());
    accessor.replace_session(&session).await?;
    accessor.set_current_session_id(None).await?;
    Ok(Some(session))
}

/// Counts feeding `admin.dashboard`'s pending/blocked split, exposed
/// separately so callers can render just the funnel (SPEC_FULL §10).
pub async fn status_funnel(accessor: &SafeAccessor) -> Result<BTreeMap<String, u32>, CleoError> {
    let tasks = accessor.list_tasks(&TaskListFilter::default()).await?;
    let mut funnel: BTreeMap<String, u32> = BTreeMap::new();
    for status in [
        TaskStatus::Pending,
        TaskStatus::Active,
        TaskStatus::Blocked,
        TaskStatus::Done,
        TaskStatus::Cancelled,
        TaskStatus::Archived,
    ] {
        funnel.insert(status.to_string(), tasks.iter().filter(|t| t.status == status).count() as u32);
    }
    Ok(funnel)
}

#[cfg(test)]
#[path = "admin_tests.rs"]
mod tests;
