//! `session` domain (spec §4.3): `start`, `end`, `close`, `status`, `info`,
//! `list`, `show`, `suspend`, `resume`, `switch`, `grade`.

use chrono::Utc;
use cleo_core::{
    CleoConfig, CleoError, ErrorKind, Session, SessionId, SessionScope, SessionStats,
    SessionStatus, TaskStatus,
};
use cleo_storage::{DataAccessor, SafeAccessor, TaskListFilter};

/// `session.start` (spec §4.3: "refuses a second active session unless
/// multi-session mode is enabled"; `--auto-focus` picks the
/// highest-priority pending task in scope).
pub async fn start(
    accessor: &SafeAccessor,
    scope: SessionScope,
    name: Option<String>,
    agent: Option<String>,
    auto_focus: bool,
) -> Result<Session, CleoError> {
    let config = accessor.load_config().await?;
    if let Some(current_id) = accessor.current_session_id().await? {
        if let Some(current) = accessor.get_session(&current_id).await? {
            if current.status == SessionStatus::Active && !config.multi_session.enabled {
                return Err(CleoError::new(
                    "E_ALREADY_EXISTS",
                    ErrorKind::Conflict,
                    format!("session {current_id} is already active; enable multiSession to start another"),
                ));
            }
        }
    }
    if config.multi_session.enabled {
        if let Some(cap) = config.multi_session.max_concurrent_sessions {
            let active = accessor
                .list_sessions()
                .await?
                .into_iter()
                .filter(|s| s.status == SessionStatus::Active)
                .count();
            if active as u32 >= cap {
                return Err(CleoError::new(
                    "E_CONFIG",
                    ErrorKind::Conflict,
                    format!("multiSession.maxConcurrentSessions={cap} reached"),
                ));
            }
        }
    }

    let now = Utc::now();
    let id = SessionId::generate(now);
    let current_task = if auto_focus {
        highest_priority_pending_in_scope(accessor, &scope).await?
    } else {
        None
    };
    let session = Session {
        id: id.clone(),
        name,
        status: SessionStatus::Active,
        scope,
        current_task,
        task_started_at: current_task.map(|_| now),
        agent,
        notes: Vec::new(),
        tasks_completed: Vec::new(),
        tasks_created: Vec::new(),
        previous_session_id: None,
        next_session_id: None,
        handoff: None,
        debrief: None,
        stats: SessionStats::default(),
        graded: false,
        started_at: now,
        ended_at: None,
    };
    accessor.insert_session(&session).await?;
    accessor.set_current_session_id(Some(id)).await?;
    if let Some(task_id) = current_task {
        let entry = cleo_core::TaskWorkEntry {
            session_id: session.id.clone(),
            task_id,
            set_at: now,
            cleared_at: None,
        };
        accessor.append_task_work(&entry).await?;
    }
    Ok(session)
}

async fn highest_priority_pending_in_scope(
    accessor: &SafeAccessor,
    scope: &SessionScope,
) -> Result<Option<cleo_core::TaskId>, CleoError> {
    let candidates = tasks_in_scope(accessor, scope).await?;
    Ok(candidates
        .into_iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .min_by_key(|t| (priority_rank(t.priority), t.id))
        .map(|t| t.id))
}

fn priority_rank(priority: cleo_core::Priority) -> u8 {
    match priority {
        cleo_core::Priority::Critical => 0,
        cleo_core::Priority::High => 1,
        cleo_core::Priority::Medium => 2,
        cleo_core::Priority::Low => 3,
    }
}

/// Resolve the concrete set of tasks a [`SessionScope`] covers (spec §4.3:
/// session close/auto-focus both need "all tasks in scope").
async fn tasks_in_scope(accessor: &SafeAccessor, scope: &SessionScope) -> Result<Vec<cleo_core::Task>, CleoError> {
    let all = accessor.list_tasks(&TaskListFilter::default()).await?;
    Ok(match scope {
        SessionScope::Global => all,
        SessionScope::Task { id } => all.into_iter().filter(|t| t.id == *id).collect(),
        SessionScope::Subtree { root } => {
            let mut ids = std::collections::HashSet::new();
            ids.insert(*root);
            loop {
                let before = ids.len();
                for t in &all {
                    if let Some(parent) = t.parent_id {
                        if ids.contains(&parent) {
                            ids.insert(t.id);
                        }
                    }
                }
                if ids.len() == before {
                    break;
                }
            }
            all.into_iter().filter(|t| ids.contains(&t.id)).collect()
        }
        SessionScope::Epic { id } => all
            .into_iter()
            .filter(|t| t.id == *id || t.parent_id == Some(*id))
            .collect(),
        SessionScope::EpicPhase { epic, phase } => all
            .into_iter()
            .filter(|t| (t.id == *epic || t.parent_id == Some(*epic)) && t.phase.as_deref() == Some(phase.as_str()))
            .collect(),
        SessionScope::TaskGroup { id } => all.into_iter().filter(|t| t.phase.as_deref() == Some(id.as_str())).collect(),
        SessionScope::Custom { task_ids, .. } => all.into_iter().filter(|t| task_ids.contains(&t.id)).collect(),
    })
}

fn is_scope_complete(tasks: &[cleo_core::Task]) -> bool {
    tasks
        .iter()
        .all(|t| matches!(t.status, TaskStatus::Done | TaskStatus::Cancelled | TaskStatus::Archived))
}

async fn require_session(accessor: &SafeAccessor, id: &SessionId) -> Result<Session, CleoError> {
    accessor
        .get_session(id)
        .await?
        .ok_or_else(|| CleoError::not_found("session", id.as_str()))
}

/// `session.end` (spec §6: "requires --note if `session.requireSessionNote`
/// is set"). Does not require scope completion (that's `close`).
pub async fn end(accessor: &SafeAccessor, id: SessionId, note: Option<String>, config: &CleoConfig) -> Result<Session, CleoError> {
    if config.session.require_session_note && note.is_none() {
        return Err(CleoError::validation("session.requireSessionNote is set; --note is required to end a session"));
    }
    let mut session = require_session(accessor, &id).await?;
    if let Some(note) = note {
        session.notes.push(note);
    }
    session.status = SessionStatus::Ended;
    session.ended_at = Some(Utc::now());
    accessor.replace_session(&session).await?;
    if accessor.current_session_id().await? == Some(id) {
        accessor.set_current_session_id(None).await?;
    }
    Ok(session)
}

/// `session.close` (spec §4.3: "permanent; requires scope complete").
pub async fn close(accessor: &SafeAccessor, id: SessionId) -> Result<Session, CleoError> {
    let mut session = require_session(accessor, &id).await?;
    let scoped = tasks_in_scope(accessor, &session.scope).await?;
    if !is_scope_complete(&scoped) {
        let incomplete = scoped
            .iter()
            .filter(|t| !matches!(t.status, TaskStatus::Done | TaskStatus::Cancelled | TaskStatus::Archived))
            .count();
        return Err(CleoError::session_close_blocked(incomplete));
    }
    session.status = SessionStatus::Ended;
    session.ended_at = Some(Utc::now());
    accessor.replace_session(&session).await?;
    if accessor.current_session_id().await? == Some(id) {
        accessor.set_current_session_id(None).await?;
    }
    Ok(session)
}

pub async fn status(accessor: &SafeAccessor) -> Result<Option<Session>, CleoError> {
    match accessor.current_session_id().await? {
        Some(id) => accessor.get_session(&id).await,
        None => Ok(None),
    }
}

pub async fn info(accessor: &SafeAccessor, id: SessionId) -> Result<Session, CleoError> {
    require_session(accessor, &id).await
}

pub async fn list(accessor: &SafeAccessor) -> Result<Vec<Session>, CleoError> {
    accessor.list_sessions().await
}

pub async fn show(accessor: &SafeAccessor, id: SessionId) -> Result<Session, CleoError> {
    require_session(accessor, &id).await
}

pub async fn suspend(accessor: &SafeAccessor, id: SessionId) -> Result<Session, CleoError> {
    let mut session = require_session(accessor, &id).await?;
    session.status = SessionStatus::Suspended;
    accessor.replace_session(&session).await?;
    Ok(session)
}

/// `session.resume` (spec §4.3: "latest suspended via `--last`").
pub async fn resume(accessor: &SafeAccessor, id: Option<SessionId>) -> Result<Session, CleoError> {
    let mut session = match id {
        Some(id) => require_session(accessor, &id).await?,
        None => accessor
            .list_sessions()
            .await?
            .into_iter()
            .filter(|s| s.status == SessionStatus::Suspended)
            .max_by_key(|s| s.started_at)
            .ok_or_else(|| CleoError::not_found("session", "<no suspended session>"))?,
    };
    session.status = SessionStatus::Active;
    session.stats.resume_count += 1;
    accessor.replace_session(&session).await?;
    accessor.set_current_session_id(Some(session.id.clone())).await?;
    Ok(session)
}

/// `session.switch` (spec §4.3: "writes `.current-session` sentinel").
pub async fn switch(accessor: &SafeAccessor, id: SessionId) -> Result<Session, CleoError> {
    let session = require_session(accessor, &id).await?;
    accessor.set_current_session_id(Some(id)).await?;
    Ok(session)
}

/// `session.grade` (spec §3: "grade flag"; CLI surface `grade`). Marks an
/// ended session as reviewed; re-grading an already-graded session is a
/// no-op success, matching the idempotency contract `tasks.complete`
/// establishes for other terminal-state mutations (spec §4.8).
pub async fn grade(accessor: &SafeAccessor, id: SessionId) -> Result<Session, CleoError> {
    let mut session = require_session(accessor, &id).await?;
    if session.graded {
        return Ok(session);
    }
    session.graded = true;
    accessor.replace_session(&session).await?;
    Ok(session)
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
