//! Session / task-work row operations (spec §3, §4.3).

use rusqlite::{params, Connection};

use cleo_core::{CleoError, Session, SessionId, TaskId, TaskWorkEntry};

use super::convert::session_from_row;
use crate::rusqlite_err;

pub(crate) fn insert_session(conn: &Connection, session: &Session) -> Result<(), CleoError> {
    conn.execute(
        "INSERT INTO sessions (id, name, status, scope_json, current_task, task_started_at, agent,
            notes, tasks_completed, tasks_created, previous_session_id, next_session_id, handoff,
            debrief, stats_json, graded, started_at, ended_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)",
        params![
            session.id.as_str(),
            session.name,
            session.status.to_string(),
            serde_json::to_string(&session.scope).unwrap_or_default(),
            session.current_task.map(|t| t.numeric() as i64),
            session.task_started_at.map(|d| d.to_rfc3339()),
            session.agent,
            serde_json::to_string(&session.notes).unwrap_or_default(),
            serde_json::to_string(&session.tasks_completed).unwrap_or_default(),
            serde_json::to_string(&session.tasks_created).unwrap_or_default(),
            session.previous_session_id.as_ref().map(|s| s.as_str().to_string()),
            session.next_session_id.as_ref().map(|s| s.as_str().to_string()),
            session.handoff,
            session.debrief,
            serde_json::to_string(&session.stats).unwrap_or_default(),
            session.graded as i64,
            session.started_at.to_rfc3339(),
            session.ended_at.map(|d| d.to_rfc3339()),
        ],
    )
    .map_err(rusqlite_err)?;
    Ok(())
}

pub(crate) fn get_session(conn: &Connection, id: &SessionId) -> Result<Option<Session>, CleoError> {
    conn.query_row("SELECT * FROM sessions WHERE id = ?1", params![id.as_str()], session_from_row)
        .map(Some)
        .or_else(|e| if matches!(e, rusqlite::Error::QueryReturnedNoRows) { Ok(None) } else { Err(e) })
        .map_err(rusqlite_err)
}

pub(crate) fn replace_session(conn: &Connection, session: &Session) -> Result<(), CleoError> {
    conn.execute("DELETE FROM sessions WHERE id = ?1", params![session.id.as_str()]).map_err(rusqlite_err)?;
    insert_session(conn, session)
}

pub(crate) fn list_sessions(conn: &Connection) -> Result<Vec<Session>, CleoError> {
    let mut stmt = conn.prepare("SELECT * FROM sessions ORDER BY started_at ASC").map_err(rusqlite_err)?;
    let rows = stmt.query_map([], session_from_row).map_err(rusqlite_err)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(rusqlite_err)?);
    }
    Ok(out)
}

pub(crate) fn current_session_id(conn: &Connection) -> Result<Option<SessionId>, CleoError> {
    let id: Option<String> = conn
        .query_row("SELECT session_id FROM current_session WHERE id = 1", [], |r| r.get(0))
        .or_else(|e| if matches!(e, rusqlite::Error::QueryReturnedNoRows) { Ok(None) } else { Err(e) })
        .map_err(rusqlite_err)?;
    Ok(id.map(SessionId::from_string))
}

pub(crate) fn set_current_session_id(conn: &Connection, id: Option<SessionId>) -> Result<(), CleoError> {
    conn.execute(
        "INSERT INTO current_session (id, session_id) VALUES (1, ?1)
         ON CONFLICT(id) DO UPDATE SET session_id = excluded.session_id",
        params![id.as_ref().map(|s| s.as_str().to_string())],
    )
    .map_err(rusqlite_err)?;
    Ok(())
}

pub(crate) fn append_task_work(conn: &Connection, entry: &TaskWorkEntry) -> Result<(), CleoError> {
    conn.execute(
        "INSERT INTO task_work (session_id, task_id, set_at, cleared_at) VALUES (?1,?2,?3,?4)",
        params![
            entry.session_id.as_str(),
            entry.task_id.numeric() as i64,
            entry.set_at.to_rfc3339(),
            entry.cleared_at.map(|d| d.to_rfc3339()),
        ],
    )
    .map_err(rusqlite_err)?;
    Ok(())
}

pub(crate) fn open_task_work(
    conn: &Connection,
    session_id: &SessionId,
) -> Result<Option<TaskWorkEntry>, CleoError> {
    conn.query_row(
        "SELECT session_id, task_id, set_at, cleared_at FROM task_work
         WHERE session_id = ?1 AND cleared_at IS NULL ORDER BY set_at DESC LIMIT 1",
        params![session_id.as_str()],
        |r| {
            Ok(TaskWorkEntry {
                session_id: SessionId::from_string(r.get::<_, String>(0)?),
                task_id: TaskId::from_numeric(r.get::<_, i64>(1)? as u64),
                set_at: chrono::DateTime::parse_from_rfc3339(&r.get::<_, String>(2)?)
                    .map(|d| d.with_timezone(&chrono::Utc))
                    .unwrap_or_else(|_| chrono::Utc::now()),
                cleared_at: None,
            })
        },
    )
    .map(Some)
    .or_else(|e| if matches!(e, rusqlite::Error::QueryReturnedNoRows) { Ok(None) } else { Err(e) })
    .map_err(rusqlite_err)
}

pub(crate) fn close_task_work(
    conn: &Connection,
    session_id: &SessionId,
    task_id: TaskId,
    cleared_at: chrono::DateTime<chrono::Utc>,
) -> Result<(), CleoError> {
    conn.execute(
        "UPDATE task_work SET cleared_at = ?1
         WHERE session_id = ?2 AND task_id = ?3 AND cleared_at IS NULL",
        params![cleared_at.to_rfc3339(), session_id.as_str(), task_id.numeric() as i64],
    )
    .map_err(rusqlite_err)?;
    Ok(())
}

pub(crate) fn task_work_history(conn: &Connection, session_id: &SessionId) -> Result<Vec<TaskWorkEntry>, CleoError> {
    let mut stmt = conn
        .prepare("SELECT session_id, task_id, set_at, cleared_at FROM task_work WHERE session_id = ?1 ORDER BY set_at ASC")
        .map_err(rusqlite_err)?;
    let rows = stmt
        .query_map(params![session_id.as_str()], |r| {
            let cleared: Option<String> = r.get(3)?;
            Ok(TaskWorkEntry {
                session_id: SessionId::from_string(r.get::<_, String>(0)?),
                task_id: TaskId::from_numeric(r.get::<_, i64>(1)? as u64),
                set_at: chrono::DateTime::parse_from_rfc3339(&r.get::<_, String>(2)?)
                    .map(|d| d.with_timezone(&chrono::Utc))
                    .unwrap_or_else(|_| chrono::Utc::now()),
                cleared_at: cleared.and_then(|s| {
                    chrono::DateTime::parse_from_rfc3339(&s).ok().map(|d| d.with_timezone(&chrono::Utc))
                }),
            })
        })
        .map_err(rusqlite_err)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(rusqlite_err)?);
    }
    Ok(out)
}
