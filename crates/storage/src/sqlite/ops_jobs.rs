//! Background job row operations (spec §3, §4.6).

use rusqlite::{params, Connection};

use cleo_core::{BackgroundJob, BackgroundJobId, BackgroundJobStatus, CleoError};

use crate::rusqlite_err;

fn job_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BackgroundJob> {
    let id: String = row.get("id")?;
    let result: Option<String> = row.get("result")?;
    Ok(BackgroundJob {
        id: BackgroundJobId::parse(&id).unwrap_or_default(),
        operation: row.get("operation")?,
        status: parse_status(&row.get::<_, String>("status")?),
        started_at: chrono::DateTime::parse_from_rfc3339(&row.get::<_, String>("started_at")?)
            .map(|d| d.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
        completed_at: row
            .get::<_, Option<String>>("completed_at")?
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok().map(|d| d.with_timezone(&chrono::Utc))),
        result: result.and_then(|s| serde_json::from_str(&s).ok()),
        error: row.get("error")?,
        progress: row.get::<_, i64>("progress")? as u8,
    })
}

fn parse_status(s: &str) -> BackgroundJobStatus {
    match s {
        "completed" => BackgroundJobStatus::Completed,
        "failed" => BackgroundJobStatus::Failed,
        "cancelled" => BackgroundJobStatus::Cancelled,
        _ => BackgroundJobStatus::Running,
    }
}

pub(crate) fn insert_job(conn: &Connection, job: &BackgroundJob) -> Result<(), CleoError> {
    conn.execute(
        "INSERT INTO background_jobs (id, operation, status, started_at, completed_at, result, error, progress)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
        params![
            job.id.to_string(),
            job.operation,
            job.status.to_string(),
            job.started_at.to_rfc3339(),
            job.completed_at.map(|d| d.to_rfc3339()),
            job.result.as_ref().map(|v| v.to_string()),
            job.error,
            job.progress as i64,
        ],
    )
    .map_err(rusqlite_err)?;
    Ok(())
}

pub(crate) fn get_job(conn: &Connection, id: BackgroundJobId) -> Result<Option<BackgroundJob>, CleoError> {
    conn.query_row("SELECT * FROM background_jobs WHERE id = ?1", params![id.to_string()], job_from_row)
        .map(Some)
        .or_else(|e| if matches!(e, rusqlite::Error::QueryReturnedNoRows) { Ok(None) } else { Err(e) })
        .map_err(rusqlite_err)
}

pub(crate) fn replace_job(conn: &Connection, job: &BackgroundJob) -> Result<(), CleoError> {
    conn.execute("DELETE FROM background_jobs WHERE id = ?1", params![job.id.to_string()]).map_err(rusqlite_err)?;
    insert_job(conn, job)
}

pub(crate) fn list_jobs(conn: &Connection) -> Result<Vec<BackgroundJob>, CleoError> {
    let mut stmt = conn.prepare("SELECT * FROM background_jobs ORDER BY started_at ASC").map_err(rusqlite_err)?;
    let rows = stmt.query_map([], job_from_row).map_err(rusqlite_err)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(rusqlite_err)?);
    }
    Ok(out)
}

pub(crate) fn delete_job(conn: &Connection, id: BackgroundJobId) -> Result<(), CleoError> {
    conn.execute("DELETE FROM background_jobs WHERE id = ?1", params![id.to_string()]).map_err(rusqlite_err)?;
    Ok(())
}
