//! Audit log append and config get/set (spec §4.7, §6.2).

use rusqlite::{params, Connection};

use cleo_core::{AuditLogRow, CleoConfig, CleoError};

use crate::rusqlite_err;

pub(crate) fn append_log(conn: &Connection, row: &AuditLogRow) -> Result<(), CleoError> {
    conn.execute(
        "INSERT INTO audit_log (id, timestamp, action, task_id, actor, details, before_json, after_json, error)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
        params![
            row.id.to_string(),
            row.timestamp.to_rfc3339(),
            row.action,
            row.task_id,
            row.actor,
            row.details.as_ref().map(|v| v.to_string()),
            row.before.as_ref().map(|v| v.to_string()),
            row.after.as_ref().map(|v| v.to_string()),
            row.error,
        ],
    )
    .map_err(rusqlite_err)?;
    Ok(())
}

pub(crate) fn load_config(conn: &Connection) -> Result<CleoConfig, CleoError> {
    let json: Option<String> = conn
        .query_row("SELECT json FROM config WHERE id = 1", [], |r| r.get(0))
        .or_else(|e| if matches!(e, rusqlite::Error::QueryReturnedNoRows) { Ok(None) } else { Err(e) })
        .map_err(rusqlite_err)?;
    match json {
        Some(s) => CleoConfig::from_json_str(&s),
        None => Ok(CleoConfig::default()),
    }
}

pub(crate) fn save_config(conn: &Connection, config: &CleoConfig) -> Result<(), CleoError> {
    let json = config.to_json_pretty()?;
    conn.execute(
        "INSERT INTO config (id, json) VALUES (1, ?1)
         ON CONFLICT(id) DO UPDATE SET json = excluded.json",
        params![json],
    )
    .map_err(rusqlite_err)?;
    Ok(())
}
