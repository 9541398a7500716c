//! Lifecycle pipeline/stage/gate/evidence/transition row operations
//! (spec §3, §4.4).

use rusqlite::{params, Connection};

use cleo_core::{
    CleoError, Evidence, GateResult, LifecyclePipeline, LifecycleStageRow, PipelineStatus, TaskId,
    Transition,
};

use super::convert::{evidence_from_row, gate_from_row, pipeline_from_row, stage_from_row, transition_from_row};
use crate::rusqlite_err;

pub(crate) fn get_pipeline(conn: &Connection, task_id: TaskId) -> Result<Option<LifecyclePipeline>, CleoError> {
    conn.query_row(
        "SELECT * FROM lifecycle_pipelines WHERE task_id = ?1",
        params![task_id.numeric() as i64],
        pipeline_from_row,
    )
    .map(Some)
    .or_else(|e| if matches!(e, rusqlite::Error::QueryReturnedNoRows) { Ok(None) } else { Err(e) })
    .map_err(rusqlite_err)
}

pub(crate) fn create_pipeline(conn: &Connection, task_id: TaskId) -> Result<LifecyclePipeline, CleoError> {
    let now = chrono::Utc::now();
    conn.execute(
        "INSERT INTO lifecycle_pipelines (task_id, status, current_stage_id, started_at)
         VALUES (?1, ?2, 0, ?3)",
        params![task_id.numeric() as i64, PipelineStatus::Active.to_string(), now.to_rfc3339()],
    )
    .map_err(rusqlite_err)?;
    let id = conn.last_insert_rowid();

    for (seq, stage) in cleo_core::PipelineStage::ORDERED.iter().enumerate() {
        conn.execute(
            "INSERT INTO lifecycle_stages (pipeline_id, stage_name, sequence, status)
             VALUES (?1, ?2, ?3, 'pending')",
            params![id, stage.to_string(), seq as i64],
        )
        .map_err(rusqlite_err)?;
    }
    let first_stage_id = conn
        .query_row(
            "SELECT id FROM lifecycle_stages WHERE pipeline_id = ?1 ORDER BY sequence ASC LIMIT 1",
            params![id],
            |r| r.get::<_, i64>(0),
        )
        .map_err(rusqlite_err)?;
    conn.execute(
        "UPDATE lifecycle_pipelines SET current_stage_id = ?1 WHERE id = ?2",
        params![first_stage_id, id],
    )
    .map_err(rusqlite_err)?;

    get_pipeline(conn, task_id)?.ok_or_else(|| CleoError::internal("pipeline vanished after insert"))
}

pub(crate) fn replace_pipeline(conn: &Connection, pipeline: &LifecyclePipeline) -> Result<(), CleoError> {
    conn.execute(
        "UPDATE lifecycle_pipelines SET status = ?1, current_stage_id = ?2, completed_at = ?3 WHERE id = ?4",
        params![
            pipeline.status.to_string(),
            pipeline.current_stage_id,
            pipeline.completed_at.map(|d| d.to_rfc3339()),
            pipeline.id,
        ],
    )
    .map_err(rusqlite_err)?;
    Ok(())
}

pub(crate) fn list_stages(conn: &Connection, pipeline_id: i64) -> Result<Vec<LifecycleStageRow>, CleoError> {
    let mut stmt = conn
        .prepare("SELECT * FROM lifecycle_stages WHERE pipeline_id = ?1 ORDER BY sequence ASC")
        .map_err(rusqlite_err)?;
    let rows = stmt.query_map(params![pipeline_id], stage_from_row).map_err(rusqlite_err)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(rusqlite_err)?);
    }
    Ok(out)
}

pub(crate) fn replace_stage(conn: &Connection, stage: &LifecycleStageRow) -> Result<(), CleoError> {
    conn.execute(
        "UPDATE lifecycle_stages SET status = ?1, started_at = ?2, completed_at = ?3, blocked_at = ?4,
            skipped_at = ?5, reason = ?6, notes = ?7, metadata = ?8
         WHERE id = ?9",
        params![
            stage.status.to_string(),
            stage.started_at.map(|d| d.to_rfc3339()),
            stage.completed_at.map(|d| d.to_rfc3339()),
            stage.blocked_at.map(|d| d.to_rfc3339()),
            stage.skipped_at.map(|d| d.to_rfc3339()),
            stage.reason,
            serde_json::to_string(&stage.notes).unwrap_or_default(),
            serde_json::to_string(&stage.metadata).unwrap_or_default(),
            stage.id,
        ],
    )
    .map_err(rusqlite_err)?;
    Ok(())
}

pub(crate) fn record_gate(conn: &Connection, gate: &GateResult) -> Result<(), CleoError> {
    conn.execute(
        "INSERT INTO gate_results (stage_id, gate_name, result, checked_by, details, reason, checked_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7)",
        params![
            gate.stage_id,
            gate.gate_name,
            gate.result.to_string(),
            gate.checked_by,
            gate.details,
            gate.reason,
            gate.checked_at.to_rfc3339(),
        ],
    )
    .map_err(rusqlite_err)?;
    Ok(())
}

pub(crate) fn add_evidence(conn: &Connection, evidence: &Evidence) -> Result<(), CleoError> {
    conn.execute(
        "INSERT INTO evidence (stage_id, uri, evidence_type, description) VALUES (?1,?2,?3,?4)",
        params![evidence.stage_id, evidence.uri, evidence.evidence_type.to_string(), evidence.description],
    )
    .map_err(rusqlite_err)?;
    Ok(())
}

pub(crate) fn record_transition(conn: &Connection, transition: &Transition) -> Result<(), CleoError> {
    conn.execute(
        "INSERT INTO transitions (pipeline_id, from_stage_id, to_stage_id, transition_type, created_at)
         VALUES (?1,?2,?3,?4,?5)",
        params![
            transition.pipeline_id,
            transition.from_stage_id,
            transition.to_stage_id,
            transition.transition_type.to_string(),
            transition.created_at.to_rfc3339(),
        ],
    )
    .map_err(rusqlite_err)?;
    Ok(())
}

#[allow(dead_code)]
pub(crate) fn get_gate(conn: &Connection, id: i64) -> Result<Option<GateResult>, CleoError> {
    conn.query_row("SELECT * FROM gate_results WHERE id = ?1", params![id], gate_from_row)
        .map(Some)
        .or_else(|e| if matches!(e, rusqlite::Error::QueryReturnedNoRows) { Ok(None) } else { Err(e) })
        .map_err(rusqlite_err)
}

pub(crate) fn list_gates(conn: &Connection, stage_id: i64) -> Result<Vec<GateResult>, CleoError> {
    let mut stmt = conn
        .prepare("SELECT * FROM gate_results WHERE stage_id = ?1 ORDER BY checked_at ASC")
        .map_err(rusqlite_err)?;
    let rows = stmt.query_map(params![stage_id], gate_from_row).map_err(rusqlite_err)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(rusqlite_err)?);
    }
    Ok(out)
}

#[allow(dead_code)]
pub(crate) fn get_evidence(conn: &Connection, id: i64) -> Result<Option<Evidence>, CleoError> {
    conn.query_row("SELECT * FROM evidence WHERE id = ?1", params![id], evidence_from_row)
        .map(Some)
        .or_else(|e| if matches!(e, rusqlite::Error::QueryReturnedNoRows) { Ok(None) } else { Err(e) })
        .map_err(rusqlite_err)
}

pub(crate) fn list_evidence(conn: &Connection, stage_id: i64) -> Result<Vec<Evidence>, CleoError> {
    let mut stmt =
        conn.prepare("SELECT * FROM evidence WHERE stage_id = ?1 ORDER BY id ASC").map_err(rusqlite_err)?;
    let rows = stmt.query_map(params![stage_id], evidence_from_row).map_err(rusqlite_err)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(rusqlite_err)?);
    }
    Ok(out)
}

pub(crate) fn list_transitions(conn: &Connection, pipeline_id: i64) -> Result<Vec<Transition>, CleoError> {
    let mut stmt = conn
        .prepare("SELECT * FROM transitions WHERE pipeline_id = ?1 ORDER BY created_at ASC")
        .map_err(rusqlite_err)?;
    let rows = stmt.query_map(params![pipeline_id], transition_from_row).map_err(rusqlite_err)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(rusqlite_err)?);
    }
    Ok(out)
}
