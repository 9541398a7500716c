//! Row <-> domain-type converters (spec §2: storage engine "exposes typed
//! row/domain converters").

use chrono::{DateTime, Utc};
use rusqlite::Row;

use cleo_core::{
    Evidence, EvidenceType, GateOutcome, GateResult, LifecyclePipeline, LifecycleStageRow,
    PipelineStage, PipelineStatus, Priority, Provenance, Session, SessionId, SessionScope,
    SessionStats, SessionStatus, StageStatus, Task, TaskId, TaskSize, TaskStatus, TaskType,
    Transition, TransitionType, VerificationMeta,
};

fn json_vec<T: serde::de::DeserializeOwned>(s: &str) -> Vec<T> {
    serde_json::from_str(s).unwrap_or_default()
}

fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map(|d| d.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}

fn parse_dt_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.map(|s| parse_dt(&s))
}

pub fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let numeric: i64 = row.get("id")?;
    let labels: String = row.get("labels")?;
    let notes: String = row.get("notes")?;
    let acceptance_criteria: String = row.get("acceptance_criteria")?;
    let files: String = row.get("files")?;
    let verification: String = row.get("verification")?;
    let parent_id: Option<i64> = row.get("parent_id")?;
    let size: Option<String> = row.get("size")?;
    let session_id: Option<String> = row.get("session_id")?;

    Ok(Task {
        id: TaskId::from_numeric(numeric as u64),
        title: row.get("title")?,
        description: row.get("description")?,
        status: TaskStatus::parse(&row.get::<_, String>("status")?).unwrap_or(TaskStatus::Pending),
        priority: Priority::parse(&row.get::<_, String>("priority")?).unwrap_or(Priority::Medium),
        task_type: TaskType::parse(&row.get::<_, String>("task_type")?).unwrap_or(TaskType::Task),
        parent_id: parent_id.map(|n| TaskId::from_numeric(n as u64)),
        phase: row.get("phase")?,
        size: size.and_then(|s| TaskSize::parse(&s)),
        position: row.get("position")?,
        position_version: row.get("position_version")?,
        created_at: parse_dt(&row.get::<_, String>("created_at")?),
        updated_at: parse_dt(&row.get::<_, String>("updated_at")?),
        completed_at: parse_dt_opt(row.get("completed_at")?),
        cancelled_at: parse_dt_opt(row.get("cancelled_at")?),
        archived_at: parse_dt_opt(row.get("archived_at")?),
        archive_reason: row.get("archive_reason")?,
        cycle_time_days: row.get("cycle_time_days")?,
        provenance: Provenance {
            created_by: row.get("created_by")?,
            modified_by: row.get("modified_by")?,
            session_id: session_id.map(SessionId::from_string),
        },
        labels: json_vec(&labels),
        notes: json_vec(&notes),
        acceptance_criteria: json_vec(&acceptance_criteria),
        files: json_vec(&files),
        verification: serde_json::from_str::<VerificationMeta>(&verification).unwrap_or_default(),
    })
}

pub fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let scope_json: String = row.get("scope_json")?;
    let stats_json: String = row.get("stats_json")?;
    let current_task: Option<i64> = row.get("current_task")?;
    let previous_session_id: Option<String> = row.get("previous_session_id")?;
    let next_session_id: Option<String> = row.get("next_session_id")?;

    Ok(Session {
        id: SessionId::from_string(row.get::<_, String>("id")?),
        name: row.get("name")?,
        status: parse_session_status(&row.get::<_, String>("status")?),
        scope: serde_json::from_str(&scope_json).unwrap_or(SessionScope::Global),
        current_task: current_task.map(|n| TaskId::from_numeric(n as u64)),
        task_started_at: parse_dt_opt(row.get("task_started_at")?),
        agent: row.get("agent")?,
        notes: json_vec(&row.get::<_, String>("notes")?),
        tasks_completed: json_vec(&row.get::<_, String>("tasks_completed")?),
        tasks_created: json_vec(&row.get::<_, String>("tasks_created")?),
        previous_session_id: previous_session_id.map(SessionId::from_string),
        next_session_id: next_session_id.map(SessionId::from_string),
        handoff: row.get("handoff")?,
        debrief: row.get("debrief")?,
        stats: serde_json::from_str::<SessionStats>(&stats_json).unwrap_or_default(),
        graded: row.get::<_, i64>("graded")? != 0,
        started_at: parse_dt(&row.get::<_, String>("started_at")?),
        ended_at: parse_dt_opt(row.get("ended_at")?),
    })
}

pub fn pipeline_from_row(row: &Row<'_>) -> rusqlite::Result<LifecyclePipeline> {
    Ok(LifecyclePipeline {
        id: row.get("id")?,
        task_id: TaskId::from_numeric(row.get::<_, i64>("task_id")? as u64),
        status: parse_pipeline_status(&row.get::<_, String>("status")?),
        current_stage_id: row.get("current_stage_id")?,
        started_at: parse_dt(&row.get::<_, String>("started_at")?),
        completed_at: parse_dt_opt(row.get("completed_at")?),
    })
}

pub fn stage_from_row(row: &Row<'_>) -> rusqlite::Result<LifecycleStageRow> {
    Ok(LifecycleStageRow {
        id: row.get("id")?,
        pipeline_id: row.get("pipeline_id")?,
        stage_name: PipelineStage::parse(&row.get::<_, String>("stage_name")?)
            .unwrap_or(PipelineStage::Research),
        sequence: row.get::<_, i64>("sequence")? as u8,
        status: parse_stage_status(&row.get::<_, String>("status")?),
        started_at: parse_dt_opt(row.get("started_at")?),
        completed_at: parse_dt_opt(row.get("completed_at")?),
        blocked_at: parse_dt_opt(row.get("blocked_at")?),
        skipped_at: parse_dt_opt(row.get("skipped_at")?),
        reason: row.get("reason")?,
        notes: json_vec(&row.get::<_, String>("notes")?),
        metadata: serde_json::from_str(&row.get::<_, String>("metadata")?).unwrap_or_default(),
    })
}

pub fn gate_from_row(row: &Row<'_>) -> rusqlite::Result<GateResult> {
    Ok(GateResult {
        id: row.get("id")?,
        stage_id: row.get("stage_id")?,
        gate_name: row.get("gate_name")?,
        result: parse_gate_outcome(&row.get::<_, String>("result")?),
        checked_by: row.get("checked_by")?,
        details: row.get("details")?,
        reason: row.get("reason")?,
        checked_at: parse_dt(&row.get::<_, String>("checked_at")?),
    })
}

pub fn evidence_from_row(row: &Row<'_>) -> rusqlite::Result<Evidence> {
    Ok(Evidence {
        id: row.get("id")?,
        stage_id: row.get("stage_id")?,
        uri: row.get("uri")?,
        evidence_type: parse_evidence_type(&row.get::<_, String>("evidence_type")?),
        description: row.get("description")?,
    })
}

pub fn transition_from_row(row: &Row<'_>) -> rusqlite::Result<Transition> {
    Ok(Transition {
        id: row.get("id")?,
        pipeline_id: row.get("pipeline_id")?,
        from_stage_id: row.get("from_stage_id")?,
        to_stage_id: row.get("to_stage_id")?,
        transition_type: parse_transition_type(&row.get::<_, String>("transition_type")?),
        created_at: parse_dt(&row.get::<_, String>("created_at")?),
    })
}

fn parse_session_status(s: &str) -> SessionStatus {
    match s {
        "ended" => SessionStatus::Ended,
        "suspended" => SessionStatus::Suspended,
        "orphaned" => SessionStatus::Orphaned,
        _ => SessionStatus::Active,
    }
}

fn parse_pipeline_status(s: &str) -> PipelineStatus {
    match s {
        "completed" => PipelineStatus::Completed,
        "aborted" => PipelineStatus::Aborted,
        _ => PipelineStatus::Active,
    }
}

fn parse_stage_status(s: &str) -> StageStatus {
    match s {
        "in_progress" => StageStatus::InProgress,
        "completed" => StageStatus::Completed,
        "skipped" => StageStatus::Skipped,
        "blocked" => StageStatus::Blocked,
        "failed" => StageStatus::Failed,
        _ => StageStatus::Pending,
    }
}

fn parse_gate_outcome(s: &str) -> GateOutcome {
    match s {
        "fail" => GateOutcome::Fail,
        "warn" => GateOutcome::Warn,
        _ => GateOutcome::Pass,
    }
}

fn parse_evidence_type(s: &str) -> EvidenceType {
    match s {
        "url" => EvidenceType::Url,
        "manifest" => EvidenceType::Manifest,
        _ => EvidenceType::File,
    }
}

fn parse_transition_type(s: &str) -> TransitionType {
    match s {
        "manual" => TransitionType::Manual,
        "forced" => TransitionType::Forced,
        _ => TransitionType::Automatic,
    }
}

