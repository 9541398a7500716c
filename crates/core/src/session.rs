//! Session aggregate (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CleoError;
use crate::id::{SessionId, TaskId};
use crate::simple_display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Ended,
    Suspended,
    Orphaned,
}

simple_display! {
    SessionStatus {
        Active => "active",
        Ended => "ended",
        Suspended => "suspended",
        Orphaned => "orphaned",
    }
}

impl SessionStatus {
    pub const ALL: &'static [&'static str] = &["active", "ended", "suspended", "orphaned"];
}

/// Typed union scope a session operates over (`TYPE:ID` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionScope {
    Task { id: TaskId },
    TaskGroup { id: String },
    Subtree { root: TaskId },
    Epic { id: TaskId },
    EpicPhase { epic: TaskId, phase: String },
    Custom { label: String, task_ids: Vec<TaskId> },
    Global,
}

impl SessionScope {
    /// Parse the CLI/MCP wire form `TYPE:ID`.
    pub fn parse(s: &str) -> Result<Self, CleoError> {
        if s.eq_ignore_ascii_case("global") {
            return Ok(SessionScope::Global);
        }
        let (kind, id) = s.split_once(':').ok_or_else(|| {
            CleoError::validation(format!("scope must be TYPE:ID or 'global', got {s:?}"))
        })?;
        Ok(match kind {
            "task" => SessionScope::Task { id: TaskId::parse(id)? },
            "taskGroup" => SessionScope::TaskGroup { id: id.to_string() },
            "subtree" => SessionScope::Subtree { root: TaskId::parse(id)? },
            "epic" => SessionScope::Epic { id: TaskId::parse(id)? },
            "epicPhase" => {
                let (epic, phase) = id.split_once('/').ok_or_else(|| {
                    CleoError::validation("epicPhase scope requires TYPE:EPIC_ID/PHASE")
                })?;
                SessionScope::EpicPhase { epic: TaskId::parse(epic)?, phase: phase.to_string() }
            }
            "custom" => SessionScope::Custom { label: id.to_string(), task_ids: Vec::new() },
            other => {
                return Err(CleoError::invalid_enum(
                    "scope",
                    other,
                    &["task", "taskGroup", "subtree", "epic", "epicPhase", "custom", "global"],
                ))
            }
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    #[serde(default)]
    pub tasks_completed_count: u32,
    #[serde(default)]
    pub tasks_created_count: u32,
    #[serde(default)]
    pub resume_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub name: Option<String>,
    pub status: SessionStatus,
    pub scope: SessionScope,
    pub current_task: Option<TaskId>,
    pub task_started_at: Option<DateTime<Utc>>,
    pub agent: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub tasks_completed: Vec<TaskId>,
    #[serde(default)]
    pub tasks_created: Vec<TaskId>,
    pub previous_session_id: Option<SessionId>,
    pub next_session_id: Option<SessionId>,
    pub handoff: Option<String>,
    pub debrief: Option<String>,
    #[serde(default)]
    pub stats: SessionStats,
    #[serde(default)]
    pub graded: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}
