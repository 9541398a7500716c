//! Task aggregate and its enums (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{SessionId, TaskId};
use crate::{simple_display, validate_len};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Active,
    Blocked,
    Done,
    Cancelled,
    Archived,
}

simple_display! {
    TaskStatus {
        Pending => "pending",
        Active => "active",
        Blocked => "blocked",
        Done => "done",
        Cancelled => "cancelled",
        Archived => "archived",
    }
}

impl TaskStatus {
    pub const ALL: &'static [&'static str] =
        &["pending", "active", "blocked", "done", "cancelled", "archived"];

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => Self::Pending,
            "active" => Self::Active,
            "blocked" => Self::Blocked,
            "done" => Self::Done,
            "cancelled" => Self::Cancelled,
            "archived" => Self::Archived,
            _ => return None,
        })
    }

    /// Status transitions allowed by spec §3:
    /// pending<->active, active->done/blocked/cancelled,
    /// blocked->active/cancelled, done->pending (reopen),
    /// cancelled->pending (uncancel), any->archived.
    pub fn can_transition_to(self, target: Self) -> bool {
        if target == Self::Archived {
            return true;
        }
        if self == target {
            return true;
        }
        use TaskStatus::*;
        matches!(
            (self, target),
            (Pending, Active)
                | (Active, Pending)
                | (Active, Done)
                | (Active, Blocked)
                | (Active, Cancelled)
                | (Blocked, Active)
                | (Blocked, Cancelled)
                | (Done, Pending)
                | (Cancelled, Pending)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

simple_display! {
    Priority {
        Critical => "critical",
        High => "high",
        Medium => "medium",
        Low => "low",
    }
}

impl Priority {
    pub const ALL: &'static [&'static str] = &["critical", "high", "medium", "low"];

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "critical" => Self::Critical,
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => return None,
        })
    }

    /// Weight used by `tasks.analyze`'s leverage score (SPEC_FULL §10).
    pub fn weight(self) -> f64 {
        match self {
            Priority::Critical => 4.0,
            Priority::High => 3.0,
            Priority::Medium => 2.0,
            Priority::Low => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Epic,
    Task,
    Subtask,
}

simple_display! {
    TaskType {
        Epic => "epic",
        Task => "task",
        Subtask => "subtask",
    }
}

impl TaskType {
    pub const ALL: &'static [&'static str] = &["epic", "task", "subtask"];

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "epic" => Self::Epic,
            "task" => Self::Task,
            "subtask" => Self::Subtask,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSize {
    Small,
    Medium,
    Large,
}

simple_display! {
    TaskSize {
        Small => "small",
        Medium => "medium",
        Large => "large",
    }
}

impl TaskSize {
    pub const ALL: &'static [&'static str] = &["small", "medium", "large"];

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "small" => Self::Small,
            "medium" => Self::Medium,
            "large" => Self::Large,
            _ => return None,
        })
    }
}

/// Provenance triple recorded on every task (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub created_by: String,
    pub modified_by: String,
    pub session_id: Option<SessionId>,
}

/// Verification metadata JSON blob (spec §3 "verification metadata").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMeta {
    #[serde(default)]
    pub checks: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub task_type: TaskType,
    pub parent_id: Option<TaskId>,
    pub phase: Option<String>,
    pub size: Option<TaskSize>,
    pub position: i64,
    pub position_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub archive_reason: Option<String>,
    pub cycle_time_days: Option<f64>,
    pub provenance: Provenance,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub verification: VerificationMeta,
}

/// Typed partial-update for `tasks.update` (SPEC_FULL §10, grounded on
/// `fwindolf-beads-rs`'s `IssueUpdates`): only `Some` fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub phase: Option<String>,
    pub size: Option<TaskSize>,
    pub labels: Option<Vec<String>>,
    pub notes: Option<Vec<String>>,
    pub acceptance_criteria: Option<Vec<String>>,
    pub files: Option<Vec<String>>,
}

pub const TITLE_MAX_LEN: usize = 120;
pub const DESCRIPTION_MAX_LEN: usize = 2000;

impl Task {
    /// Creation validation shared by every accessor backend: title/description
    /// length, and title != description (spec §4.3 "Creation enforces title
    /// != description").
    pub fn validate_title_description(title: &str, description: &str) -> Result<(), crate::error::CleoError> {
        validate_len("title", title, 1, TITLE_MAX_LEN)?;
        validate_len("description", description, 0, DESCRIPTION_MAX_LEN)?;
        if title.trim() == description.trim() && !title.trim().is_empty() {
            return Err(crate::error::CleoError::validation(
                "title and description must not be identical",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
