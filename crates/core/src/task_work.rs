//! Task-work (a.k.a. focus) history: the source of truth for "focus"
//! semantics (spec §3, §4.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{SessionId, TaskId};

/// One row of the append-only task-work history log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskWorkEntry {
    pub session_id: SessionId,
    pub task_id: TaskId,
    pub set_at: DateTime<Utc>,
    pub cleared_at: Option<DateTime<Utc>>,
}

impl TaskWorkEntry {
    pub fn is_open(&self) -> bool {
        self.cleared_at.is_none()
    }
}
