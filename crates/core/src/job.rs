//! Background job record (spec §3, §4.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::BackgroundJobId;
use crate::simple_display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundJobStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

simple_display! {
    BackgroundJobStatus {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl BackgroundJobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, BackgroundJobStatus::Running)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundJob {
    pub id: BackgroundJobId,
    pub operation: String,
    pub status: BackgroundJobStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<Value>,
    pub error: Option<String>,
    /// Clamped to `[0, 100]` (spec §4.6).
    pub progress: u8,
}
