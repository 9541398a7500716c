//! Audit log row (spec §3, §4.7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::AuditId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogRow {
    pub id: AuditId,
    pub timestamp: DateTime<Utc>,
    /// `"<domain>.<operation>"`.
    pub action: String,
    pub task_id: Option<String>,
    pub actor: String,
    pub details: Option<Value>,
    pub before: Option<Value>,
    pub after: Option<Value>,
    /// Present only for failed operations (spec §7).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
