//! Response envelope (spec §4.7): `{_meta, success, data}` on success,
//! `{_meta, success:false, error}` on failure, and a `partial` batch shape
//! for mixed-outcome mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cleo_core::Alternative;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMeta {
    pub spec_version: String,
    pub schema_version: u32,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub request_id: Uuid,
    pub transport: String,
    pub strict: bool,
    pub mvi: String,
    pub context_version: u32,
    pub gateway: String,
    pub domain: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: String,
    pub exit_code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub alternatives: Vec<Alternative>,
}

/// Mixed-outcome batch payload (spec §4.7 "Partial batch").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchData<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<BatchFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub id: String,
    pub error: ErrorBody,
}

/// The envelope every gateway call returns, generic over the success
/// payload `T`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "_meta")]
    pub meta: EnvelopeMeta,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> Envelope<T> {
    pub fn success(meta: EnvelopeMeta, data: T) -> Self {
        Self { meta, success: true, data: Some(data), partial: None, error: None }
    }

    pub fn partial(meta: EnvelopeMeta, data: T) -> Self {
        Self { meta, success: true, data: Some(data), partial: Some(true), error: None }
    }

    pub fn failure(meta: EnvelopeMeta, error: ErrorBody) -> Self {
        Self { meta, success: false, data: None, partial: None, error: Some(error) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_meta() -> EnvelopeMeta {
        EnvelopeMeta {
            spec_version: crate::SPEC_VERSION.to_string(),
            schema_version: crate::SCHEMA_VERSION,
            timestamp: Utc::now(),
            operation: "tasks.add".into(),
            request_id: Uuid::new_v4(),
            transport: "mcp".into(),
            strict: true,
            mvi: "standard".into(),
            context_version: 1,
            gateway: "mutate".into(),
            domain: "tasks".into(),
            duration_ms: 12,
        }
    }

    #[test]
    fn success_envelope_omits_error_and_partial() {
        let env = Envelope::success(sample_meta(), serde_json::json!({"id": "T1"}));
        let value = serde_json::to_value(&env).unwrap();
        assert!(value.get("error").is_none());
        assert!(value.get("partial").is_none());
        assert_eq!(value["success"], true);
    }

    #[test]
    fn failure_envelope_omits_data() {
        let error = ErrorBody {
            code: "E_NOT_FOUND".into(),
            exit_code: 4,
            message: "task not found: T1".into(),
            details: None,
            fix: None,
            alternatives: vec![],
        };
        let env: Envelope<()> = Envelope::failure(sample_meta(), error);
        let value = serde_json::to_value(&env).unwrap();
        assert!(value.get("data").is_none());
        assert_eq!(value["success"], false);
    }
}
