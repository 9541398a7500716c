//! The two gateway entry points share one request shape (spec §6): a
//! `{domain, operation, params?}` envelope, distinguished only by which
//! gateway (`query` or `mutate`) it arrived through.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Valid domains (spec §6).
pub const DOMAINS: &[&str] =
    &["tasks", "session", "orchestrate", "research", "lifecycle", "validate", "release", "system", "admin"];

/// Enforced query-operation verbs (spec §6), before dotted subpaths.
pub const QUERY_OPERATION_VERBS: &[&str] = &["get", "list", "show", "find", "exists", "analyze", "stats"];

/// Enforced mutate-operation verbs (spec §6), before dotted subpaths.
pub const MUTATE_OPERATION_VERBS: &[&str] = &[
    "add", "create", "update", "complete", "delete", "archive", "start", "end", "resume", "suspend",
    "close", "switch", "record", "progress", "block", "unblock", "skip", "commit", "tag",
];

/// Which of the two gateway entry points (`cleo_query` / `cleo_mutate`) a
/// request arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    Query,
    Mutate,
}

impl GatewayKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GatewayKind::Query => "query",
            GatewayKind::Mutate => "mutate",
        }
    }
}

/// `{domain, operation, params?}` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub domain: String,
    pub operation: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_without_params() {
        let req: GatewayRequest = serde_json::from_str(r#"{"domain":"tasks","operation":"list"}"#).unwrap();
        assert_eq!(req.domain, "tasks");
        assert_eq!(req.operation, "list");
        assert!(req.params.is_none());
    }
}
