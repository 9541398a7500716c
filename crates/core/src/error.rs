//! `CleoError`: the single error currency above `cleo-core`.
//!
//! Every variant carries a stable `code` (spec §7, e.g. `E_INVALID_TASK_ID`)
//! and maps to an exit code via [`CleoError::exit_code`] (spec §6 table).
//! `fix`/`alternatives` hints are attached at the call site with
//! [`CleoError::with_fix`]/[`CleoError::with_alternative`] rather than baked
//! into variants, since the same code wants different hints in different
//! contexts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A suggested follow-up action attached to an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alternative {
    pub action: String,
    pub command: String,
}

#[derive(Debug, Error, Clone)]
#[error("{message}")]
pub struct CleoError {
    pub code: &'static str,
    pub message: String,
    pub fix: Option<String>,
    pub alternatives: Vec<Alternative>,
    pub kind: ErrorKind,
}

/// Broad error taxonomy (spec §7), used to decide idempotency/retry
/// semantics without matching on the `code` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputShape,
    NotFound,
    Conflict,
    AuthorizationRate,
    Lifecycle,
    Integrity,
    RuntimeInternal,
}

impl CleoError {
    pub fn new(code: &'static str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), fix: None, alternatives: Vec::new(), kind }
    }

    #[must_use]
    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }

    #[must_use]
    pub fn with_alternative(mut self, action: impl Into<String>, command: impl Into<String>) -> Self {
        self.alternatives.push(Alternative { action: action.into(), command: command.into() });
        self
    }

    /// Whether a retry of the same operation is safe by construction
    /// (spec §6: exit codes 7, 20, 21, 22).
    pub fn recoverable(&self) -> bool {
        matches!(self.exit_code(), 7 | 20 | 21 | 22)
    }

    /// Process exit code per spec §6's table.
    pub fn exit_code(&self) -> i32 {
        match self.code {
            "E_INTERNAL" => 1,
            "E_UNKNOWN_OPERATION" | "E_INVALID_TASK_ID" | "E_PATH_TRAVERSAL" | "E_PROTOCOL_VIOLATION"
            | "E_INVALID_ENUM" | "E_CONTENT_TOO_LARGE" | "E_INVALID_PARAMS" => 2,
            "E_FILE_ERROR" => 3,
            "E_NOT_FOUND" => 4,
            "E_MISSING_DEPENDENCY" => 5,
            "E_VALIDATION" => 6,
            "E_LOCK_TIMEOUT" => 7,
            "E_CONFIG" => 8,
            "E_RATE_LIMIT_EXCEEDED" => 9,
            "E_PARENT_NOT_FOUND" => 10,
            "E_MAX_DEPTH" => 11,
            "E_CIRCULAR_DEPENDENCY" => 14,
            "E_HAS_CHILDREN" => 15,
            "E_ID_COLLISION" => 20,
            "E_INTEGRITY_CHECKSUM" => 21,
            "E_INTEGRITY_WRITE_VERIFY_FAILED" | "E_INTEGRITY_SEQUENCE" => 22,
            "E_JOB_LIMIT" => 24,
            "E_FOCUS_REQUIRED" => 38,
            "E_SESSION_CLOSE_BLOCKED" => 39,
            "E_GATE_FAILED" => 40,
            "E_GATE_NOT_APPLICABLE" => 41,
            "E_LIFECYCLE_PREREQUISITE" | "E_LIFECYCLE_TRANSITION_DENIED" => 80,
            "E_NO_DATA" => 100,
            "E_ALREADY_EXISTS" => 101,
            "E_NO_CHANGE" => 102,
            _ => 1,
        }
    }

    // --- constructors for the common taxonomy members (spec §7) ---

    pub fn invalid_task_id(raw: &str) -> Self {
        Self::new(
            "E_INVALID_TASK_ID",
            ErrorKind::InputShape,
            format!("invalid task id: {raw:?} (expected ^T[0-9]+$, numeric <= {})",
                crate::id::TASK_ID_MAX_NUMERIC),
        )
    }

    pub fn path_traversal(path: &str) -> Self {
        Self::new(
            "E_PATH_TRAVERSAL",
            ErrorKind::InputShape,
            format!("path escapes project root: {path:?}"),
        )
    }

    pub fn content_too_large(field: &str, max_len: usize) -> Self {
        Self::new(
            "E_CONTENT_TOO_LARGE",
            ErrorKind::InputShape,
            format!("{field} exceeds maximum length of {max_len}"),
        )
    }

    pub fn invalid_enum(field: &str, value: &str, allowed: &[&str]) -> Self {
        Self::new(
            "E_INVALID_ENUM",
            ErrorKind::InputShape,
            format!("invalid value {value:?} for {field}: expected one of {allowed:?}"),
        )
    }

    pub fn not_found(kind: &str, id: &str) -> Self {
        Self::new("E_NOT_FOUND", ErrorKind::NotFound, format!("{kind} not found: {id}"))
    }

    pub fn unknown_operation(gateway: &str, domain: &str, operation: &str) -> Self {
        Self::new(
            "E_UNKNOWN_OPERATION",
            ErrorKind::InputShape,
            format!("unknown operation: {gateway}.{domain}.{operation}"),
        )
    }

    pub fn rate_limit_exceeded(retry_after_ms: u64, category: &str) -> Self {
        Self::new(
            "E_RATE_LIMIT_EXCEEDED",
            ErrorKind::AuthorizationRate,
            format!("rate limit exceeded for {category}, retry after {retry_after_ms}ms"),
        )
    }

    pub fn circular_dependency(from: &str, to: &str) -> Self {
        Self::new(
            "E_CIRCULAR_DEPENDENCY",
            ErrorKind::Conflict,
            format!("adding dependency {from} -> {to} would create a cycle"),
        )
    }

    pub fn id_collision(id: &str) -> Self {
        Self::new("E_ID_COLLISION", ErrorKind::Integrity, format!("id collision allocating {id}"))
    }

    pub fn write_verify_failed(detail: impl Into<String>) -> Self {
        Self::new("E_INTEGRITY_WRITE_VERIFY_FAILED", ErrorKind::Integrity, detail.into())
    }

    pub fn lifecycle_prerequisite(stage: &str, missing: &str) -> Self {
        Self::new(
            "E_LIFECYCLE_PREREQUISITE",
            ErrorKind::Lifecycle,
            format!("stage {stage} requires {missing} to be completed or skipped first"),
        )
    }

    pub fn lifecycle_transition_denied(from: &str, to: &str, reason: &str) -> Self {
        Self::new(
            "E_LIFECYCLE_TRANSITION_DENIED",
            ErrorKind::Lifecycle,
            format!("transition {from} -> {to} denied: {reason}"),
        )
    }

    pub fn gate_failed(gate: &str, stage: &str) -> Self {
        Self::new(
            "E_GATE_FAILED",
            ErrorKind::Lifecycle,
            format!("gate {gate} failed for stage {stage}"),
        )
    }

    pub fn session_close_blocked(incomplete: usize) -> Self {
        Self::new(
            "E_SESSION_CLOSE_BLOCKED",
            ErrorKind::Conflict,
            format!("session close blocked: {incomplete} task(s) in scope are not done/cancelled/archived"),
        )
    }

    pub fn focus_required() -> Self {
        Self::new(
            "E_FOCUS_REQUIRED",
            ErrorKind::InputShape,
            "operation requires an active task-work focus".to_string(),
        )
    }

    pub fn job_limit(cap: usize) -> Self {
        Self::new(
            "E_JOB_LIMIT",
            ErrorKind::AuthorizationRate,
            format!("concurrent job cap of {cap} reached"),
        )
    }

    pub fn wal_mode_refused(observed: &str) -> Self {
        Self::new(
            "E_CONFIG",
            ErrorKind::Integrity,
            format!("refusing to open database: journal_mode={observed}, expected wal"),
        )
    }

    pub fn lock_timeout(detail: impl Into<String>) -> Self {
        Self::new("E_LOCK_TIMEOUT", ErrorKind::RuntimeInternal, detail.into())
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::new("E_VALIDATION", ErrorKind::InputShape, detail.into())
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new("E_INTERNAL", ErrorKind::RuntimeInternal, detail.into())
    }

    pub fn file_error(detail: impl Into<String>) -> Self {
        Self::new("E_FILE_ERROR", ErrorKind::RuntimeInternal, detail.into())
    }

    pub fn no_change(detail: impl Into<String>) -> Self {
        Self::new("E_NO_CHANGE", ErrorKind::Conflict, detail.into())
    }

    /// A request's `domain`/`operation` doesn't match the enforced shape
    /// (spec §6: "Operation naming (enforced)") — unknown domain, or a verb
    /// outside the query/mutate list for the gateway it arrived through.
    pub fn protocol_violation(detail: impl Into<String>) -> Self {
        Self::new("E_PROTOCOL_VIOLATION", ErrorKind::InputShape, detail.into())
    }
}

impl From<std::io::Error> for CleoError {
    fn from(e: std::io::Error) -> Self {
        CleoError::file_error(e.to_string())
    }
}

impl From<serde_json::Error> for CleoError {
    fn from(e: serde_json::Error) -> Self {
        CleoError::validation(format!("invalid JSON: {e}"))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
