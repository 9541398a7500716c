use super::*;
use yare::parameterized;

#[parameterized(
    internal = { "E_INTERNAL", 1 },
    unknown_op = { "E_UNKNOWN_OPERATION", 2 },
    path_traversal = { "E_PATH_TRAVERSAL", 2 },
    not_found = { "E_NOT_FOUND", 4 },
    lock_timeout = { "E_LOCK_TIMEOUT", 7 },
    rate_limited = { "E_RATE_LIMIT_EXCEEDED", 9 },
    circular_dep = { "E_CIRCULAR_DEPENDENCY", 14 },
    id_collision = { "E_ID_COLLISION", 20 },
    write_verify = { "E_INTEGRITY_WRITE_VERIFY_FAILED", 22 },
    focus_required = { "E_FOCUS_REQUIRED", 38 },
    session_close = { "E_SESSION_CLOSE_BLOCKED", 39 },
    gate_failed = { "E_GATE_FAILED", 40 },
    lifecycle_prereq = { "E_LIFECYCLE_PREREQUISITE", 80 },
    no_change = { "E_NO_CHANGE", 102 },
)]
fn exit_code_matches_spec_table(code: &'static str, expected: i32) {
    let err = CleoError::new(code, ErrorKind::RuntimeInternal, "x");
    assert_eq!(err.exit_code(), expected);
}

#[test]
fn recoverable_codes_match_spec() {
    for code in ["E_LOCK_TIMEOUT", "E_ID_COLLISION", "E_INTEGRITY_CHECKSUM", "E_INTEGRITY_WRITE_VERIFY_FAILED"] {
        let err = CleoError::new(code, ErrorKind::Integrity, "x");
        assert!(err.recoverable(), "{code} should be recoverable");
    }
    let not_recoverable = CleoError::new("E_NOT_FOUND", ErrorKind::NotFound, "x");
    assert!(!not_recoverable.recoverable());
}

#[test]
fn with_fix_and_alternative_attach_hints() {
    let err = CleoError::not_found("task", "T1")
        .with_fix("use tasks.list to find valid ids")
        .with_alternative("list tasks", "cleo tasks list");
    assert_eq!(err.fix.as_deref(), Some("use tasks.list to find valid ids"));
    assert_eq!(err.alternatives.len(), 1);
    assert_eq!(err.alternatives[0].command, "cleo tasks list");
}

#[test]
fn invalid_task_id_carries_code() {
    let err = CleoError::invalid_task_id("xyz");
    assert_eq!(err.code, "E_INVALID_TASK_ID");
    assert_eq!(err.exit_code(), 2);
}
