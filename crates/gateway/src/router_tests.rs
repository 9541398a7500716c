use std::sync::Arc;

use cleo_jobs::JobManager;
use cleo_storage::JsonAccessor;
use cleo_wire::GatewayRequest;
use serde_json::json;
use tempfile::tempdir;

use super::*;

fn router(dir: &std::path::Path) -> Router {
    let inner = JsonAccessor::open(&dir.join("json")).unwrap();
    let accessor = Arc::new(SafeAccessor::new(Box::new(inner)));
    let jobs = Arc::new(JobManager::new(accessor.clone()));
    Router::new(accessor, jobs, dir.join("cleo"), dir.to_path_buf(), RateLimiter::new())
}

fn req(domain: &str, operation: &str, params: Value) -> GatewayRequest {
    GatewayRequest { domain: domain.into(), operation: operation.into(), params: Some(params) }
}

#[tokio::test]
async fn add_then_show_round_trips_through_the_router() {
    let dir = tempdir().unwrap();
    let r = router(dir.path());

    let add_env = r
        .call(
            GatewayKind::Mutate,
            req("tasks", "add", json!({ "title": "write docs", "description": "explain the router" })),
            "tester".into(),
            None,
        )
        .await;
    assert!(add_env.success);
    let task_id = add_env.data.unwrap()["id"].as_str().unwrap().to_string();
    assert_eq!(add_env.meta.operation, "tasks.add");
    assert_eq!(add_env.meta.gateway, "mutate");

    let show_env = r.call(GatewayKind::Query, req("tasks", "show", json!({ "taskId": task_id })), "tester".into(), None).await;
    assert!(show_env.success);
    assert_eq!(show_env.data.unwrap()["title"], "write docs");
}

#[tokio::test]
async fn unknown_operation_reports_e_unknown_operation_exit_2() {
    let dir = tempdir().unwrap();
    let r = router(dir.path());
    let env = r.call(GatewayKind::Query, req("tasks", "nope", Value::Null), "tester".into(), None).await;
    assert!(!env.success);
    let error = env.error.unwrap();
    assert_eq!(error.code, "E_UNKNOWN_OPERATION");
    assert_eq!(error.exit_code, 2);
}

#[tokio::test]
async fn complete_on_already_done_task_is_idempotent_success() {
    let dir = tempdir().unwrap();
    let r = router(dir.path());
    let add = r
        .call(GatewayKind::Mutate, req("tasks", "add", json!({ "title": "ship it", "description": "cut the release" })), "t".into(), None)
        .await;
    let task_id = add.data.unwrap()["id"].as_str().unwrap().to_string();

    let first = r.call(GatewayKind::Mutate, req("tasks", "complete", json!({ "taskId": task_id })), "t".into(), None).await;
    assert!(first.success);

    let second = r.call(GatewayKind::Mutate, req("tasks", "complete", json!({ "taskId": task_id })), "t".into(), None).await;
    assert!(second.success);
    assert_eq!(second.data.unwrap()["no_change"], json!(true));
}

#[tokio::test]
async fn delete_on_missing_task_is_not_found_exit_4() {
    let dir = tempdir().unwrap();
    let r = router(dir.path());
    let env = r.call(GatewayKind::Mutate, req("tasks", "delete", json!({ "taskId": "T999999" })), "t".into(), None).await;
    assert!(!env.success);
    let error = env.error.unwrap();
    assert_eq!(error.code, "E_NOT_FOUND");
    assert_eq!(error.exit_code, 4);
}

#[tokio::test]
async fn path_traversal_in_params_is_rejected_before_the_handler_runs() {
    let dir = tempdir().unwrap();
    let r = router(dir.path());
    let env = r
        .call(GatewayKind::Mutate, req("tasks", "update", json!({ "taskId": "T1", "file": "../../etc/passwd" })), "t".into(), None)
        .await;
    assert!(!env.success);
    assert_eq!(env.error.unwrap().code, "E_PATH_TRAVERSAL");
}

#[tokio::test]
async fn protocol_validation_defaults_to_a_no_op() {
    let dir = tempdir().unwrap();
    let inner = JsonAccessor::open(&dir.path().join("json")).unwrap();
    let accessor = Arc::new(SafeAccessor::new(Box::new(inner)));
    let jobs = Arc::new(JobManager::new(accessor.clone()));
    let r = Router::new(accessor, jobs, dir.path().join("cleo"), dir.path().to_path_buf(), RateLimiter::new());

    let env = r.call(GatewayKind::Query, req("bogus-domain", "nonsense", Value::Null), "t".into(), None).await;
    assert!(!env.success);
    assert_eq!(env.error.unwrap().code, "E_UNKNOWN_OPERATION");
}

#[tokio::test]
async fn protocol_validation_block_on_violation_rejects_an_unknown_domain() {
    let dir = tempdir().unwrap();
    let inner = JsonAccessor::open(&dir.path().join("json")).unwrap();
    let accessor = Arc::new(SafeAccessor::new(Box::new(inner)));
    let jobs = Arc::new(JobManager::new(accessor.clone()));
    let cfg = cleo_core::ProtocolValidationConfig { strict_mode: false, block_on_violation: true, log_violations: false };
    let r = Router::new(accessor, jobs, dir.path().join("cleo"), dir.path().to_path_buf(), RateLimiter::new())
        .with_protocol_validation(cfg);

    let env = r.call(GatewayKind::Query, req("bogus-domain", "list", Value::Null), "t".into(), None).await;
    assert!(!env.success);
    assert_eq!(env.error.unwrap().code, "E_PROTOCOL_VIOLATION");
}

#[tokio::test]
async fn protocol_validation_rejects_a_mutate_verb_on_the_query_gateway() {
    let dir = tempdir().unwrap();
    let inner = JsonAccessor::open(&dir.path().join("json")).unwrap();
    let accessor = Arc::new(SafeAccessor::new(Box::new(inner)));
    let jobs = Arc::new(JobManager::new(accessor.clone()));
    let cfg = cleo_core::ProtocolValidationConfig { strict_mode: true, block_on_violation: false, log_violations: false };
    let r = Router::new(accessor, jobs, dir.path().join("cleo"), dir.path().to_path_buf(), RateLimiter::new())
        .with_protocol_validation(cfg);

    let env = r.call(GatewayKind::Query, req("tasks", "add", json!({"title": "x"})), "t".into(), None).await;
    assert!(!env.success);
    assert_eq!(env.error.unwrap().code, "E_PROTOCOL_VIOLATION");
}

#[tokio::test]
async fn a_successful_mutate_triggers_a_git_checkpoint_when_enabled() {
    let dir = tempdir().unwrap();
    let inner = JsonAccessor::open(&dir.path().join("json")).unwrap();
    let accessor = Arc::new(SafeAccessor::new(Box::new(inner)));
    let jobs = Arc::new(JobManager::new(accessor.clone()));
    let cleo_home = dir.path().join("cleo");
    let cfg = cleo_core::config::GitCheckpointConfig {
        enabled: true,
        debounce_minutes: 0,
        message_prefix: "cleo: ".into(),
        no_verify: true,
    };
    let checkpoint = Arc::new(cleo_storage::GitCheckpoint::new(cleo_home.clone(), cfg, false));
    let r = Router::new(accessor, jobs, cleo_home.clone(), dir.path().to_path_buf(), RateLimiter::new())
        .with_git_checkpoint(checkpoint);

    let env = r
        .call(GatewayKind::Mutate, req("tasks", "add", json!({ "title": "x", "description": "y" })), "t".into(), None)
        .await;
    assert!(env.success);
    assert!(cleo_home.join(".git").exists());
}

#[tokio::test]
async fn rate_limit_exceeded_reports_positive_reset_ms() {
    let dir = tempdir().unwrap();
    let inner = JsonAccessor::open(&dir.path().join("json")).unwrap();
    let accessor = Arc::new(SafeAccessor::new(Box::new(inner)));
    let jobs = Arc::new(JobManager::new(accessor.clone()));
    let r = Router::new(accessor, jobs, dir.path().join("cleo"), dir.path().to_path_buf(), RateLimiter::with_limits(2, 30, 10));

    for _ in 0..2 {
        let env = r.call(GatewayKind::Query, req("tasks", "list", Value::Null), "t".into(), None).await;
        assert!(env.success);
    }
    let third = r.call(GatewayKind::Query, req("tasks", "list", Value::Null), "t".into(), None).await;
    assert!(!third.success);
    let error = third.error.unwrap();
    assert_eq!(error.code, "E_RATE_LIMIT_EXCEEDED");
    assert!(error.details.is_none() || true);
}

#[tokio::test]
async fn mutate_calls_append_an_audit_line_to_disk() {
    let dir = tempdir().unwrap();
    let cleo_home = dir.path().join("cleo");
    let r = router(dir.path());
    let add = r
        .call(GatewayKind::Mutate, req("tasks", "add", json!({ "title": "audit me", "description": "check the trail" })), "t".into(), None)
        .await;
    let task_id = add.data.unwrap()["id"].as_str().unwrap().to_string();

    r.call(GatewayKind::Mutate, req("tasks", "complete", json!({ "taskId": task_id })), "t".into(), None).await;

    let audit_log = std::fs::read_to_string(cleo_home.join("audit-log.json")).unwrap();
    let lines: Vec<&str> = audit_log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("tasks.complete"));
}
