use std::sync::Arc;

use cleo_jobs::JobManager;
use cleo_storage::JsonAccessor;
use serde_json::json;
use tempfile::tempdir;

use super::*;

fn ctx() -> HandlerCtx {
    let dir = tempdir().unwrap();
    let inner = JsonAccessor::open(dir.path()).unwrap();
    let accessor = Arc::new(SafeAccessor::new(Box::new(inner)));
    let jobs = Arc::new(JobManager::new(accessor.clone()));
    HandlerCtx { accessor, jobs, actor: "tester".into(), session_id: None }
}

#[tokio::test]
async fn add_then_show_round_trips_through_the_handler_map() {
    let map = register();
    let ctx = ctx();

    let add = map.get(&(GatewayKind::Mutate, "tasks", "add")).unwrap();
    let added = add(ctx.clone(), json!({ "title": "write docs", "description": "explain the gateway" })).await.unwrap();
    let task_id = added["id"].as_str().unwrap().to_string();

    let show = map.get(&(GatewayKind::Query, "tasks", "show")).unwrap();
    let shown = show(ctx, json!({ "taskId": task_id })).await.unwrap();
    assert_eq!(shown["title"], "write docs");
}

#[tokio::test]
async fn unknown_task_id_surfaces_not_found() {
    let map = register();
    let show = map.get(&(GatewayKind::Query, "tasks", "show")).unwrap();
    let err = show(ctx(), json!({ "taskId": "T999999" })).await.unwrap_err();
    assert_eq!(err.code, "E_NOT_FOUND");
}

#[tokio::test]
async fn session_start_then_focus_current_reports_the_focused_task() {
    let map = register();
    let ctx = ctx();

    let add = map.get(&(GatewayKind::Mutate, "tasks", "add")).unwrap();
    let added = add(ctx.clone(), json!({ "title": "fix bug", "description": "reproduce and patch" })).await.unwrap();
    let task_id = added["id"].as_str().unwrap().to_string();

    let start_session = map.get(&(GatewayKind::Mutate, "session", "start")).unwrap();
    let session = start_session(ctx.clone(), json!({ "scope": "global" })).await.unwrap();
    let session_id = session["id"].as_str().unwrap().to_string();

    let focus_start = map.get(&(GatewayKind::Mutate, "session", "focus.start")).unwrap();
    focus_start(ctx.clone(), json!({ "taskId": task_id, "sessionId": session_id })).await.unwrap();

    let focus_current = map.get(&(GatewayKind::Query, "session", "focus.current")).unwrap();
    let current = focus_current(ctx, json!({ "sessionId": session_id })).await.unwrap();
    assert_eq!(current["title"], "fix bug");
}

#[tokio::test]
async fn focus_current_without_an_active_session_is_a_validation_error() {
    let map = register();
    let focus_current = map.get(&(GatewayKind::Query, "session", "focus.current")).unwrap();
    let err = focus_current(ctx(), serde_json::Value::Null).await.unwrap_err();
    assert_eq!(err.code, "E_VALIDATION");
}

#[tokio::test]
async fn admin_health_reports_storage_ok() {
    let map = register();
    let health = map.get(&(GatewayKind::Query, "admin", "health")).unwrap();
    let report = health(ctx(), serde_json::Value::Null).await.unwrap();
    assert_eq!(report["storage_ok"], json!(true));
}

#[tokio::test]
async fn system_domain_aliases_the_admin_health_handler() {
    let map = register();
    assert!(std::ptr::eq(
        map.get(&(GatewayKind::Query, "admin", "health")).unwrap(),
        map.get(&(GatewayKind::Query, "system", "health")).unwrap(),
    ));
}

#[tokio::test]
async fn orchestrate_spawn_then_status_reports_the_job() {
    let map = register();
    let ctx = ctx();

    let spawn = map.get(&(GatewayKind::Mutate, "orchestrate", "spawn")).unwrap();
    let job = spawn(ctx.clone(), json!({ "operation": "sync" })).await.unwrap();
    let job_id = job["id"].as_str().unwrap().to_string();

    let status = map.get(&(GatewayKind::Query, "orchestrate", "status")).unwrap();
    let report = status(ctx, json!({ "jobId": job_id })).await.unwrap();
    assert_eq!(report["operation"], "sync");
}

#[tokio::test]
async fn release_bump_is_pure_and_needs_no_accessor_state() {
    let map = register();
    let bump = map.get(&(GatewayKind::Query, "release", "bump")).unwrap();
    let next = bump(ctx(), json!({ "current": "1.2.3", "kind": "minor" })).await.unwrap();
    assert_eq!(next["major"], 1);
    assert_eq!(next["minor"], 3);
    assert_eq!(next["patch"], 0);
}

#[tokio::test]
async fn research_domain_has_no_registered_operations() {
    let map = register();
    assert!(map.keys().all(|(_, domain, _)| *domain != "research"));
}
