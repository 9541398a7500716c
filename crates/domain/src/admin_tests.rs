use super::*;
use cleo_storage::JsonAccessor;
use tempfile::tempdir;

fn accessor() -> SafeAccessor {
    let dir = tempdir().unwrap();
    let inner = JsonAccessor::open(dir.path()).unwrap();
    SafeAccessor::new(Box::new(inner))
}

#[tokio::test]
async fn dashboard_counts_tasks_by_status() {
    let safe = accessor();
    crate::tasks::add(&safe, crate::tasks::AddTaskParams { title: "a".into(), description: "d".into(), ..Default::default() })
        .await
        .unwrap();
    let board = dashboard(&safe).await.unwrap();
    assert_eq!(board.total_tasks, 1);
    assert_eq!(*board.by_status.get("pending").unwrap(), 1);
}

#[tokio::test]
async fn health_is_ok_with_no_current_session() {
    let safe = accessor();
    let report = health(&safe).await.unwrap();
    assert!(report.storage_ok);
    assert!(report.current_session.is_none());
}

#[tokio::test]
async fn config_round_trips() {
    let safe = accessor();
    let mut config = config_get(&safe).await.unwrap();
    config.audit_log = true;
    config_set(&safe, config.clone()).await.unwrap();
    let reloaded = config_get(&safe).await.unwrap();
    assert_eq!(reloaded, config);
}

#[tokio::test]
async fn safe_stop_is_a_no_op_without_an_active_session() {
    let safe = accessor();
    let stopped = safe_stop(&safe, None).await.unwrap();
    assert!(stopped.is_none());
}

#[tokio::test]
async fn safe_stop_ends_the_active_session_with_a_handoff_note() {
    let safe = accessor();
    let session = crate::session::start(&safe, cleo_core::SessionScope::Global, None, None, false).await.unwrap();
    let stopped = safe_stop(&safe, Some("handing off".into())).await.unwrap().unwrap();
    assert_eq!(stopped.id, session.id);
    assert_eq!(stopped.handoff.as_deref(), Some("handing off"));
    assert!(safe.current_session_id().await.unwrap().is_none());
}

#[tokio::test]
async fn status_funnel_includes_every_status_key() {
    let safe = accessor();
    let funnel = status_funnel(&safe).await.unwrap();
    assert_eq!(funnel.len(), 6);
}
