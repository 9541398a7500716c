use super::*;
use cleo_storage::JsonAccessor;
use tempfile::tempdir;

fn accessor() -> SafeAccessor {
    let dir = tempdir().unwrap();
    let inner = JsonAccessor::open(dir.path()).unwrap();
    SafeAccessor::new(Box::new(inner))
}

#[tokio::test]
async fn start_refuses_a_second_active_session_without_multi_session() {
    let safe = accessor();
    start(&safe, SessionScope::Global, None, None, false).await.unwrap();
    let err = start(&safe, SessionScope::Global, None, None, false).await.unwrap_err();
    assert_eq!(err.code, "E_ALREADY_EXISTS");
}

#[tokio::test]
async fn start_allows_a_second_session_once_multi_session_is_enabled() {
    let safe = accessor();
    start(&safe, SessionScope::Global, None, None, false).await.unwrap();
    let mut config = safe.load_config().await.unwrap();
    config.multi_session.enabled = true;
    safe.save_config(&config).await.unwrap();
    start(&safe, SessionScope::Global, None, None, false).await.unwrap();
}

#[tokio::test]
async fn end_requires_a_note_when_configured() {
    let safe = accessor();
    let session = start(&safe, SessionScope::Global, None, None, false).await.unwrap();
    let mut config = safe.load_config().await.unwrap();
    config.session.require_session_note = true;
    safe.save_config(&config).await.unwrap();
    let err = end(&safe, session.id.clone(), None, &config).await.unwrap_err();
    assert_eq!(err.code, "E_VALIDATION");
    end(&safe, session.id, Some("handoff note".into()), &config).await.unwrap();
}

#[tokio::test]
async fn close_is_blocked_while_tasks_in_scope_are_incomplete() {
    let safe = accessor();
    let pending = crate::tasks::add(&safe, crate::tasks::AddTaskParams {
        title: "t".into(),
        description: "d".into(),
        ..Default::default()
    })
    .await
    .unwrap();
    let session = start(&safe, SessionScope::Task { id: pending.id }, None, None, false).await.unwrap();
    let err = close(&safe, session.id.clone()).await.unwrap_err();
    assert_eq!(err.code, "E_SESSION_CLOSE_BLOCKED");
    crate::tasks::complete(&safe, pending.id, "tester").await.unwrap();
    close(&safe, session.id).await.unwrap();
}

#[tokio::test]
async fn suspend_then_resume_last_reactivates_the_session() {
    let safe = accessor();
    let session = start(&safe, SessionScope::Global, None, None, false).await.unwrap();
    suspend(&safe, session.id.clone()).await.unwrap();
    let resumed = resume(&safe, None).await.unwrap();
    assert_eq!(resumed.id, session.id);
    assert_eq!(resumed.status, SessionStatus::Active);
}

#[tokio::test]
async fn switch_updates_the_current_session_pointer() {
    let safe = accessor();
    let first = start(&safe, SessionScope::Global, None, None, false).await.unwrap();
    let mut config = safe.load_config().await.unwrap();
    config.multi_session.enabled = true;
    safe.save_config(&config).await.unwrap();
    let _second = start(&safe, SessionScope::Global, None, None, false).await.unwrap();
    switch(&safe, first.id.clone()).await.unwrap();
    assert_eq!(safe.current_session_id().await.unwrap(), Some(first.id));
}

#[tokio::test]
async fn grade_sets_the_flag_and_is_idempotent() {
    let safe = accessor();
    let session = start(&safe, SessionScope::Global, None, None, false).await.unwrap();
    assert!(!session.graded);
    let graded = grade(&safe, session.id.clone()).await.unwrap();
    assert!(graded.graded);
    let graded_again = grade(&safe, session.id).await.unwrap();
    assert!(graded_again.graded);
}
