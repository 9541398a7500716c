use super::*;
use cleo_storage::JsonAccessor;
use tempfile::tempdir;

fn accessor() -> SafeAccessor {
    let dir = tempdir().unwrap();
    let inner = JsonAccessor::open(dir.path()).unwrap();
    SafeAccessor::new(Box::new(inner))
}

async fn seed_task(safe: &SafeAccessor) -> TaskId {
    crate::tasks::add(safe, crate::tasks::AddTaskParams { title: "t".into(), description: "d".into(), ..Default::default() })
        .await
        .unwrap()
        .id
}

async fn seed_session(safe: &SafeAccessor) -> SessionId {
    crate::session::start(safe, cleo_core::SessionScope::Global, None, None, false).await.unwrap().id
}

#[tokio::test]
async fn current_without_an_open_focus_requires_focus() {
    let safe = accessor();
    let session_id = seed_session(&safe).await;
    let err = current(&safe, &session_id).await.unwrap_err();
    assert_eq!(err.code, "E_FOCUS_REQUIRED");
}

#[tokio::test]
async fn start_then_current_returns_the_focused_task() {
    let safe = accessor();
    let session_id = seed_session(&safe).await;
    let task_id = seed_task(&safe).await;
    start(&safe, &session_id, task_id).await.unwrap();
    let focused = current(&safe, &session_id).await.unwrap();
    assert_eq!(focused.id, task_id);
}

#[tokio::test]
async fn starting_a_second_focus_closes_the_first() {
    let safe = accessor();
    let session_id = seed_session(&safe).await;
    let first = seed_task(&safe).await;
    let second = seed_task(&safe).await;
    start(&safe, &session_id, first).await.unwrap();
    start(&safe, &session_id, second).await.unwrap();
    let history = history(&safe, &session_id).await.unwrap();
    let first_row = history.iter().find(|e| e.task_id == first).unwrap();
    assert!(!first_row.is_open());
    let current_task = current(&safe, &session_id).await.unwrap();
    assert_eq!(current_task.id, second);
}

#[tokio::test]
async fn stop_clears_the_open_focus() {
    let safe = accessor();
    let session_id = seed_session(&safe).await;
    let task_id = seed_task(&safe).await;
    start(&safe, &session_id, task_id).await.unwrap();
    stop(&safe, &session_id).await.unwrap();
    let err = current(&safe, &session_id).await.unwrap_err();
    assert_eq!(err.code, "E_FOCUS_REQUIRED");
}
