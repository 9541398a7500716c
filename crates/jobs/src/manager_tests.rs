use super::*;
use cleo_storage::JsonAccessor;
use tempfile::tempdir;

fn manager(cap: usize) -> JobManager {
    let dir = tempdir().unwrap();
    let accessor = Arc::new(SafeAccessor::new(Box::new(JsonAccessor::open(dir.path()).unwrap())));
    JobManager::with_limits(accessor, cap, DEFAULT_RETENTION)
}

#[tokio::test]
async fn start_inserts_a_running_job() {
    let mgr = manager(10);
    let job = mgr.start("orchestrate.spawn").await.unwrap();
    assert_eq!(job.status, BackgroundJobStatus::Running);
    assert_eq!(job.progress, 0);
    assert!(mgr.cancellation_token(job.id).is_some());
}

#[tokio::test]
async fn starting_above_the_cap_fails_with_job_limit() {
    let mgr = manager(1);
    mgr.start("first").await.unwrap();
    let err = mgr.start("second").await.unwrap_err();
    assert_eq!(err.code, "E_JOB_LIMIT");
}

#[tokio::test]
async fn update_progress_clamps_above_100() {
    let mgr = manager(10);
    let job = mgr.start("op").await.unwrap();
    let updated = mgr.update_progress(job.id, 255).await.unwrap();
    assert_eq!(updated.progress, 100);
}

#[tokio::test]
async fn cancel_fires_the_token_and_frees_a_cap_slot() {
    let mgr = manager(1);
    let job = mgr.start("op").await.unwrap();
    let token = mgr.cancellation_token(job.id).unwrap();
    let cancelled = mgr.cancel(job.id).await.unwrap();
    assert_eq!(cancelled.status, BackgroundJobStatus::Cancelled);
    assert!(token.is_cancelled());
    assert!(mgr.cancellation_token(job.id).is_none());
    mgr.start("another").await.unwrap();
}

#[tokio::test]
async fn complete_sets_progress_to_100_and_removes_handle() {
    let mgr = manager(10);
    let job = mgr.start("op").await.unwrap();
    let done = mgr.complete(job.id, Some(serde_json::json!({"ok": true}))).await.unwrap();
    assert_eq!(done.status, BackgroundJobStatus::Completed);
    assert_eq!(done.progress, 100);
    assert!(mgr.cancellation_token(job.id).is_none());
}

#[tokio::test]
async fn sweep_removes_terminal_jobs_past_retention_but_keeps_fresh_ones() {
    let dir = tempdir().unwrap();
    let accessor = Arc::new(SafeAccessor::new(Box::new(JsonAccessor::open(dir.path()).unwrap())));
    let old_job = BackgroundJob {
        id: BackgroundJobId::new(),
        operation: "old".into(),
        status: BackgroundJobStatus::Completed,
        started_at: chrono::Utc::now() - chrono::Duration::hours(2),
        completed_at: Some(chrono::Utc::now() - chrono::Duration::hours(2)),
        result: None,
        error: None,
        progress: 100,
    };
    let fresh_job = BackgroundJob {
        id: BackgroundJobId::new(),
        operation: "fresh".into(),
        status: BackgroundJobStatus::Completed,
        started_at: chrono::Utc::now(),
        completed_at: Some(chrono::Utc::now()),
        result: None,
        error: None,
        progress: 100,
    };
    accessor.insert_job(&old_job).await.unwrap();
    accessor.insert_job(&fresh_job).await.unwrap();

    let handles = Mutex::new(HashMap::new());
    sweep_once(&accessor, &handles, Duration::from_secs(3600)).await.unwrap();

    let remaining = accessor.list_jobs().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, fresh_job.id);
}
