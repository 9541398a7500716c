use super::*;
use chrono::Utc;
use cleo_core::{Priority, Provenance, Task, TaskStatus, TaskType, VerificationMeta};
use tempfile::tempdir;

fn sample_task(id: u64) -> Task {
    Task {
        id: TaskId::from_numeric(id),
        title: format!("task {id}"),
        description: "desc".into(),
        status: TaskStatus::Pending,
        priority: Priority::Medium,
        task_type: TaskType::Task,
        parent_id: None,
        phase: None,
        size: None,
        position: id as i64,
        position_version: 1,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        completed_at: None,
        cancelled_at: None,
        archived_at: None,
        archive_reason: None,
        cycle_time_days: None,
        provenance: Provenance { created_by: "system".into(), modified_by: "system".into(), session_id: None },
        labels: vec![],
        notes: vec![],
        acceptance_criteria: vec![],
        files: vec![],
        verification: VerificationMeta::default(),
    }
}

#[tokio::test]
async fn open_verifies_wal_mode() {
    let dir = tempdir().unwrap();
    let accessor = SqliteAccessor::open(&dir.path().join("tasks.db")).unwrap();
    let conn = accessor.conn.lock().await;
    let mode: String = conn.pragma_query_value(None, "journal_mode", |r| r.get(0)).unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[tokio::test]
async fn insert_and_get_task_round_trips() {
    let dir = tempdir().unwrap();
    let accessor = SqliteAccessor::open(&dir.path().join("tasks.db")).unwrap();
    let task = sample_task(1);
    accessor.insert_task(&task).await.unwrap();

    let fetched = accessor.get_task(TaskId::from_numeric(1)).await.unwrap().unwrap();
    assert_eq!(fetched.title, "task 1");
    assert_eq!(fetched.status, TaskStatus::Pending);
}

#[tokio::test]
async fn update_task_applies_only_present_fields() {
    let dir = tempdir().unwrap();
    let accessor = SqliteAccessor::open(&dir.path().join("tasks.db")).unwrap();
    accessor.insert_task(&sample_task(1)).await.unwrap();

    let update = TaskUpdate { status: Some(TaskStatus::Active), ..Default::default() };
    let updated = accessor.update_task(TaskId::from_numeric(1), &update).await.unwrap();
    assert_eq!(updated.status, TaskStatus::Active);
    assert_eq!(updated.title, "task 1");
}

#[tokio::test]
async fn dependency_and_relation_round_trip() {
    let dir = tempdir().unwrap();
    let accessor = SqliteAccessor::open(&dir.path().join("tasks.db")).unwrap();
    accessor.insert_task(&sample_task(1)).await.unwrap();
    accessor.insert_task(&sample_task(2)).await.unwrap();

    accessor
        .add_dependency(TaskDependency { task_id: TaskId::from_numeric(1), depends_on: TaskId::from_numeric(2) })
        .await
        .unwrap();
    let deps = accessor.list_dependencies(TaskId::from_numeric(1)).await.unwrap();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].depends_on, TaskId::from_numeric(2));

    let dependents = accessor.list_dependents(TaskId::from_numeric(2)).await.unwrap();
    assert_eq!(dependents.len(), 1);
}

#[tokio::test]
async fn task_file_round_trip_excludes_archived() {
    let dir = tempdir().unwrap();
    let accessor = SqliteAccessor::open(&dir.path().join("tasks.db")).unwrap();
    let mut archived = sample_task(1);
    archived.status = TaskStatus::Archived;
    accessor.insert_task(&archived).await.unwrap();
    accessor.insert_task(&sample_task(2)).await.unwrap();

    let file = accessor.load_task_file().await.unwrap();
    assert_eq!(file.tasks.len(), 1);
    assert_eq!(file.tasks[0].id, TaskId::from_numeric(2));
    assert_eq!(file.next_id, 3);
}

#[tokio::test]
async fn pipeline_creation_seeds_nine_stages() {
    let dir = tempdir().unwrap();
    let accessor = SqliteAccessor::open(&dir.path().join("tasks.db")).unwrap();
    accessor.insert_task(&sample_task(1)).await.unwrap();

    let pipeline = accessor.create_pipeline(TaskId::from_numeric(1)).await.unwrap();
    let stages = accessor.list_stages(pipeline.id).await.unwrap();
    assert_eq!(stages.len(), 9);
    assert_eq!(stages[0].stage_name, cleo_core::PipelineStage::Research);
}

#[tokio::test]
async fn current_session_pointer_round_trips() {
    let dir = tempdir().unwrap();
    let accessor = SqliteAccessor::open(&dir.path().join("tasks.db")).unwrap();
    assert!(accessor.current_session_id().await.unwrap().is_none());

    let id = SessionId::from_string("session_20260727_102030_abcdef");
    accessor.set_current_session_id(Some(id.clone())).await.unwrap();
    assert_eq!(accessor.current_session_id().await.unwrap(), Some(id));
}
