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
async fn writes_land_in_both_engines() {
    let dir = tempdir().unwrap();
    let accessor = DualAccessor::open(&dir.path().join("tasks.db"), &dir.path().join("json")).unwrap();
    accessor.insert_task(&sample_task(1)).await.unwrap();

    assert!(accessor.sqlite.get_task(TaskId::from_numeric(1)).await.unwrap().is_some());
    assert!(accessor.json.get_task(TaskId::from_numeric(1)).await.unwrap().is_some());
}

#[tokio::test]
async fn reads_prefer_sqlite() {
    let dir = tempdir().unwrap();
    let accessor = DualAccessor::open(&dir.path().join("tasks.db"), &dir.path().join("json")).unwrap();
    accessor.sqlite.insert_task(&sample_task(1)).await.unwrap();

    let task = accessor.get_task(TaskId::from_numeric(1)).await.unwrap();
    assert!(task.is_some());
}
