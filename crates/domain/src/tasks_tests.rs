use super::*;
use cleo_core::RelationType;
use cleo_storage::JsonAccessor;
use tempfile::tempdir;

fn accessor() -> SafeAccessor {
    let dir = tempdir().unwrap();
    let inner = JsonAccessor::open(dir.path()).unwrap();
    SafeAccessor::new(Box::new(inner))
}

fn add_params(title: &str) -> AddTaskParams {
    AddTaskParams { title: title.to_string(), description: "desc".to_string(), ..Default::default() }
}

#[tokio::test]
async fn add_allocates_sequential_ids() {
    let safe = accessor();
    let first = add(&safe, add_params("first")).await.unwrap();
    let second = add(&safe, add_params("second")).await.unwrap();
    assert_eq!(first.id.numeric() + 1, second.id.numeric());
}

#[tokio::test]
async fn add_rejects_identical_title_and_description() {
    let safe = accessor();
    let err = add(&safe, AddTaskParams { title: "same".into(), description: "same".into(), ..Default::default() })
        .await
        .unwrap_err();
    assert_eq!(err.code, "E_VALIDATION");
}

#[tokio::test]
async fn add_subtask_without_parent_is_rejected() {
    let safe = accessor();
    let err = add(
        &safe,
        AddTaskParams { title: "sub".into(), description: "d".into(), task_type: Some(TaskType::Subtask), ..Default::default() },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code, "E_PARENT_NOT_FOUND");
}

#[tokio::test]
async fn add_subtask_under_a_subtask_is_rejected_at_max_depth() {
    let safe = accessor();
    let parent = add(&safe, add_params("parent")).await.unwrap();
    let child = add(
        &safe,
        AddTaskParams {
            title: "child".into(),
            description: "d".into(),
            task_type: Some(TaskType::Subtask),
            parent_id: Some(parent.id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let err = add(
        &safe,
        AddTaskParams {
            title: "grandchild".into(),
            description: "d".into(),
            task_type: Some(TaskType::Subtask),
            parent_id: Some(child.id),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code, "E_MAX_DEPTH");
}

#[tokio::test]
async fn complete_is_idempotent() {
    let safe = accessor();
    let task = add(&safe, add_params("t")).await.unwrap();
    update(&safe, task.id, TaskUpdate { status: Some(TaskStatus::Active), ..Default::default() }, "tester").await.unwrap();
    let first = complete(&safe, task.id, "tester").await.unwrap();
    assert!(!first.no_change);
    let second = complete(&safe, task.id, "tester").await.unwrap();
    assert!(second.no_change);
}

#[tokio::test]
async fn update_rejects_illegal_status_transition() {
    let safe = accessor();
    let task = add(&safe, add_params("t")).await.unwrap();
    let err = update(&safe, task.id, TaskUpdate { status: Some(TaskStatus::Done), ..Default::default() }, "tester")
        .await
        .unwrap_err();
    assert_eq!(err.code, "E_VALIDATION");
}

#[tokio::test]
async fn delete_rejects_a_task_with_children() {
    let safe = accessor();
    let parent = add(&safe, add_params("parent")).await.unwrap();
    add(
        &safe,
        AddTaskParams { title: "child".into(), description: "d".into(), parent_id: Some(parent.id), ..Default::default() },
    )
    .await
    .unwrap();
    let err = delete(&safe, parent.id).await.unwrap_err();
    assert_eq!(err.code, "E_HAS_CHILDREN");
}

#[tokio::test]
async fn find_matches_case_insensitive_substrings() {
    let safe = accessor();
    add(&safe, add_params("Fix Login Bug")).await.unwrap();
    add(&safe, add_params("Unrelated")).await.unwrap();
    let found = find(&safe, "login", None).await.unwrap();
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn dependencies_add_rejects_a_cycle() {
    let safe = accessor();
    let a = add(&safe, add_params("a")).await.unwrap();
    let b = add(&safe, add_params("b")).await.unwrap();
    dependencies::add(&safe, a.id, b.id).await.unwrap();
    let err = dependencies::add(&safe, b.id, a.id).await.unwrap_err();
    assert_eq!(err.code, "E_CIRCULAR_DEPENDENCY");
}

#[tokio::test]
async fn dependencies_add_rejects_self_reference() {
    let safe = accessor();
    let a = add(&safe, add_params("a")).await.unwrap();
    let err = dependencies::add(&safe, a.id, a.id).await.unwrap_err();
    assert_eq!(err.code, "E_CIRCULAR_DEPENDENCY");
}

#[tokio::test]
async fn relations_discover_surfaces_shared_label_tasks() {
    let safe = accessor();
    let mut a = add(&safe, add_params("a")).await.unwrap();
    a.labels = vec!["backend".into()];
    update(&safe, a.id, TaskUpdate { labels: Some(a.labels.clone()), ..Default::default() }, "tester").await.unwrap();
    let b = add(&safe, add_params("b")).await.unwrap();
    update(&safe, b.id, TaskUpdate { labels: Some(vec!["backend".into()]), ..Default::default() }, "tester")
        .await
        .unwrap();
    dependencies::add(&safe, a.id, b.id).await.unwrap();
    let discovered = relations::discover(&safe, a.id, 2).await.unwrap();
    assert!(discovered.contains(&b.id));
}

#[tokio::test]
async fn relations_add_requires_both_tasks_to_exist() {
    let safe = accessor();
    let a = add(&safe, add_params("a")).await.unwrap();
    let err = relations::add(&safe, a.id, TaskId::from_numeric(999), RelationType::Related).await.unwrap_err();
    assert_eq!(err.code, "E_NOT_FOUND");
}

#[tokio::test]
async fn labels_stats_counts_per_status() {
    let safe = accessor();
    let a = add(&safe, add_params("a")).await.unwrap();
    update(&safe, a.id, TaskUpdate { labels: Some(vec!["urgent".into()]), ..Default::default() }, "tester")
        .await
        .unwrap();
    let stats = labels::stats(&safe).await.unwrap();
    assert_eq!(stats.get("urgent").unwrap().total, 1);
}

#[tokio::test]
async fn analyze_reports_zero_leverage_for_an_unblocked_leaf() {
    let safe = accessor();
    let a = add(&safe, add_params("a")).await.unwrap();
    let analysis = analyze(&safe, a.id).await.unwrap();
    assert_eq!(analysis.blocking_count, 0);
    assert_eq!(analysis.leverage_score, 0.0);
}
