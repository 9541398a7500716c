use super::*;
use cleo_core::AuditId;
use cleo_storage::JsonAccessor;
use tempfile::tempdir;

fn sample_row() -> AuditLogRow {
    AuditLogRow {
        id: AuditId::new(),
        timestamp: chrono::Utc::now(),
        action: "tasks.add".into(),
        task_id: Some("T1".into()),
        actor: "tester".into(),
        details: None,
        before: None,
        after: None,
        error: None,
    }
}

#[tokio::test]
async fn record_appends_to_both_the_accessor_and_the_standalone_file() {
    let dir = tempdir().unwrap();
    let inner = JsonAccessor::open(&dir.path().join("json")).unwrap();
    let accessor = SafeAccessor::new(Box::new(inner));
    let writer = AuditWriter::new(dir.path());

    writer.record(&accessor, &sample_row()).await.unwrap();
    writer.record(&accessor, &sample_row()).await.unwrap();

    let contents = std::fs::read_to_string(dir.path().join("audit-log.json")).unwrap();
    assert_eq!(contents.lines().count(), 2);
}

#[test]
fn rotation_keeps_only_the_most_recent_retained_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit-log.json");
    std::fs::write(&path, "{}\n").unwrap();

    for _ in 0..(RETAIN_ROTATED + 5) {
        force_rotate_for_test(&path).unwrap();
        std::fs::write(&path, "{}\n").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
    }

    let rotated_count = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("audit-log-"))
        .count();
    assert!(rotated_count <= RETAIN_ROTATED, "expected at most {RETAIN_ROTATED} rotated files, got {rotated_count}");
}
