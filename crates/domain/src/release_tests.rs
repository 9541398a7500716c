use super::*;
use cleo_core::TaskUpdate;
use cleo_storage::JsonAccessor;
use tempfile::tempdir;

fn accessor() -> SafeAccessor {
    let dir = tempdir().unwrap();
    let inner = JsonAccessor::open(dir.path()).unwrap();
    SafeAccessor::new(Box::new(inner))
}

#[test]
fn parse_roundtrips_through_display() {
    let version = Version::parse("1.2.3").unwrap();
    assert_eq!(version.to_string(), "1.2.3");
}

#[test]
fn parse_accepts_a_leading_v() {
    let version = Version::parse("v2.0.0").unwrap();
    assert_eq!(version, Version { major: 2, minor: 0, patch: 0 });
}

#[test]
fn parse_rejects_malformed_input() {
    assert!(Version::parse("1.2").is_err());
    assert!(Version::parse("a.b.c").is_err());
}

#[test]
fn bump_patch_only_increments_patch() {
    let bumped = bump("1.2.3", BumpKind::Patch).unwrap();
    assert_eq!(bumped, Version { major: 1, minor: 2, patch: 4 });
}

#[test]
fn bump_minor_resets_patch() {
    let bumped = bump("1.2.3", BumpKind::Minor).unwrap();
    assert_eq!(bumped, Version { major: 1, minor: 3, patch: 0 });
}

#[test]
fn bump_major_resets_minor_and_patch() {
    let bumped = bump("1.2.3", BumpKind::Major).unwrap();
    assert_eq!(bumped, Version { major: 2, minor: 0, patch: 0 });
}

#[tokio::test]
async fn changelog_groups_only_done_tasks_by_phase() {
    let safe = accessor();
    let done = crate::tasks::add(
        &safe,
        crate::tasks::AddTaskParams { title: "shipped".into(), description: "d".into(), phase: Some("v1".into()), ..Default::default() },
    )
    .await
    .unwrap();
    crate::tasks::update(&safe, done.id, TaskUpdate { status: Some(cleo_core::TaskStatus::Active), ..Default::default() }, "t")
        .await
        .unwrap();
    crate::tasks::complete(&safe, done.id, "t").await.unwrap();

    let other_phase = crate::tasks::add(
        &safe,
        crate::tasks::AddTaskParams { title: "other".into(), description: "d".into(), phase: Some("v2".into()), ..Default::default() },
    )
    .await
    .unwrap();
    let _ = other_phase;

    let log = changelog(&safe, "v1").await.unwrap();
    assert_eq!(log.entries.len(), 1);
    assert_eq!(log.entries[0].task_id, done.id);
}

#[tokio::test]
async fn tag_reports_the_changelog_task_count() {
    let safe = accessor();
    let record = tag(&safe, "v1", Version { major: 1, minor: 0, patch: 0 }).await.unwrap();
    assert_eq!(record.task_count, 0);
    assert_eq!(record.tag, "v1");
}
