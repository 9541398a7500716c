use super::*;
use cleo_core::GitCheckpointConfig;
use tempfile::tempdir;

fn enabled_config() -> GitCheckpointConfig {
    GitCheckpointConfig { enabled: true, debounce_minutes: 0, message_prefix: "cleo: ".into(), no_verify: true }
}

#[tokio::test]
async fn disabled_checkpoint_never_creates_a_repo() {
    let dir = tempdir().unwrap();
    let cleo_home = dir.path().join("cleo");
    let checkpoint = GitCheckpoint::new(cleo_home.clone(), GitCheckpointConfig::default(), false);
    checkpoint.maybe_checkpoint("tasks.add").await;
    assert!(!cleo_home.join(".git").exists());
}

#[tokio::test]
async fn suppressed_checkpoint_never_creates_a_repo() {
    let dir = tempdir().unwrap();
    let cleo_home = dir.path().join("cleo");
    let checkpoint = GitCheckpoint::new(cleo_home.clone(), enabled_config(), true);
    checkpoint.maybe_checkpoint("tasks.add").await;
    assert!(!cleo_home.join(".git").exists());
}

#[tokio::test]
async fn enabled_checkpoint_initialises_an_isolated_repo_and_commits() {
    let dir = tempdir().unwrap();
    let cleo_home = dir.path().join("cleo");
    std::fs::create_dir_all(&cleo_home).unwrap();
    std::fs::write(cleo_home.join("config.json"), "{}").unwrap();

    let checkpoint = GitCheckpoint::new(cleo_home.clone(), enabled_config(), false);
    checkpoint.maybe_checkpoint("tasks.add").await;

    assert!(cleo_home.join(".git").exists());
}

#[tokio::test]
async fn debounce_skips_a_second_checkpoint_within_the_window() {
    let dir = tempdir().unwrap();
    let cleo_home = dir.path().join("cleo");
    std::fs::create_dir_all(&cleo_home).unwrap();

    let config = GitCheckpointConfig { debounce_minutes: 60, ..enabled_config() };
    let checkpoint = GitCheckpoint::new(cleo_home.clone(), config, false);
    assert!(checkpoint.debounce_elapsed());
    assert!(!checkpoint.debounce_elapsed());
}
