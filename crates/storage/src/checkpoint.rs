//! Git checkpointing (spec §6: "maintains an isolated `.cleo/.git` and
//! debounced commits of human-editable state; failure is never fatal").
//! Shells out to the `git` binary with `tokio::process::Command`, the way
//! the teacher's workspace/worktree management does (teacher:
//! `crates/engine/src/workspace.rs`), rather than pulling in a git library.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use cleo_core::GitCheckpointConfig;
use parking_lot::Mutex;
use tracing::warn;

/// Debounced wrapper around `git -C <cleo_home> commit` against an
/// isolated repo rooted at `cleo_home` (`<cleo_home>/.git`), separate from
/// any git repo the project itself lives in.
pub struct GitCheckpoint {
    cleo_home: PathBuf,
    config: GitCheckpointConfig,
    suppressed: bool,
    last_commit: Mutex<Option<Instant>>,
}

impl GitCheckpoint {
    pub fn new(cleo_home: PathBuf, config: GitCheckpointConfig, suppressed: bool) -> Self {
        Self { cleo_home, config, suppressed, last_commit: Mutex::new(None) }
    }

    /// Commit the current state of `cleo_home` if checkpointing is
    /// enabled, not suppressed (`GIT_CHECKPOINT_SUPPRESS`), and the
    /// debounce window has elapsed. Never propagates an error — a failed
    /// checkpoint is logged and swallowed, per spec.
    pub async fn maybe_checkpoint(&self, message: &str) {
        if !self.config.enabled || self.suppressed {
            return;
        }
        if !self.debounce_elapsed() {
            return;
        }
        if let Err(e) = self.commit(message).await {
            warn!(error = %e, "git checkpoint failed, continuing without it");
        }
    }

    fn debounce_elapsed(&self) -> bool {
        let mut last = self.last_commit.lock();
        let window = Duration::from_secs(u64::from(self.config.debounce_minutes) * 60);
        let due = last.map(|t| t.elapsed() >= window).unwrap_or(true);
        if due {
            *last = Some(Instant::now());
        }
        due
    }

    async fn commit(&self, message: &str) -> Result<(), String> {
        self.ensure_repo().await?;
        let dir = self.cleo_home.display().to_string();

        let mut add = tokio::process::Command::new("git");
        add.args(["-C", &dir, "add", "-A"]);
        run(add, "git add").await?;

        let full_message = format!("{}{}", self.config.message_prefix, message);
        let mut commit = tokio::process::Command::new("git");
        commit.args(["-C", &dir, "-c", "user.name=cleo", "-c", "user.email=cleo@localhost"]);
        commit.args(["commit", "--quiet", "--allow-empty", "-m", &full_message]);
        if self.config.no_verify {
            commit.arg("--no-verify");
        }
        run(commit, "git commit").await
    }

    async fn ensure_repo(&self) -> Result<(), String> {
        if self.cleo_home.join(".git").exists() {
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.cleo_home).await.map_err(|e| e.to_string())?;
        let dir = self.cleo_home.display().to_string();
        let mut init = tokio::process::Command::new("git");
        init.args(["init", "--quiet", &dir]);
        run(init, "git init").await
    }
}

async fn run(mut cmd: tokio::process::Command, label: &str) -> Result<(), String> {
    let output = cmd.output().await.map_err(|e| format!("{label}: {e}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("{label} failed: {}", stderr.trim()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
