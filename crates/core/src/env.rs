//! Single-source-of-truth environment snapshot (SPEC_FULL §6.2), read once
//! at startup instead of scattering `std::env::var` calls through the
//! codebase (teacher precedent: `daemon/src/env.rs`).

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Env {
    pub cleo_home: PathBuf,
    pub cleo_session_id: Option<String>,
    pub cleo_root: Option<PathBuf>,
    pub no_color: bool,
    pub force_color: bool,
    pub git_checkpoint_suppress: bool,
}

impl Env {
    pub fn load() -> Self {
        Self::from_vars(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary lookup function so tests can inject a
    /// deterministic environment instead of mutating process state.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let cleo_home = get("CLEO_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".cleo")))
            .unwrap_or_else(|| PathBuf::from(".cleo"));

        Self {
            cleo_home,
            cleo_session_id: get("CLEO_SESSION_ID"),
            cleo_root: get("CLEO_ROOT").map(PathBuf::from),
            no_color: get("NO_COLOR").is_some(),
            force_color: get("FORCE_COLOR").is_some(),
            git_checkpoint_suppress: get("GIT_CHECKPOINT_SUPPRESS").is_some(),
        }
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
