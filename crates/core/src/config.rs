//! `config.json` schema (spec §6 "Config keys recognised").
//!
//! `#[serde(default)]` on every field so a partial or missing file degrades
//! to documented defaults (SPEC_FULL §6.2).

use serde::{Deserialize, Serialize};

use crate::lifecycle::EnforcementMode;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub require_session_note: bool,
    pub warn_on_no_focus: bool,
    pub session_timeout_hours: u32,
    pub auto_start_session: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            require_session_note: false,
            warn_on_no_focus: true,
            session_timeout_hours: 8,
            auto_start_session: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MultiSessionConfig {
    pub enabled: bool,
    pub max_concurrent_sessions: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LifecycleEnforcementConfig {
    pub mode: EnforcementMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtocolValidationConfig {
    pub strict_mode: bool,
    pub block_on_violation: bool,
    pub log_violations: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageEngineKind {
    Json,
    Sqlite,
    Dual,
}

impl Default for StorageEngineKind {
    fn default() -> Self {
        Self::Sqlite
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub engine: StorageEngineKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct GitCheckpointConfig {
    pub enabled: bool,
    pub debounce_minutes: u32,
    pub message_prefix: String,
    pub no_verify: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RateLimitingConfig {
    pub enabled: bool,
    pub query: u32,
    pub mutate: u32,
    pub spawn: u32,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self { enabled: true, query: 100, mutate: 30, spawn: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CleoConfig {
    pub session: SessionConfig,
    pub multi_session: MultiSessionConfig,
    pub lifecycle_enforcement: LifecycleEnforcementConfig,
    pub protocol_validation: ProtocolValidationConfig,
    pub storage: StorageConfig,
    pub git_checkpoint: GitCheckpointConfig,
    pub audit_log: bool,
    pub rate_limiting: RateLimitingConfig,
}

impl CleoConfig {
    pub fn from_json_str(s: &str) -> Result<Self, crate::error::CleoError> {
        serde_json::from_str(s).map_err(crate::error::CleoError::from)
    }

    pub fn to_json_pretty(&self) -> Result<String, crate::error::CleoError> {
        serde_json::to_string_pretty(self).map_err(crate::error::CleoError::from)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
