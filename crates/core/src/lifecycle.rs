//! Lifecycle pipeline data model (spec §3, §4.4). The stage machine
//! (prerequisites, transition rules) lives in `cleo-lifecycle`; this module
//! only holds the aggregate shapes every crate needs to pass around.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::TaskId;
use crate::simple_display;

/// The nine canonical pipeline stages, in order (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Research,
    Consensus,
    Adr,
    Spec,
    Decompose,
    Implement,
    Verify,
    Test,
    Release,
}

simple_display! {
    PipelineStage {
        Research => "research",
        Consensus => "consensus",
        Adr => "adr",
        Spec => "spec",
        Decompose => "decompose",
        Implement => "implement",
        Verify => "verify",
        Test => "test",
        Release => "release",
    }
}

impl PipelineStage {
    /// All nine stages in canonical (sequence) order.
    pub const ORDERED: [PipelineStage; 9] = [
        PipelineStage::Research,
        PipelineStage::Consensus,
        PipelineStage::Adr,
        PipelineStage::Spec,
        PipelineStage::Decompose,
        PipelineStage::Implement,
        PipelineStage::Verify,
        PipelineStage::Test,
        PipelineStage::Release,
    ];

    pub fn sequence(self) -> u8 {
        Self::ORDERED.iter().position(|s| *s == self).expect("stage in ORDERED") as u8
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "research" => Self::Research,
            "consensus" => Self::Consensus,
            "adr" => Self::Adr,
            "spec" => Self::Spec,
            "decompose" => Self::Decompose,
            "implement" => Self::Implement,
            "verify" => Self::Verify,
            "test" => Self::Test,
            "release" => Self::Release,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Active,
    Completed,
    Aborted,
}

simple_display! {
    PipelineStatus {
        Active => "active",
        Completed => "completed",
        Aborted => "aborted",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
    Blocked,
    Failed,
}

simple_display! {
    StageStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Skipped => "skipped",
        Blocked => "blocked",
        Failed => "failed",
    }
}

impl StageStatus {
    /// A stage that has been completed or deliberately skipped satisfies
    /// another stage's prerequisite (spec §4.4).
    pub fn satisfies_prerequisite(self) -> bool {
        matches!(self, StageStatus::Completed | StageStatus::Skipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    Pass,
    Fail,
    Warn,
}

simple_display! {
    GateOutcome {
        Pass => "pass",
        Fail => "fail",
        Warn => "warn",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    File,
    Url,
    Manifest,
}

simple_display! {
    EvidenceType {
        File => "file",
        Url => "url",
        Manifest => "manifest",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    Automatic,
    Manual,
    Forced,
}

simple_display! {
    TransitionType {
        Automatic => "automatic",
        Manual => "manual",
        Forced => "forced",
    }
}

/// One lifecycle pipeline per task (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecyclePipeline {
    pub id: i64,
    pub task_id: TaskId,
    pub status: PipelineStatus,
    pub current_stage_id: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleStageRow {
    pub id: i64,
    pub pipeline_id: i64,
    pub stage_name: PipelineStage,
    pub sequence: u8,
    pub status: StageStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub blocked_at: Option<DateTime<Utc>>,
    pub skipped_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateResult {
    pub id: i64,
    pub stage_id: i64,
    pub gate_name: String,
    pub result: GateOutcome,
    pub checked_by: String,
    pub details: Option<String>,
    pub reason: Option<String>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub id: i64,
    pub stage_id: i64,
    pub uri: String,
    pub evidence_type: EvidenceType,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub id: i64,
    pub pipeline_id: i64,
    pub from_stage_id: Option<i64>,
    pub to_stage_id: i64,
    pub transition_type: TransitionType,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle enforcement mode (spec §6 config key `lifecycleEnforcement.mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMode {
    Strict,
    Advisory,
    #[default]
    Off,
}

impl EnforcementMode {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "strict" => Self::Strict,
            "advisory" => Self::Advisory,
            "off" => Self::Off,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_stages_match_sequence_index() {
        for (i, stage) in PipelineStage::ORDERED.iter().enumerate() {
            assert_eq!(stage.sequence() as usize, i);
        }
    }

    #[test]
    fn research_is_first_release_is_last() {
        assert_eq!(PipelineStage::ORDERED[0], PipelineStage::Research);
        assert_eq!(PipelineStage::ORDERED[8], PipelineStage::Release);
    }

    #[test]
    fn stage_satisfies_prerequisite_only_when_completed_or_skipped() {
        assert!(StageStatus::Completed.satisfies_prerequisite());
        assert!(StageStatus::Skipped.satisfies_prerequisite());
        assert!(!StageStatus::Pending.satisfies_prerequisite());
        assert!(!StageStatus::Blocked.satisfies_prerequisite());
    }
}
