//! Task dependency and relation edges (spec §3).

use serde::{Deserialize, Serialize};

use crate::id::TaskId;
use crate::simple_display;

/// Composite-key edge: `task_id` depends on `depends_on`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDependency {
    pub task_id: TaskId,
    pub depends_on: TaskId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Related,
    Blocks,
    Duplicates,
}

simple_display! {
    RelationType {
        Related => "related",
        Blocks => "blocks",
        Duplicates => "duplicates",
    }
}

impl RelationType {
    pub const ALL: &'static [&'static str] = &["related", "blocks", "duplicates"];

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "related" => Self::Related,
            "blocks" => Self::Blocks,
            "duplicates" => Self::Duplicates,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRelation {
    pub task_id: TaskId,
    pub related_to: TaskId,
    pub relation_type: RelationType,
}
