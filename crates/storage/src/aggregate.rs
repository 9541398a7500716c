//! Whole-aggregate shapes the Data Accessor trades in (spec §4.2).

use cleo_core::{Session, SessionId, Task, TaskDependency, TaskRelation, TaskWorkEntry};
use serde::{Deserialize, Serialize};

/// Everything `loadTaskFile`/`saveTaskFile` round-trips: live tasks plus
/// their edges and focus history, and the next `T<n>` to allocate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFile {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub dependencies: Vec<TaskDependency>,
    #[serde(default)]
    pub relations: Vec<TaskRelation>,
    #[serde(default)]
    pub task_work: Vec<TaskWorkEntry>,
    pub next_id: u64,
}

/// Archived tasks live in a separate aggregate (spec §6 persisted layout
/// lists `tasks.db` and rolling snapshots but archival is logically
/// distinct storage, mirrored for the JSON engine as its own file).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveFile {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionsFile {
    pub sessions: Vec<Session>,
    pub current_session_id: Option<SessionId>,
}
