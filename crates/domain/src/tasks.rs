//! `tasks` domain (spec §4.3): `add`, `show`, `update`, `complete`,
//! `delete`, `find`, `list`, `archive`, `labels.*`, `relations.*`,
//! `analyze`.

use chrono::Utc;
use cleo_core::{CleoError, ErrorKind, Priority, Task, TaskId, TaskStatus, TaskType, TaskUpdate};
use cleo_storage::{DataAccessor, SafeAccessor, TaskListFilter};
use serde::{Deserialize, Serialize};

/// Default result cap for `find`/`relations.suggest` (spec §4.3: "<=20
/// results default").
pub const FIND_DEFAULT_LIMIT: usize = 20;
/// `relations.suggest`'s own cap (SPEC_FULL §10).
pub const SUGGEST_LIMIT: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTaskParams {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub task_type: Option<TaskType>,
    #[serde(default)]
    pub parent_id: Option<TaskId>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub size: Option<cleo_core::TaskSize>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default = "default_actor")]
    pub actor: String,
    #[serde(default)]
    pub session_id: Option<cleo_core::SessionId>,
}

fn default_actor() -> String {
    "system".to_string()
}

/// Result of a mutation that may be a no-op (spec §4.8 idempotency
/// contract: `tasks.complete` on an already-done task succeeds with
/// `noChange=true`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMutation {
    pub task: Task,
    pub no_change: bool,
}

/// `tasks.add` (spec §4.3: "Creation enforces title != description and
/// forbids the addition of a child under a nonexistent parent").
pub async fn add(accessor: &SafeAccessor, params: AddTaskParams) -> Result<Task, CleoError> {
    Task::validate_title_description(&params.title, &params.description)?;

    let task_type = params.task_type.unwrap_or(TaskType::Task);
    if let Some(parent_id) = params.parent_id {
        let parent = accessor
            .get_task(parent_id)
            .await?
            .ok_or_else(|| CleoError::new("E_PARENT_NOT_FOUND", ErrorKind::NotFound, format!("parent task not found: {parent_id}")))?;
        if parent.task_type == TaskType::Subtask {
            return Err(CleoError::new(
                "E_MAX_DEPTH",
                ErrorKind::Conflict,
                format!("parent {parent_id} is itself a subtask; hierarchy is at most two levels deep"),
            ));
        }
    } else if task_type == TaskType::Subtask {
        return Err(CleoError::new(
            "E_PARENT_NOT_FOUND",
            ErrorKind::NotFound,
            "subtask requires an existing parentId",
        ));
    }

    let id = accessor.allocate_task_id().await?;
    let now = Utc::now();
    let task = Task {
        id,
        title: params.title,
        description: params.description,
        status: TaskStatus::Pending,
        priority: params.priority.unwrap_or(Priority::Medium),
        task_type,
        parent_id: params.parent_id,
        phase: params.phase,
        size: params.size,
        position: accessor.list_tasks(&TaskListFilter::default()).await?.len() as i64,
        position_version: 1,
        created_at: now,
        updated_at: now,
        completed_at: None,
        cancelled_at: None,
        archived_at: None,
        archive_reason: None,
        cycle_time_days: None,
        provenance: cleo_core::Provenance {
            created_by: params.actor.clone(),
            modified_by: params.actor,
            session_id: params.session_id,
        },
        labels: params.labels,
        notes: Vec::new(),
        acceptance_criteria: params.acceptance_criteria,
        files: params.files,
        verification: cleo_core::VerificationMeta::default(),
    };
    accessor.insert_task(&task).await?;
    Ok(task)
}

/// `tasks.show`.
pub async fn show(accessor: &SafeAccessor, id: TaskId) -> Result<Task, CleoError> {
    accessor.get_task(id).await?.ok_or_else(|| CleoError::not_found("task", &id.to_string()))
}

fn apply_status_transition(task: &mut Task, status: TaskStatus) -> Result<(), CleoError> {
    if !task.status.can_transition_to(status) {
        return Err(CleoError::validation(format!(
            "task {} cannot transition from {} to {status}",
            task.id, task.status
        )));
    }
    let now = Utc::now();
    match status {
        TaskStatus::Done => task.completed_at = Some(now),
        TaskStatus::Cancelled => task.cancelled_at = Some(now),
        TaskStatus::Archived => {
            task.archived_at = Some(now);
            let days = now.signed_duration_since(task.created_at).num_seconds() as f64 / 86_400.0;
            task.cycle_time_days = Some(days);
        }
        TaskStatus::Pending => {
            // reopen (done -> pending) / uncancel (cancelled -> pending).
            task.completed_at = None;
            task.cancelled_at = None;
        }
        _ => {}
    }
    task.status = status;
    Ok(())
}

/// `tasks.update`: applies a typed partial update (SPEC_FULL §10's
/// `TaskUpdate`); `Some` fields are applied, `None` fields are unchanged.
pub async fn update(accessor: &SafeAccessor, id: TaskId, update: TaskUpdate, actor: &str) -> Result<Task, CleoError> {
    let mut task = show(accessor, id).await?;

    let new_title = update.title.clone().unwrap_or_else(|| task.title.clone());
    let new_description = update.description.clone().unwrap_or_else(|| task.description.clone());
    if update.title.is_some() || update.description.is_some() {
        Task::validate_title_description(&new_title, &new_description)?;
    }
    task.title = new_title;
    task.description = new_description;

    if let Some(status) = update.status {
        apply_status_transition(&mut task, status)?;
    }
    if let Some(priority) = update.priority {
        task.priority = priority;
    }
    if let Some(phase) = update.phase {
        task.phase = Some(phase);
    }
    if let Some(size) = update.size {
        task.size = Some(size);
    }
    if let Some(labels) = update.labels {
        task.labels = labels;
    }
    if let Some(notes) = update.notes {
        task.notes = notes;
    }
    if let Some(ac) = update.acceptance_criteria {
        task.acceptance_criteria = ac;
    }
    if let Some(files) = update.files {
        task.files = files;
    }
    task.provenance.modified_by = actor.to_string();
    task.updated_at = Utc::now();
    accessor.replace_task(&task).await?;
    Ok(task)
}

/// `tasks.complete`: idempotent (spec §4.8 — a second call on an
/// already-done task succeeds with `noChange=true`).
pub async fn complete(accessor: &SafeAccessor, id: TaskId, actor: &str) -> Result<TaskMutation, CleoError> {
    let task = show(accessor, id).await?;
    if task.status == TaskStatus::Done {
        return Ok(TaskMutation { task, no_change: true });
    }
    let updated = update(
        accessor,
        id,
        TaskUpdate { status: Some(TaskStatus::Done), ..Default::default() },
        actor,
    )
    .await?;
    Ok(TaskMutation { task: updated, no_change: false })
}

/// `tasks.delete`: `E_NOT_FOUND` on a missing task (spec §4.8 idempotency
/// contract), `E_HAS_CHILDREN` when subtasks still reference it.
pub async fn delete(accessor: &SafeAccessor, id: TaskId) -> Result<(), CleoError> {
    show(accessor, id).await?;
    let children = accessor
        .list_tasks(&TaskListFilter { parent_id: Some(id), ..Default::default() })
        .await?;
    if !children.is_empty() {
        return Err(CleoError::new(
            "E_HAS_CHILDREN",
            ErrorKind::Conflict,
            format!("task {id} has {} child task(s); delete or reparent them first", children.len()),
        ));
    }
    accessor.delete_task(id).await
}

/// `tasks.find`: fuzzy, case-insensitive substring match across
/// id/title/description, capped at `limit` (default [`FIND_DEFAULT_LIMIT`]).
pub async fn find(accessor: &SafeAccessor, query: &str, limit: Option<usize>) -> Result<Vec<Task>, CleoError> {
    let needle = query.to_lowercase();
    let mut matches: Vec<Task> = accessor
        .list_tasks(&TaskListFilter::default())
        .await?
        .into_iter()
        .filter(|t| {
            t.id.to_string().to_lowercase().contains(&needle)
                || t.title.to_lowercase().contains(&needle)
                || t.description.to_lowercase().contains(&needle)
        })
        .collect();
    matches.truncate(limit.unwrap_or(FIND_DEFAULT_LIMIT));
    Ok(matches)
}

/// `tasks.list`.
pub async fn list(accessor: &SafeAccessor, filter: TaskListFilter) -> Result<Vec<Task>, CleoError> {
    accessor.list_tasks(&filter).await
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveFailure {
    pub task_id: TaskId,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveResult {
    pub succeeded: Vec<Task>,
    pub failed: Vec<ArchiveFailure>,
}

/// `tasks.archive`: single or batch, each with an optional reason (spec
/// §4.3). Partial failures are reported, not propagated (spec §4.7
/// "Partial batch").
pub async fn archive(accessor: &SafeAccessor, ids: Vec<TaskId>, reason: Option<String>) -> Result<ArchiveResult, CleoError> {
    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    for id in ids {
        match update(
            accessor,
            id,
            TaskUpdate { status: Some(TaskStatus::Archived), ..Default::default() },
            "system",
        )
        .await
        {
            Ok(mut task) => {
                task.archive_reason = reason.clone();
                accessor.replace_task(&task).await?;
                succeeded.push(task);
            }
            Err(error) => failed.push(ArchiveFailure { task_id: id, code: error.code.to_string(), message: error.message }),
        }
    }
    Ok(ArchiveResult { succeeded, failed })
}

// --- labels (SPEC_FULL §10) ---

pub mod labels {
    use std::collections::BTreeMap;

    use cleo_core::{CleoError, Task, TaskStatus};
    use cleo_storage::{DataAccessor, SafeAccessor, TaskListFilter};
    use serde::Serialize;

    pub async fn list(accessor: &SafeAccessor) -> Result<Vec<String>, CleoError> {
        let tasks = accessor.list_tasks(&TaskListFilter::default()).await?;
        let mut set: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        for task in tasks {
            set.extend(task.labels);
        }
        Ok(set.into_iter().collect())
    }

    pub async fn show(accessor: &SafeAccessor, label: &str) -> Result<Vec<Task>, CleoError> {
        Ok(accessor
            .list_tasks(&TaskListFilter::default())
            .await?
            .into_iter()
            .filter(|t| t.labels.iter().any(|l| l == label))
            .collect())
    }

    #[derive(Debug, Clone, Default, Serialize)]
    pub struct LabelStats {
        pub total: u32,
        pub by_status: BTreeMap<String, u32>,
    }

    /// Per-label task counts by status (SPEC_FULL §10, grounded on the
    /// `Statistics` aggregate-view pattern).
    pub async fn stats(accessor: &SafeAccessor) -> Result<BTreeMap<String, LabelStats>, CleoError> {
        let tasks = accessor.list_tasks(&TaskListFilter::default()).await?;
        let mut out: BTreeMap<String, LabelStats> = BTreeMap::new();
        for task in &tasks {
            for label in &task.labels {
                let entry = out.entry(label.clone()).or_default();
                entry.total += 1;
                *entry.by_status.entry(status_key(task.status)).or_insert(0) += 1;
            }
        }
        Ok(out)
    }

    fn status_key(status: TaskStatus) -> String {
        status.to_string()
    }
}

// --- dependencies / relations ---

pub mod dependencies {
    use std::collections::{HashSet, VecDeque};

    use cleo_core::{CleoError, TaskDependency, TaskId};
    use cleo_storage::{DataAccessor, SafeAccessor};

    /// Whether there is already a dependency path `from -> ... -> to`
    /// (spec §4.1/§8: "inserting (A,B) is rejected if B transitively
    /// depends on A" — i.e. a path `B -> ... -> A` already exists before
    /// adding `A -> B`).
    async fn path_exists(accessor: &SafeAccessor, from: TaskId, to: TaskId) -> Result<bool, CleoError> {
        if from == to {
            return Ok(true);
        }
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(from);
        seen.insert(from);
        while let Some(current) = queue.pop_front() {
            for dep in accessor.list_dependencies(current).await? {
                if dep.depends_on == to {
                    return Ok(true);
                }
                if seen.insert(dep.depends_on) {
                    queue.push_back(dep.depends_on);
                }
            }
        }
        Ok(false)
    }

    /// `tasks.dependencies.add` (spec §3, §8): rejects an edge that would
    /// create a cycle.
    pub async fn add(accessor: &SafeAccessor, task_id: TaskId, depends_on: TaskId) -> Result<(), CleoError> {
        accessor.get_task(task_id).await?.ok_or_else(|| CleoError::not_found("task", &task_id.to_string()))?;
        accessor.get_task(depends_on).await?.ok_or_else(|| CleoError::not_found("task", &depends_on.to_string()))?;
        if path_exists(accessor, depends_on, task_id).await? {
            return Err(CleoError::circular_dependency(&task_id.to_string(), &depends_on.to_string()));
        }
        accessor.add_dependency(TaskDependency { task_id, depends_on }).await
    }

    pub async fn list(accessor: &SafeAccessor, task_id: TaskId) -> Result<Vec<TaskDependency>, CleoError> {
        accessor.list_dependencies(task_id).await
    }
}

pub mod relations {
    use std::collections::{HashSet, VecDeque};

    use cleo_core::{CleoError, RelationType, TaskId, TaskRelation};
    use cleo_storage::{DataAccessor, SafeAccessor};

    use super::SUGGEST_LIMIT;

    pub async fn add(
        accessor: &SafeAccessor,
        task_id: TaskId,
        related_to: TaskId,
        relation_type: RelationType,
    ) -> Result<(), CleoError> {
        accessor.get_task(task_id).await?.ok_or_else(|| CleoError::not_found("task", &task_id.to_string()))?;
        accessor.get_task(related_to).await?.ok_or_else(|| CleoError::not_found("task", &related_to.to_string()))?;
        accessor.add_relation(TaskRelation { task_id, related_to, relation_type }).await
    }

    pub async fn list(accessor: &SafeAccessor, task_id: TaskId) -> Result<Vec<TaskRelation>, CleoError> {
        accessor.list_relations(task_id).await
    }

    /// `relations.discover` (SPEC_FULL §10): bounded-depth BFS over
    /// existing dependency edges from `task_id`, returning candidates
    /// sharing a label or parent that aren't already related.
    pub async fn discover(accessor: &SafeAccessor, task_id: TaskId, max_depth: u32) -> Result<Vec<TaskId>, CleoError> {
        let anchor = accessor.get_task(task_id).await?.ok_or_else(|| CleoError::not_found("task", &task_id.to_string()))?;
        let already_related: HashSet<TaskId> =
            accessor.list_relations(task_id).await?.into_iter().map(|r| r.related_to).collect();

        let mut seen = HashSet::new();
        seen.insert(task_id);
        let mut queue: VecDeque<(TaskId, u32)> = VecDeque::new();
        queue.push_back((task_id, 0));
        let mut candidates = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let mut neighbours = accessor.list_dependencies(current).await?.into_iter().map(|d| d.depends_on).collect::<Vec<_>>();
            neighbours.extend(accessor.list_dependents(current).await?.into_iter().map(|d| d.task_id));
            for next in neighbours {
                if !seen.insert(next) {
                    continue;
                }
                queue.push_back((next, depth + 1));
                if next == task_id || already_related.contains(&next) {
                    continue;
                }
                if let Some(candidate) = accessor.get_task(next).await? {
                    let shares_label = candidate.labels.iter().any(|l| anchor.labels.contains(l));
                    let shares_parent = candidate.parent_id.is_some() && candidate.parent_id == anchor.parent_id;
                    if shares_label || shares_parent {
                        candidates.push(next);
                    }
                }
            }
        }
        Ok(candidates)
    }

    /// `relations.suggest` (SPEC_FULL §10): `discover`'s candidates,
    /// sorted by shared-label count, capped at [`SUGGEST_LIMIT`].
    pub async fn suggest(accessor: &SafeAccessor, task_id: TaskId) -> Result<Vec<TaskId>, CleoError> {
        let anchor = accessor.get_task(task_id).await?.ok_or_else(|| CleoError::not_found("task", &task_id.to_string()))?;
        let candidates = discover(accessor, task_id, 2).await?;
        let mut scored = Vec::new();
        for candidate_id in candidates {
            if let Some(candidate) = accessor.get_task(candidate_id).await? {
                let shared = candidate.labels.iter().filter(|l| anchor.labels.contains(l)).count();
                scored.push((shared, candidate_id));
            }
        }
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.truncate(SUGGEST_LIMIT);
        Ok(scored.into_iter().map(|(_, id)| id).collect())
    }
}

// --- analyze (SPEC_FULL §10) ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAnalysis {
    pub task_id: TaskId,
    pub leverage_score: f64,
    pub blocking_count: u32,
    pub blocked_by_count: u32,
    pub age_days: f64,
    pub is_critical_path: bool,
}

/// `tasks.analyze` (SPEC_FULL §10): `leverage_score = blocking_count *
/// priority_weight(priority)` — a task's leverage is how many other tasks
/// it unblocks, weighted by its own priority.
pub async fn analyze(accessor: &SafeAccessor, task_id: TaskId) -> Result<TaskAnalysis, CleoError> {
    let task = show(accessor, task_id).await?;
    let blocking_count = accessor.list_dependents(task_id).await?.len() as u32;
    let blocked_by_count = accessor.list_dependencies(task_id).await?.len() as u32;
    let age_days = Utc::now().signed_duration_since(task.created_at).num_seconds() as f64 / 86_400.0;
    Ok(TaskAnalysis {
        task_id,
        leverage_score: blocking_count as f64 * task.priority.weight(),
        blocking_count,
        blocked_by_count,
        age_days,
        is_critical_path: blocking_count > 0 && blocked_by_count == 0,
    })
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
