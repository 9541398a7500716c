//! Task/dependency/relation row operations (spec §3, §4.3).

use rusqlite::{params, Connection};

use cleo_core::{CleoError, Task, TaskDependency, TaskId, TaskRelation, TaskUpdate};

use super::convert::task_from_row;
use crate::accessor::TaskListFilter;
use crate::rusqlite_err;

pub(crate) fn insert_task(conn: &Connection, task: &Task) -> Result<(), CleoError> {
    conn.execute(
        "INSERT INTO tasks (id, title, description, status, priority, task_type, parent_id, phase,
            size, position, position_version, created_at, updated_at, completed_at, cancelled_at,
            archived_at, archive_reason, cycle_time_days, created_by, modified_by, session_id,
            labels, notes, acceptance_criteria, files, verification)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22,?23,?24,?25,?26)",
        params![
            task.id.numeric() as i64,
            task.title,
            task.description,
            task.status.to_string(),
            task.priority.to_string(),
            task.task_type.to_string(),
            task.parent_id.map(|p| p.numeric() as i64),
            task.phase,
            task.size.map(|s| s.to_string()),
            task.position,
            task.position_version,
            task.created_at.to_rfc3339(),
            task.updated_at.to_rfc3339(),
            task.completed_at.map(|d| d.to_rfc3339()),
            task.cancelled_at.map(|d| d.to_rfc3339()),
            task.archived_at.map(|d| d.to_rfc3339()),
            task.archive_reason,
            task.cycle_time_days,
            task.provenance.created_by,
            task.provenance.modified_by,
            task.provenance.session_id.as_ref().map(|s| s.as_str().to_string()),
            serde_json::to_string(&task.labels).unwrap_or_default(),
            serde_json::to_string(&task.notes).unwrap_or_default(),
            serde_json::to_string(&task.acceptance_criteria).unwrap_or_default(),
            serde_json::to_string(&task.files).unwrap_or_default(),
            serde_json::to_string(&task.verification).unwrap_or_default(),
        ],
    )
    .map_err(rusqlite_err)?;
    Ok(())
}

pub(crate) fn get_task(conn: &Connection, id: TaskId) -> Result<Option<Task>, CleoError> {
    conn.query_row("SELECT * FROM tasks WHERE id = ?1", params![id.numeric() as i64], task_from_row)
        .map(Some)
        .or_else(|e| if matches!(e, rusqlite::Error::QueryReturnedNoRows) { Ok(None) } else { Err(e) })
        .map_err(rusqlite_err)
}

pub(crate) fn replace_task(conn: &Connection, task: &Task) -> Result<(), CleoError> {
    conn.execute("DELETE FROM tasks WHERE id = ?1", params![task.id.numeric() as i64]).map_err(rusqlite_err)?;
    insert_task(conn, task)
}

pub(crate) fn delete_task(conn: &Connection, id: TaskId) -> Result<(), CleoError> {
    conn.execute("DELETE FROM tasks WHERE id = ?1", params![id.numeric() as i64]).map_err(rusqlite_err)?;
    Ok(())
}

pub(crate) fn update_task(conn: &Connection, id: TaskId, update: &TaskUpdate) -> Result<Task, CleoError> {
    let mut task = get_task(conn, id)?.ok_or_else(|| CleoError::not_found("task", &id.to_string()))?;

    if let Some(title) = &update.title {
        task.title = title.clone();
    }
    if let Some(description) = &update.description {
        task.description = description.clone();
    }
    if let Some(status) = update.status {
        task.status = status;
    }
    if let Some(priority) = update.priority {
        task.priority = priority;
    }
    if let Some(phase) = &update.phase {
        task.phase = Some(phase.clone());
    }
    if let Some(size) = update.size {
        task.size = Some(size);
    }
    if let Some(labels) = &update.labels {
        task.labels = labels.clone();
    }
    if let Some(notes) = &update.notes {
        task.notes = notes.clone();
    }
    if let Some(ac) = &update.acceptance_criteria {
        task.acceptance_criteria = ac.clone();
    }
    if let Some(files) = &update.files {
        task.files = files.clone();
    }
    task.updated_at = chrono::Utc::now();

    replace_task(conn, &task)?;
    Ok(task)
}

pub(crate) fn list_tasks(conn: &Connection, filter: &TaskListFilter) -> Result<Vec<Task>, CleoError> {
    let mut sql = String::from("SELECT * FROM tasks WHERE 1=1");
    let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(status) = filter.status {
        bound.push(Box::new(status.to_string()));
        sql.push_str(&format!(" AND status = ?{}", bound.len()));
    }
    if let Some(parent_id) = filter.parent_id {
        bound.push(Box::new(parent_id.numeric() as i64));
        sql.push_str(&format!(" AND parent_id = ?{}", bound.len()));
    }
    if let Some(task_type) = filter.task_type {
        bound.push(Box::new(task_type.to_string()));
        sql.push_str(&format!(" AND task_type = ?{}", bound.len()));
    }
    if let Some(phase) = &filter.phase {
        bound.push(Box::new(phase.clone()));
        sql.push_str(&format!(" AND phase = ?{}", bound.len()));
    }
    sql.push_str(" ORDER BY position ASC");
    if let Some(limit) = filter.limit {
        bound.push(Box::new(limit as i64));
        sql.push_str(&format!(" LIMIT ?{}", bound.len()));
    }

    let params: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|b| b.as_ref()).collect();
    let mut stmt = conn.prepare(&sql).map_err(rusqlite_err)?;
    let rows = stmt.query_map(params.as_slice(), task_from_row).map_err(rusqlite_err)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(rusqlite_err)?);
    }
    Ok(out)
}

pub(crate) fn max_task_numeric_id(conn: &Connection) -> Result<u64, CleoError> {
    let max: Option<i64> =
        conn.query_row("SELECT MAX(id) FROM tasks", [], |r| r.get(0)).map_err(rusqlite_err)?;
    Ok(max.unwrap_or(0) as u64)
}

pub(crate) fn add_dependency(conn: &Connection, dep: TaskDependency) -> Result<(), CleoError> {
    conn.execute(
        "INSERT OR IGNORE INTO task_dependencies (task_id, depends_on) VALUES (?1, ?2)",
        params![dep.task_id.numeric() as i64, dep.depends_on.numeric() as i64],
    )
    .map_err(rusqlite_err)?;
    Ok(())
}

pub(crate) fn list_dependencies(conn: &Connection, task_id: TaskId) -> Result<Vec<TaskDependency>, CleoError> {
    let mut stmt = conn
        .prepare("SELECT task_id, depends_on FROM task_dependencies WHERE task_id = ?1")
        .map_err(rusqlite_err)?;
    let rows = stmt
        .query_map(params![task_id.numeric() as i64], |r| {
            Ok(TaskDependency {
                task_id: TaskId::from_numeric(r.get::<_, i64>(0)? as u64),
                depends_on: TaskId::from_numeric(r.get::<_, i64>(1)? as u64),
            })
        })
        .map_err(rusqlite_err)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(rusqlite_err)?);
    }
    Ok(out)
}

pub(crate) fn list_dependents(conn: &Connection, task_id: TaskId) -> Result<Vec<TaskDependency>, CleoError> {
    let mut stmt = conn
        .prepare("SELECT task_id, depends_on FROM task_dependencies WHERE depends_on = ?1")
        .map_err(rusqlite_err)?;
    let rows = stmt
        .query_map(params![task_id.numeric() as i64], |r| {
            Ok(TaskDependency {
                task_id: TaskId::from_numeric(r.get::<_, i64>(0)? as u64),
                depends_on: TaskId::from_numeric(r.get::<_, i64>(1)? as u64),
            })
        })
        .map_err(rusqlite_err)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(rusqlite_err)?);
    }
    Ok(out)
}

pub(crate) fn add_relation(conn: &Connection, rel: TaskRelation) -> Result<(), CleoError> {
    conn.execute(
        "INSERT OR IGNORE INTO task_relations (task_id, related_to, relation_type) VALUES (?1, ?2, ?3)",
        params![rel.task_id.numeric() as i64, rel.related_to.numeric() as i64, rel.relation_type.to_string()],
    )
    .map_err(rusqlite_err)?;
    Ok(())
}

pub(crate) fn list_relations(conn: &Connection, task_id: TaskId) -> Result<Vec<TaskRelation>, CleoError> {
    let mut stmt = conn
        .prepare("SELECT task_id, related_to, relation_type FROM task_relations WHERE task_id = ?1")
        .map_err(rusqlite_err)?;
    let rows = stmt
        .query_map(params![task_id.numeric() as i64], |r| {
            let relation_type: String = r.get(2)?;
            Ok(TaskRelation {
                task_id: TaskId::from_numeric(r.get::<_, i64>(0)? as u64),
                related_to: TaskId::from_numeric(r.get::<_, i64>(1)? as u64),
                relation_type: cleo_core::RelationType::parse(&relation_type)
                    .unwrap_or(cleo_core::RelationType::Related),
            })
        })
        .map_err(rusqlite_err)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(rusqlite_err)?);
    }
    Ok(out)
}
