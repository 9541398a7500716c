//! Versioned schema migrations, applied in order inside a `schema_meta`
//! table at open time (spec §4.1: "Schema migrations are applied once at
//! open time from a meta table").

use rusqlite::Connection;

use crate::rusqlite_err;
use cleo_core::CleoError;

pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const MIGRATIONS: &[&str] = &[
    // v1: initial schema.
    r#"
    CREATE TABLE schema_meta (version INTEGER NOT NULL);

    CREATE TABLE tasks (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        status TEXT NOT NULL,
        priority TEXT NOT NULL,
        task_type TEXT NOT NULL,
        parent_id INTEGER REFERENCES tasks(id) ON DELETE SET NULL,
        phase TEXT,
        size TEXT,
        position INTEGER NOT NULL,
        position_version INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        completed_at TEXT,
        cancelled_at TEXT,
        archived_at TEXT,
        archive_reason TEXT,
        cycle_time_days REAL,
        created_by TEXT NOT NULL,
        modified_by TEXT NOT NULL,
        session_id TEXT,
        labels TEXT NOT NULL DEFAULT '[]',
        notes TEXT NOT NULL DEFAULT '[]',
        acceptance_criteria TEXT NOT NULL DEFAULT '[]',
        files TEXT NOT NULL DEFAULT '[]',
        verification TEXT NOT NULL DEFAULT '{}'
    );

    CREATE TABLE task_dependencies (
        task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        depends_on INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        PRIMARY KEY (task_id, depends_on)
    );

    CREATE TABLE task_relations (
        task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        related_to INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        relation_type TEXT NOT NULL,
        PRIMARY KEY (task_id, related_to, relation_type)
    );

    CREATE TABLE sessions (
        id TEXT PRIMARY KEY,
        name TEXT,
        status TEXT NOT NULL,
        scope_json TEXT NOT NULL,
        current_task INTEGER,
        task_started_at TEXT,
        agent TEXT,
        notes TEXT NOT NULL DEFAULT '[]',
        tasks_completed TEXT NOT NULL DEFAULT '[]',
        tasks_created TEXT NOT NULL DEFAULT '[]',
        previous_session_id TEXT,
        next_session_id TEXT,
        handoff TEXT,
        debrief TEXT,
        stats_json TEXT NOT NULL DEFAULT '{}',
        graded INTEGER NOT NULL DEFAULT 0,
        started_at TEXT NOT NULL,
        ended_at TEXT
    );

    CREATE TABLE current_session (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        session_id TEXT
    );

    CREATE TABLE task_work (
        session_id TEXT NOT NULL,
        task_id INTEGER NOT NULL,
        set_at TEXT NOT NULL,
        cleared_at TEXT
    );

    CREATE TABLE lifecycle_pipelines (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        task_id INTEGER NOT NULL UNIQUE REFERENCES tasks(id) ON DELETE CASCADE,
        status TEXT NOT NULL,
        current_stage_id INTEGER NOT NULL,
        started_at TEXT NOT NULL,
        completed_at TEXT
    );

    CREATE TABLE lifecycle_stages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pipeline_id INTEGER NOT NULL REFERENCES lifecycle_pipelines(id) ON DELETE CASCADE,
        stage_name TEXT NOT NULL,
        sequence INTEGER NOT NULL,
        status TEXT NOT NULL,
        started_at TEXT,
        completed_at TEXT,
        blocked_at TEXT,
        skipped_at TEXT,
        reason TEXT,
        notes TEXT NOT NULL DEFAULT '[]',
        metadata TEXT NOT NULL DEFAULT '{}'
    );

    CREATE TABLE gate_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        stage_id INTEGER NOT NULL REFERENCES lifecycle_stages(id) ON DELETE CASCADE,
        gate_name TEXT NOT NULL,
        result TEXT NOT NULL,
        checked_by TEXT NOT NULL,
        details TEXT,
        reason TEXT,
        checked_at TEXT NOT NULL
    );

    CREATE TABLE evidence (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        stage_id INTEGER NOT NULL REFERENCES lifecycle_stages(id) ON DELETE CASCADE,
        uri TEXT NOT NULL,
        evidence_type TEXT NOT NULL,
        description TEXT
    );

    CREATE TABLE transitions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pipeline_id INTEGER NOT NULL REFERENCES lifecycle_pipelines(id) ON DELETE CASCADE,
        from_stage_id INTEGER,
        to_stage_id INTEGER NOT NULL,
        transition_type TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE audit_log (
        id TEXT PRIMARY KEY,
        timestamp TEXT NOT NULL,
        action TEXT NOT NULL,
        task_id TEXT,
        actor TEXT NOT NULL,
        details TEXT,
        before_json TEXT,
        after_json TEXT,
        error TEXT
    );

    CREATE TABLE background_jobs (
        id TEXT PRIMARY KEY,
        operation TEXT NOT NULL,
        status TEXT NOT NULL,
        started_at TEXT NOT NULL,
        completed_at TEXT,
        result TEXT,
        error TEXT,
        progress INTEGER NOT NULL
    );

    CREATE TABLE config (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        json TEXT NOT NULL
    );
    "#,
];

/// Apply every migration past the database's current `schema_meta.version`,
/// each inside its own transaction (spec §4.1).
pub fn migrate(conn: &mut Connection) -> Result<(), CleoError> {
    let current: i64 = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='schema_meta'",
            [],
            |_| Ok(()),
        )
        .map(|_| {
            conn.query_row("SELECT MAX(version) FROM schema_meta", [], |r| r.get::<_, i64>(0))
                .unwrap_or(0)
        })
        .unwrap_or(0);

    for (idx, ddl) in MIGRATIONS.iter().enumerate() {
        let version = idx as i64 + 1;
        if version <= current {
            continue;
        }
        let tx = conn.transaction().map_err(rusqlite_err)?;
        tx.execute_batch(ddl).map_err(rusqlite_err)?;
        tx.execute("INSERT INTO schema_meta (version) VALUES (?1)", [version])
            .map_err(rusqlite_err)?;
        tx.commit().map_err(rusqlite_err)?;
    }
    Ok(())
}
