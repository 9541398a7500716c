//! Domain operation handlers (spec §4.3) registered into the router's
//! dispatch table. Each handler owns the translation between the wire's
//! `params` JSON blob and the domain layer's typed arguments; the domain
//! functions themselves stay storage/wire-agnostic.

use std::collections::HashMap;

use cleo_core::{
    BackgroundJobId, CleoError, EnforcementMode, EvidenceType, GateOutcome, RelationType, SessionId,
    SessionScope, TaskId, TaskStatus, TaskType, TaskUpdate,
};
use cleo_domain::{admin, release, session, task_work, tasks};
use cleo_storage::{DataAccessor, TaskListFilter};
use cleo_wire::GatewayKind;
use serde::Deserialize;
use serde_json::Value;

use crate::ctx::{parse_params, require_params, BoxFuture, Handler, HandlerCtx};

pub type HandlerMap = HashMap<(GatewayKind, &'static str, &'static str), Handler>;

pub fn register() -> HandlerMap {
    let mut map: HandlerMap = HashMap::new();

    // --- tasks (query) ---
    map.insert((GatewayKind::Query, "tasks", "show"), h_tasks_show as Handler);
    map.insert((GatewayKind::Query, "tasks", "find"), h_tasks_find as Handler);
    map.insert((GatewayKind::Query, "tasks", "list"), h_tasks_list as Handler);
    map.insert((GatewayKind::Query, "tasks", "analyze"), h_tasks_analyze as Handler);
    map.insert((GatewayKind::Query, "tasks", "labels.list"), h_labels_list as Handler);
    map.insert((GatewayKind::Query, "tasks", "labels.show"), h_labels_show as Handler);
    map.insert((GatewayKind::Query, "tasks", "labels.stats"), h_labels_stats as Handler);
    map.insert((GatewayKind::Query, "tasks", "dependencies.list"), h_dependencies_list as Handler);
    map.insert((GatewayKind::Query, "tasks", "relations.list"), h_relations_list as Handler);
    map.insert((GatewayKind::Query, "tasks", "relations.discover"), h_relations_discover as Handler);
    map.insert((GatewayKind::Query, "tasks", "relations.suggest"), h_relations_suggest as Handler);

    // --- tasks (mutate) ---
    map.insert((GatewayKind::Mutate, "tasks", "add"), h_tasks_add as Handler);
    map.insert((GatewayKind::Mutate, "tasks", "update"), h_tasks_update as Handler);
    map.insert((GatewayKind::Mutate, "tasks", "complete"), h_tasks_complete as Handler);
    map.insert((GatewayKind::Mutate, "tasks", "delete"), h_tasks_delete as Handler);
    map.insert((GatewayKind::Mutate, "tasks", "archive"), h_tasks_archive as Handler);
    map.insert((GatewayKind::Mutate, "tasks", "dependencies.add"), h_dependencies_add as Handler);
    map.insert((GatewayKind::Mutate, "tasks", "relations.add"), h_relations_add as Handler);

    // --- session (query) ---
    map.insert((GatewayKind::Query, "session", "status"), h_session_status as Handler);
    map.insert((GatewayKind::Query, "session", "info"), h_session_info as Handler);
    map.insert((GatewayKind::Query, "session", "list"), h_session_list as Handler);
    map.insert((GatewayKind::Query, "session", "show"), h_session_show as Handler);
    map.insert((GatewayKind::Query, "session", "focus.current"), h_focus_current as Handler);
    map.insert((GatewayKind::Query, "session", "focus.history"), h_focus_history as Handler);

    // --- session (mutate) ---
    map.insert((GatewayKind::Mutate, "session", "start"), h_session_start as Handler);
    map.insert((GatewayKind::Mutate, "session", "end"), h_session_end as Handler);
    map.insert((GatewayKind::Mutate, "session", "close"), h_session_close as Handler);
    map.insert((GatewayKind::Mutate, "session", "suspend"), h_session_suspend as Handler);
    map.insert((GatewayKind::Mutate, "session", "resume"), h_session_resume as Handler);
    map.insert((GatewayKind::Mutate, "session", "switch"), h_session_switch as Handler);
    map.insert((GatewayKind::Mutate, "session", "grade"), h_session_grade as Handler);
    map.insert((GatewayKind::Mutate, "session", "focus.start"), h_focus_start as Handler);
    map.insert((GatewayKind::Mutate, "session", "focus.stop"), h_focus_stop as Handler);

    // --- admin / system (query + mutate; same handlers under both names,
    // matching the source's conflation of the two — SPEC_FULL §4.3) ---
    for domain in ["admin", "system"] {
        map.insert((GatewayKind::Query, domain, "dashboard"), h_admin_dashboard as Handler);
        map.insert((GatewayKind::Query, domain, "health"), h_admin_health as Handler);
        map.insert((GatewayKind::Query, domain, "config.get"), h_admin_config_get as Handler);
        map.insert((GatewayKind::Query, domain, "status.funnel"), h_admin_status_funnel as Handler);
        map.insert((GatewayKind::Mutate, domain, "config.set"), h_admin_config_set as Handler);
        map.insert((GatewayKind::Mutate, domain, "safestop"), h_admin_safestop as Handler);
    }

    // --- release ---
    map.insert((GatewayKind::Query, "release", "changelog"), h_release_changelog as Handler);
    map.insert((GatewayKind::Query, "release", "bump"), h_release_bump as Handler);
    map.insert((GatewayKind::Mutate, "release", "tag"), h_release_tag as Handler);

    // --- lifecycle ---
    map.insert((GatewayKind::Query, "lifecycle", "show"), h_lifecycle_show as Handler);
    map.insert((GatewayKind::Mutate, "lifecycle", "progress"), h_lifecycle_progress as Handler);
    map.insert((GatewayKind::Mutate, "lifecycle", "block"), h_lifecycle_block as Handler);
    map.insert((GatewayKind::Mutate, "lifecycle", "unblock"), h_lifecycle_unblock as Handler);
    map.insert((GatewayKind::Mutate, "lifecycle", "skip"), h_lifecycle_skip as Handler);
    map.insert((GatewayKind::Mutate, "lifecycle", "gate.record"), h_lifecycle_gate_record as Handler);
    map.insert((GatewayKind::Mutate, "lifecycle", "evidence.add"), h_lifecycle_evidence_add as Handler);

    // --- orchestrate (Job Manager, spec §4.6) ---
    map.insert((GatewayKind::Query, "orchestrate", "status"), h_orchestrate_status as Handler);
    map.insert((GatewayKind::Query, "orchestrate", "list"), h_orchestrate_list as Handler);
    map.insert((GatewayKind::Mutate, "orchestrate", "spawn"), h_orchestrate_spawn as Handler);
    map.insert((GatewayKind::Mutate, "orchestrate", "cancel"), h_orchestrate_cancel as Handler);

    // --- validate (protocol-validation self-check, SPEC_FULL §10) ---
    map.insert((GatewayKind::Query, "validate", "run"), h_validate_run as Handler);

    map
}

fn to_json<T: serde::Serialize>(value: T) -> Result<Value, CleoError> {
    Ok(serde_json::to_value(value)?)
}

// --- tasks ---

fn h_tasks_show(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(tasks::show(&ctx.accessor, p.task_id).await?)
    })
}

fn h_tasks_find(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    struct P {
        query: String,
        #[serde(default)]
        limit: Option<usize>,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(tasks::find(&ctx.accessor, &p.query, p.limit).await?)
    })
}

fn h_tasks_list(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize, Default)]
    #[serde(rename_all = "camelCase")]
    struct P {
        status: Option<TaskStatus>,
        parent_id: Option<TaskId>,
        task_type: Option<TaskType>,
        phase: Option<String>,
        limit: Option<usize>,
    }
    Box::pin(async move {
        let p: P = parse_params(params)?;
        let filter =
            TaskListFilter { status: p.status, parent_id: p.parent_id, task_type: p.task_type, phase: p.phase, limit: p.limit };
        to_json(tasks::list(&ctx.accessor, filter).await?)
    })
}

fn h_tasks_analyze(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(tasks::analyze(&ctx.accessor, p.task_id).await?)
    })
}

fn h_labels_list(ctx: HandlerCtx, _params: Value) -> BoxFuture<Result<Value, CleoError>> {
    Box::pin(async move { to_json(tasks::labels::list(&ctx.accessor).await?) })
}

fn h_labels_show(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    struct P {
        label: String,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(tasks::labels::show(&ctx.accessor, &p.label).await?)
    })
}

fn h_labels_stats(ctx: HandlerCtx, _params: Value) -> BoxFuture<Result<Value, CleoError>> {
    Box::pin(async move { to_json(tasks::labels::stats(&ctx.accessor).await?) })
}

fn h_dependencies_list(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(tasks::dependencies::list(&ctx.accessor, p.task_id).await?)
    })
}

fn h_relations_list(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(tasks::relations::list(&ctx.accessor, p.task_id).await?)
    })
}

fn h_relations_discover(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
        #[serde(default)]
        max_depth: Option<u32>,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(tasks::relations::discover(&ctx.accessor, p.task_id, p.max_depth.unwrap_or(2)).await?)
    })
}

fn h_relations_suggest(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(tasks::relations::suggest(&ctx.accessor, p.task_id).await?)
    })
}

fn h_tasks_add(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    Box::pin(async move {
        let mut p: tasks::AddTaskParams = require_params(params)?;
        p.actor = ctx.actor.clone();
        p.session_id = ctx.session_id.clone();
        to_json(tasks::add(&ctx.accessor, p).await?)
    })
}

fn h_tasks_update(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
        #[serde(flatten)]
        update: TaskUpdate,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(tasks::update(&ctx.accessor, p.task_id, p.update, &ctx.actor).await?)
    })
}

fn h_tasks_complete(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(tasks::complete(&ctx.accessor, p.task_id, &ctx.actor).await?)
    })
}

fn h_tasks_delete(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        tasks::delete(&ctx.accessor, p.task_id).await?;
        to_json(serde_json::json!({ "taskId": p.task_id.to_string() }))
    })
}

fn h_tasks_archive(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_ids: Vec<TaskId>,
        #[serde(default)]
        reason: Option<String>,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(tasks::archive(&ctx.accessor, p.task_ids, p.reason).await?)
    })
}

fn h_dependencies_add(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
        depends_on: TaskId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        tasks::dependencies::add(&ctx.accessor, p.task_id, p.depends_on).await?;
        to_json(serde_json::json!({ "taskId": p.task_id.to_string(), "dependsOn": p.depends_on.to_string() }))
    })
}

fn h_relations_add(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
        related_to: TaskId,
        relation_type: RelationType,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        tasks::relations::add(&ctx.accessor, p.task_id, p.related_to, p.relation_type).await?;
        to_json(serde_json::json!({ "taskId": p.task_id.to_string(), "relatedTo": p.related_to.to_string() }))
    })
}

// --- session ---

fn h_session_status(ctx: HandlerCtx, _params: Value) -> BoxFuture<Result<Value, CleoError>> {
    Box::pin(async move { to_json(session::status(&ctx.accessor).await?) })
}

fn h_session_info(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        session_id: SessionId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(session::info(&ctx.accessor, p.session_id).await?)
    })
}

fn h_session_list(ctx: HandlerCtx, _params: Value) -> BoxFuture<Result<Value, CleoError>> {
    Box::pin(async move { to_json(session::list(&ctx.accessor).await?) })
}

fn h_session_show(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        session_id: SessionId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(session::show(&ctx.accessor, p.session_id).await?)
    })
}

fn h_session_start(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        scope: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        agent: Option<String>,
        #[serde(default)]
        auto_focus: bool,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        let scope = SessionScope::parse(&p.scope)?;
        to_json(session::start(&ctx.accessor, scope, p.name, p.agent, p.auto_focus).await?)
    })
}

fn h_session_end(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        session_id: SessionId,
        #[serde(default)]
        note: Option<String>,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        let config = ctx.accessor.load_config().await?;
        to_json(session::end(&ctx.accessor, p.session_id, p.note, &config).await?)
    })
}

fn h_session_close(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        session_id: SessionId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(session::close(&ctx.accessor, p.session_id).await?)
    })
}

fn h_session_suspend(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        session_id: SessionId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(session::suspend(&ctx.accessor, p.session_id).await?)
    })
}

fn h_session_resume(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize, Default)]
    #[serde(rename_all = "camelCase")]
    struct P {
        session_id: Option<SessionId>,
    }
    Box::pin(async move {
        let p: P = parse_params(params)?;
        to_json(session::resume(&ctx.accessor, p.session_id).await?)
    })
}

fn h_session_switch(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        session_id: SessionId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(session::switch(&ctx.accessor, p.session_id).await?)
    })
}

fn h_session_grade(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        session_id: SessionId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(session::grade(&ctx.accessor, p.session_id).await?)
    })
}

fn resolve_session_id(ctx: &HandlerCtx, requested: Option<SessionId>) -> Result<SessionId, CleoError> {
    requested
        .or_else(|| ctx.session_id.clone())
        .ok_or_else(|| CleoError::validation("no sessionId given and no session is active"))
}

fn h_focus_start(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
        #[serde(default)]
        session_id: Option<SessionId>,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        let session_id = resolve_session_id(&ctx, p.session_id)?;
        to_json(task_work::start(&ctx.accessor, &session_id, p.task_id).await?)
    })
}

fn h_focus_stop(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize, Default)]
    #[serde(rename_all = "camelCase")]
    struct P {
        session_id: Option<SessionId>,
    }
    Box::pin(async move {
        let p: P = parse_params(params)?;
        let session_id = resolve_session_id(&ctx, p.session_id)?;
        task_work::stop(&ctx.accessor, &session_id).await?;
        to_json(serde_json::json!({ "sessionId": session_id.as_str() }))
    })
}

fn h_focus_current(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize, Default)]
    #[serde(rename_all = "camelCase")]
    struct P {
        session_id: Option<SessionId>,
    }
    Box::pin(async move {
        let p: P = parse_params(params)?;
        let session_id = resolve_session_id(&ctx, p.session_id)?;
        to_json(task_work::current(&ctx.accessor, &session_id).await?)
    })
}

fn h_focus_history(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize, Default)]
    #[serde(rename_all = "camelCase")]
    struct P {
        session_id: Option<SessionId>,
    }
    Box::pin(async move {
        let p: P = parse_params(params)?;
        let session_id = resolve_session_id(&ctx, p.session_id)?;
        to_json(task_work::history(&ctx.accessor, &session_id).await?)
    })
}

// --- admin / system ---

fn h_admin_dashboard(ctx: HandlerCtx, _params: Value) -> BoxFuture<Result<Value, CleoError>> {
    Box::pin(async move { to_json(admin::dashboard(&ctx.accessor).await?) })
}

fn h_admin_health(ctx: HandlerCtx, _params: Value) -> BoxFuture<Result<Value, CleoError>> {
    Box::pin(async move { to_json(admin::health(&ctx.accessor).await?) })
}

fn h_admin_config_get(ctx: HandlerCtx, _params: Value) -> BoxFuture<Result<Value, CleoError>> {
    Box::pin(async move { to_json(admin::config_get(&ctx.accessor).await?) })
}

fn h_admin_config_set(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    struct P {
        config: cleo_core::CleoConfig,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        admin::config_set(&ctx.accessor, p.config.clone()).await?;
        to_json(p.config)
    })
}

fn h_admin_status_funnel(ctx: HandlerCtx, _params: Value) -> BoxFuture<Result<Value, CleoError>> {
    Box::pin(async move { to_json(admin::status_funnel(&ctx.accessor).await?) })
}

fn h_admin_safestop(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize, Default)]
    struct P {
        handoff: Option<String>,
    }
    Box::pin(async move {
        let p: P = parse_params(params)?;
        to_json(admin::safe_stop(&ctx.accessor, p.handoff).await?)
    })
}

// --- release ---

fn h_release_changelog(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    struct P {
        tag: String,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(release::changelog(&ctx.accessor, &p.tag).await?)
    })
}

fn h_release_bump(_ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    struct P {
        current: String,
        kind: BumpKindWire,
    }
    #[derive(Deserialize)]
    #[serde(rename_all = "snake_case")]
    enum BumpKindWire {
        Major,
        Minor,
        Patch,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        let kind = match p.kind {
            BumpKindWire::Major => release::BumpKind::Major,
            BumpKindWire::Minor => release::BumpKind::Minor,
            BumpKindWire::Patch => release::BumpKind::Patch,
        };
        to_json(release::bump(&p.current, kind)?)
    })
}

fn h_release_tag(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    struct VersionWire {
        major: u32,
        minor: u32,
        patch: u32,
    }
    #[derive(Deserialize)]
    struct P {
        tag: String,
        version: VersionWire,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        let version = release::Version { major: p.version.major, minor: p.version.minor, patch: p.version.patch };
        to_json(release::tag(&ctx.accessor, &p.tag, version).await?)
    })
}

// --- lifecycle ---

#[derive(serde::Serialize)]
struct LifecycleView {
    pipeline: cleo_core::LifecyclePipeline,
    stages: Vec<cleo_core::LifecycleStageRow>,
    gates: Vec<cleo_core::GateResult>,
    evidence: Vec<cleo_core::Evidence>,
    transitions: Vec<cleo_core::Transition>,
}

fn h_lifecycle_show(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        let pipeline = match ctx.accessor.get_pipeline(p.task_id).await? {
            Some(pipeline) => pipeline,
            None => ctx.accessor.create_pipeline(p.task_id).await?,
        };
        let stages = ctx.accessor.list_stages(pipeline.id).await?;
        let current = stages
            .iter()
            .find(|s| s.id == pipeline.current_stage_id)
            .ok_or_else(|| CleoError::internal("pipeline current_stage_id has no matching stage row"))?;
        let gates = ctx.accessor.list_gates(current.id).await?;
        let evidence = ctx.accessor.list_evidence(current.id).await?;
        let transitions = ctx.accessor.list_transitions(pipeline.id).await?;
        to_json(LifecycleView { pipeline, stages, gates, evidence, transitions })
    })
}

async fn resolve_mode(ctx: &HandlerCtx, requested: Option<EnforcementMode>) -> Result<EnforcementMode, CleoError> {
    match requested {
        Some(mode) => Ok(mode),
        None => Ok(ctx.accessor.load_config().await?.lifecycle_enforcement.mode),
    }
}

fn h_lifecycle_progress(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize, Default)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: Option<TaskId>,
        #[serde(default)]
        force: bool,
        #[serde(default)]
        mode: Option<EnforcementMode>,
    }
    Box::pin(async move {
        let p: P = require_params::<P>(params)?;
        let task_id = p.task_id.ok_or_else(|| CleoError::validation("taskId is required"))?;
        let mode = resolve_mode(&ctx, p.mode).await?;
        to_json(cleo_domain::lifecycle::progress(&ctx.accessor, task_id, p.force, mode).await?)
    })
}

fn h_lifecycle_block(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
        #[serde(default)]
        reason: Option<String>,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(cleo_domain::lifecycle::block(&ctx.accessor, p.task_id, p.reason).await?)
    })
}

fn h_lifecycle_unblock(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(cleo_domain::lifecycle::unblock(&ctx.accessor, p.task_id).await?)
    })
}

fn h_lifecycle_skip(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        force: bool,
        #[serde(default)]
        mode: Option<EnforcementMode>,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        let mode = resolve_mode(&ctx, p.mode).await?;
        to_json(cleo_domain::lifecycle::skip(&ctx.accessor, p.task_id, p.reason, p.force, mode).await?)
    })
}

fn h_lifecycle_gate_record(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
        gate_name: String,
        result: GateOutcome,
        #[serde(default)]
        checked_by: Option<String>,
        #[serde(default)]
        details: Option<String>,
        #[serde(default)]
        reason: Option<String>,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        let checked_by = p.checked_by.unwrap_or_else(|| ctx.actor.clone());
        to_json(
            cleo_domain::lifecycle::record_gate(&ctx.accessor, p.task_id, p.gate_name, p.result, checked_by, p.details, p.reason)
                .await?,
        )
    })
}

fn h_lifecycle_evidence_add(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        task_id: TaskId,
        uri: String,
        evidence_type: EvidenceType,
        #[serde(default)]
        description: Option<String>,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(cleo_domain::lifecycle::add_evidence(&ctx.accessor, p.task_id, p.uri, p.evidence_type, p.description).await?)
    })
}

// --- orchestrate ---

fn h_orchestrate_spawn(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    struct P {
        operation: String,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(ctx.jobs.start(p.operation).await?)
    })
}

fn h_orchestrate_status(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        job_id: BackgroundJobId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        let job = ctx.jobs.get(p.job_id).await?.ok_or_else(|| CleoError::not_found("job", &p.job_id.to_string()))?;
        to_json(job)
    })
}

fn h_orchestrate_list(ctx: HandlerCtx, _params: Value) -> BoxFuture<Result<Value, CleoError>> {
    Box::pin(async move { to_json(ctx.jobs.list().await?) })
}

fn h_orchestrate_cancel(ctx: HandlerCtx, params: Value) -> BoxFuture<Result<Value, CleoError>> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct P {
        job_id: BackgroundJobId,
    }
    Box::pin(async move {
        let p: P = require_params(params)?;
        to_json(ctx.jobs.cancel(p.job_id).await?)
    })
}

// --- validate ---

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationReport {
    storage_ok: bool,
    task_count: u32,
    protocol_validation: cleo_core::config::ProtocolValidationConfig,
}

fn h_validate_run(ctx: HandlerCtx, _params: Value) -> BoxFuture<Result<Value, CleoError>> {
    Box::pin(async move {
        let health = admin::health(&ctx.accessor).await?;
        let config = ctx.accessor.load_config().await?;
        to_json(ValidationReport {
            storage_ok: health.storage_ok,
            task_count: health.task_count,
            protocol_validation: config.protocol_validation,
        })
    })
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
