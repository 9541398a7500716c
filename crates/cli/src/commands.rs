//! Maps each CLI subcommand to the gateway request it is passed through
//! as (spec §6: "CLI surface ... passed through the same router"). No
//! command implements behaviour of its own — it only builds a
//! `{domain, operation, params}` envelope and a verb, exactly like the
//! MCP stdio transport would for the same call.

use clap::{Parser, Subcommand};
use cleo_wire::{GatewayKind, GatewayRequest};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "cleo", about = "CLEO task orchestration — MCP server core CLI front-end")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Emit the raw gateway envelope as JSON (default; kept for parity
    /// with the documented `--json|--human` flag pair).
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress output on success; still exits non-zero on error.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Print the request that would be sent without calling the gateway.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialise `.cleo/` in the current directory (idempotent: a
    /// dashboard query against a freshly opened store).
    Init,
    Add {
        title: String,
        description: String,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long = "type")]
        task_type: Option<String>,
        #[arg(long)]
        parent: Option<String>,
    },
    Update {
        task_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        file: Option<String>,
    },
    Show {
        task_id: String,
    },
    Find {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        parent: Option<String>,
    },
    Complete {
        task_id: String,
    },
    Archive {
        task_ids: Vec<String>,
        #[arg(long)]
        reason: Option<String>,
    },
    Delete {
        task_id: String,
    },
    #[command(subcommand)]
    Labels(LabelsCommand),
    #[command(subcommand)]
    Session(SessionCommand),
    /// `focus`/`task` (spec §6): task-work tracking within a session.
    #[command(subcommand, name = "focus", alias = "task")]
    Focus(FocusCommand),
    #[command(subcommand)]
    Lifecycle(LifecycleCommand),
    Safestop,
    Validate,
}

#[derive(Subcommand)]
pub enum LabelsCommand {
    List,
    Show { label: String },
    Stats,
}

#[derive(Subcommand)]
pub enum SessionCommand {
    Start {
        scope: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long)]
        auto_focus: bool,
    },
    End {
        session_id: String,
        #[arg(long)]
        note: Option<String>,
    },
    Close {
        session_id: String,
    },
    Suspend {
        session_id: String,
    },
    Resume {
        #[arg(long)]
        last: bool,
        session_id: Option<String>,
    },
    List,
    Show {
        session_id: String,
    },
    Switch {
        session_id: String,
    },
    Status,
    Info {
        session_id: String,
    },
    Grade {
        session_id: String,
    },
}

#[derive(Subcommand)]
pub enum FocusCommand {
    Start { task_id: String, session_id: String },
    Stop { session_id: String },
    Current { session_id: String },
    History { session_id: String },
}

#[derive(Subcommand)]
pub enum LifecycleCommand {
    Show {
        task_id: String,
    },
    Progress {
        task_id: String,
        #[arg(long)]
        force: bool,
    },
    Block {
        task_id: String,
        reason: String,
    },
    Unblock {
        task_id: String,
    },
    Skip {
        task_id: String,
        reason: String,
        #[arg(long)]
        force: bool,
    },
    #[command(name = "gate.record")]
    GateRecord {
        task_id: String,
        gate_name: String,
        result: String,
        #[arg(long)]
        reason: Option<String>,
    },
    #[command(name = "evidence.add")]
    EvidenceAdd {
        task_id: String,
        uri: String,
        #[arg(long, default_value = "file")]
        evidence_type: String,
        #[arg(long)]
        description: Option<String>,
    },
}

fn opt(v: Option<String>) -> Value {
    v.map(Value::String).unwrap_or(Value::Null)
}

/// Translate one parsed [`Command`] into the `(gateway, domain, operation,
/// params)` shape every transport speaks (spec §6).
pub fn to_request(command: Command) -> (GatewayKind, GatewayRequest) {
    use Command::*;
    match command {
        Init => (GatewayKind::Query, req("admin", "health", Value::Null)),
        Add { title, description, priority, task_type, parent } => (
            GatewayKind::Mutate,
            req(
                "tasks",
                "add",
                json!({ "title": title, "description": description, "priority": priority, "taskType": task_type, "parentId": parent }),
            ),
        ),
        Update { task_id, title, status, file } => (
            GatewayKind::Mutate,
            req("tasks", "update", json!({ "taskId": task_id, "title": title, "status": status, "file": file })),
        ),
        Show { task_id } => (GatewayKind::Query, req("tasks", "show", json!({ "taskId": task_id }))),
        Find { query, limit } => (GatewayKind::Query, req("tasks", "find", json!({ "query": query, "limit": limit }))),
        List { status, parent } => {
            (GatewayKind::Query, req("tasks", "list", json!({ "status": status, "parentId": parent })))
        }
        Complete { task_id } => (GatewayKind::Mutate, req("tasks", "complete", json!({ "taskId": task_id }))),
        Archive { task_ids, reason } => {
            (GatewayKind::Mutate, req("tasks", "archive", json!({ "taskIds": task_ids, "reason": reason })))
        }
        Delete { task_id } => (GatewayKind::Mutate, req("tasks", "delete", json!({ "taskId": task_id }))),
        Labels(cmd) => labels_request(cmd),
        Session(cmd) => session_request(cmd),
        Focus(cmd) => focus_request(cmd),
        Lifecycle(cmd) => lifecycle_request(cmd),
        Safestop => (GatewayKind::Mutate, req("admin", "safestop", Value::Null)),
        Validate => (GatewayKind::Query, req("validate", "run", Value::Null)),
    }
}

fn labels_request(cmd: LabelsCommand) -> (GatewayKind, GatewayRequest) {
    match cmd {
        LabelsCommand::List => (GatewayKind::Query, req("tasks", "labels.list", Value::Null)),
        LabelsCommand::Show { label } => (GatewayKind::Query, req("tasks", "labels.show", json!({ "label": label }))),
        LabelsCommand::Stats => (GatewayKind::Query, req("tasks", "labels.stats", Value::Null)),
    }
}

fn session_request(cmd: SessionCommand) -> (GatewayKind, GatewayRequest) {
    use SessionCommand::*;
    match cmd {
        Start { scope, name, agent, auto_focus } => (
            GatewayKind::Mutate,
            req("session", "start", json!({ "scope": scope, "name": name, "agent": agent, "autoFocus": auto_focus })),
        ),
        End { session_id, note } => {
            (GatewayKind::Mutate, req("session", "end", json!({ "sessionId": session_id, "note": note })))
        }
        Close { session_id } => (GatewayKind::Mutate, req("session", "close", json!({ "sessionId": session_id }))),
        Suspend { session_id } => (GatewayKind::Mutate, req("session", "suspend", json!({ "sessionId": session_id }))),
        Resume { last: _, session_id } => {
            (GatewayKind::Mutate, req("session", "resume", json!({ "sessionId": opt(session_id) })))
        }
        List => (GatewayKind::Query, req("session", "list", Value::Null)),
        Show { session_id } => (GatewayKind::Query, req("session", "show", json!({ "sessionId": session_id }))),
        Switch { session_id } => (GatewayKind::Mutate, req("session", "switch", json!({ "sessionId": session_id }))),
        Status => (GatewayKind::Query, req("session", "status", Value::Null)),
        Info { session_id } => (GatewayKind::Query, req("session", "info", json!({ "sessionId": session_id }))),
        Grade { session_id } => (GatewayKind::Mutate, req("session", "grade", json!({ "sessionId": session_id }))),
    }
}

fn focus_request(cmd: FocusCommand) -> (GatewayKind, GatewayRequest) {
    use FocusCommand::*;
    match cmd {
        Start { task_id, session_id } => {
            (GatewayKind::Mutate, req("session", "focus.start", json!({ "taskId": task_id, "sessionId": session_id })))
        }
        Stop { session_id } => (GatewayKind::Mutate, req("session", "focus.stop", json!({ "sessionId": session_id }))),
        Current { session_id } => {
            (GatewayKind::Query, req("session", "focus.current", json!({ "sessionId": session_id })))
        }
        History { session_id } => {
            (GatewayKind::Query, req("session", "focus.history", json!({ "sessionId": session_id })))
        }
    }
}

fn lifecycle_request(cmd: LifecycleCommand) -> (GatewayKind, GatewayRequest) {
    use LifecycleCommand::*;
    match cmd {
        Show { task_id } => (GatewayKind::Query, req("lifecycle", "show", json!({ "taskId": task_id }))),
        Progress { task_id, force } => {
            (GatewayKind::Mutate, req("lifecycle", "progress", json!({ "taskId": task_id, "force": force })))
        }
        Block { task_id, reason } => {
            (GatewayKind::Mutate, req("lifecycle", "block", json!({ "taskId": task_id, "reason": reason })))
        }
        Unblock { task_id } => (GatewayKind::Mutate, req("lifecycle", "unblock", json!({ "taskId": task_id }))),
        Skip { task_id, reason, force } => (
            GatewayKind::Mutate,
            req("lifecycle", "skip", json!({ "taskId": task_id, "reason": reason, "force": force })),
        ),
        GateRecord { task_id, gate_name, result, reason } => (
            GatewayKind::Mutate,
            req(
                "lifecycle",
                "gate.record",
                json!({ "taskId": task_id, "gateName": gate_name, "result": result, "reason": reason }),
            ),
        ),
        EvidenceAdd { task_id, uri, evidence_type, description } => (
            GatewayKind::Mutate,
            req(
                "lifecycle",
                "evidence.add",
                json!({ "taskId": task_id, "uri": uri, "evidenceType": evidence_type, "description": description }),
            ),
        ),
    }
}

fn req(domain: &str, operation: &str, params: Value) -> GatewayRequest {
    GatewayRequest { domain: domain.to_string(), operation: operation.to_string(), params: Some(params) }
}
