//! `cleo-mcp`: the stdio transport. Reads one JSON object per line from
//! stdin, each naming which of the two gateway tools (`cleo_query` /
//! `cleo_mutate`) it calls, and writes one `Envelope<Value>` per line to
//! stdout (spec §2, §6). Exactly like the CLI, this binary only ever
//! talks to [`cleo_gateway::Router::call`] — it holds no storage logic
//! of its own.

use std::io::{BufRead, Write};

use cleo_core::{Env, SessionId};
use cleo_wire::{GatewayKind, GatewayRequest};
use serde::Deserialize;
use serde_json::Value;

/// One line of the stdio protocol: a [`GatewayRequest`] plus the tool name
/// that picks which gateway it's routed through. `GatewayRequest` itself
/// carries no gateway field (spec §6: the same request shape is shared by
/// both entry points), so the tool name lives in this wrapper instead.
#[derive(Deserialize)]
struct StdioRequest {
    tool: ToolName,
    #[serde(flatten)]
    request: GatewayRequest,
    #[serde(default)]
    actor: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum ToolName {
    CleoQuery,
    CleoMutate,
}

impl ToolName {
    fn gateway(&self) -> GatewayKind {
        match self {
            ToolName::CleoQuery => GatewayKind::Query,
            ToolName::CleoMutate => GatewayKind::Mutate,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let env = Env::load();
    let (router, _accessor) = match cleo_gateway::open_router(&env).await {
        Ok(pair) => pair,
        Err(err) => {
            eprintln!("cleo-mcp: failed to open storage: {err}");
            std::process::exit(err.exit_code());
        }
    };

    let stdin = std::io::stdin();
    let mut lock = stdin.lock();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    loop {
        let mut line = String::new();
        match lock.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::error!(%err, "stdin read failed");
                break;
            }
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let parsed: Result<StdioRequest, _> = cleo_wire::parse_line(trimmed);
        let envelope = match parsed {
            Ok(stdio_req) => {
                let gateway = stdio_req.tool.gateway();
                let actor = stdio_req.actor.unwrap_or_else(|| "mcp".to_string());
                let session_id = stdio_req
                    .session_id
                    .or_else(|| env.cleo_session_id.clone())
                    .map(SessionId::from_string);
                router.call(gateway, stdio_req.request, actor, session_id).await
            }
            Err(err) => {
                tracing::warn!(%err, line = trimmed, "malformed stdio request line");
                malformed_request_envelope(&err.to_string())
            }
        };

        if let Err(err) = cleo_wire::write_response_line(&mut out, &envelope) {
            tracing::error!(%err, "stdout write failed");
            break;
        }
    }
}

/// Build a failure envelope for a line that couldn't even be parsed into
/// a [`StdioRequest`] — there's no domain/operation to stamp into `_meta`,
/// so the placeholders stay empty.
fn malformed_request_envelope(message: &str) -> cleo_wire::Envelope<Value> {
    use cleo_core::CleoError;
    let err = CleoError::validation(format!("malformed request: {message}"));
    let meta = cleo_wire::EnvelopeMeta {
        spec_version: cleo_wire::SPEC_VERSION.to_string(),
        schema_version: cleo_wire::SCHEMA_VERSION,
        timestamp: chrono::Utc::now(),
        operation: "unknown".to_string(),
        request_id: uuid::Uuid::new_v4(),
        transport: "mcp".to_string(),
        strict: true,
        mvi: "standard".to_string(),
        context_version: 1,
        gateway: "unknown".to_string(),
        domain: "unknown".to_string(),
        duration_ms: 0,
    };
    cleo_wire::Envelope::failure(
        meta,
        cleo_wire::ErrorBody {
            code: err.code.to_string(),
            exit_code: err.exit_code(),
            message: err.message,
            details: None,
            fix: None,
            alternatives: vec![],
        },
    )
}
