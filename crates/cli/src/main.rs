//! `cleo`: the CLI front-end for the MCP server core. Every subcommand
//! builds a `(GatewayKind, GatewayRequest)` pair and sends it through
//! [`cleo_gateway::Router::call`] — the same call path the stdio (MCP)
//! transport uses (spec §2, §6). The CLI does not read or write storage
//! directly.
//!
//! `sync (inject|extract|status|clear)` from the documented CLI surface
//! is intentionally not implemented here: it manages context-injection
//! documentation artifacts, which falls under the "documentation
//! generation" Non-goal (spec §1). See DESIGN.md.

mod commands;

use clap::Parser;
use cleo_core::{Env, SessionId};
use cleo_wire::Envelope;
use commands::Cli;
use serde_json::Value;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let env = Env::load();

    if cli.dry_run {
        let (gateway, request) = commands::to_request(cli.command);
        let preview = serde_json::json!({ "gateway": gateway.as_str(), "domain": request.domain, "operation": request.operation, "params": request.params });
        println!("{}", serde_json::to_string_pretty(&preview).unwrap_or_default());
        return;
    }

    let (gateway, request) = commands::to_request(cli.command);
    let (router, _accessor) = match cleo_gateway::open_router(&env).await {
        Ok(pair) => pair,
        Err(err) => {
            eprintln!("cleo: failed to open storage: {err}");
            std::process::exit(err.exit_code());
        }
    };

    let actor = current_actor();
    let session_id = env.cleo_session_id.map(SessionId::from_string);
    let envelope: Envelope<Value> = router.call(gateway, request, actor, session_id).await;
    let exit_code = envelope.error.as_ref().map(|e| e.exit_code).unwrap_or(0);

    if !cli.quiet {
        match serde_json::to_string_pretty(&envelope) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => eprintln!("cleo: failed to render response: {err}"),
        }
    }

    std::process::exit(exit_code);
}

fn current_actor() -> String {
    std::env::var("CLEO_ACTOR")
        .or_else(|_| std::env::var("USER"))
        .unwrap_or_else(|_| "cli".to_string())
}
