//! Process bootstrap shared by the CLI and MCP binaries (spec §2: "The
//! core must function identically whether invoked by an in-process CLI, a
//! stdio JSON-RPC peer, or a test harness"). Both binaries call
//! [`open_router`] and then only ever talk to the returned [`Router`].

use std::path::Path;
use std::sync::Arc;

use cleo_core::{CleoConfig, CleoError, Env, StorageEngineKind};
use cleo_jobs::JobManager;
use cleo_storage::{DataAccessor, SafeAccessor};

use crate::Router;

/// Open the configured storage engine, wrap it in the safety layer, and
/// build a [`Router`] wired to it plus a fresh [`JobManager`].
pub async fn open_router(env: &Env) -> Result<(Router, Arc<SafeAccessor>), CleoError> {
    std::fs::create_dir_all(&env.cleo_home)?;
    let engine = storage_engine_hint(&env.cleo_home);
    let accessor = Arc::new(cleo_storage::open(engine, &env.cleo_home)?);
    let jobs = Arc::new(JobManager::new(accessor.clone()));
    let config = accessor.load_config().await?;
    let rate_limiter = Router::rate_limiter_from_config(&config);
    let project_root = env.cleo_root.clone().unwrap_or(std::env::current_dir()?);
    let checkpoint =
        Arc::new(cleo_storage::GitCheckpoint::new(env.cleo_home.clone(), config.git_checkpoint.clone(), env.git_checkpoint_suppress));
    let router = Router::new(accessor.clone(), jobs, env.cleo_home.clone(), project_root, rate_limiter)
        .with_protocol_validation(config.protocol_validation.clone())
        .with_git_checkpoint(checkpoint);
    Ok((router, accessor))
}

/// `storage.engine` is needed before an accessor exists to pick one to
/// open, so read `config.json` directly rather than through the
/// not-yet-open accessor. Missing/unparseable config falls back to the
/// documented default (sqlite), matching [`CleoConfig::default`].
fn storage_engine_hint(cleo_home: &Path) -> StorageEngineKind {
    std::fs::read_to_string(cleo_home.join("config.json"))
        .ok()
        .and_then(|raw| CleoConfig::from_json_str(&raw).ok())
        .map(|c| c.storage.engine)
        .unwrap_or_default()
}
