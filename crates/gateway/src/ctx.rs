//! Shared handler plumbing: the context every handler closes over and the
//! function-pointer `Handler` type stored in the router's dispatch table.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use cleo_core::{CleoError, SessionId};
use cleo_jobs::JobManager;
use cleo_storage::SafeAccessor;
use serde_json::Value;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Everything a handler needs, owned rather than borrowed so the async
/// block inside each handler can be `'static` and stored behind a plain
/// function pointer (spec §4.8: the dispatch table is built once, not a
/// giant `match`).
#[derive(Clone)]
pub struct HandlerCtx {
    pub accessor: Arc<SafeAccessor>,
    pub jobs: Arc<JobManager>,
    pub actor: String,
    pub session_id: Option<SessionId>,
}

/// A registered domain operation: takes the shared context plus the
/// already-sanitised params and returns the JSON payload that becomes the
/// envelope's `data` field.
pub type Handler = fn(HandlerCtx, Value) -> BoxFuture<Result<Value, CleoError>>;

/// Deserialize `params` into `T`, defaulting to `T::default()` when the
/// caller omitted `params` entirely (most query operations have none).
pub fn parse_params<T: serde::de::DeserializeOwned + Default>(params: Value) -> Result<T, CleoError> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params).map_err(CleoError::from)
}

/// Same as [`parse_params`] but for params that are required (no sensible
/// default) — `null`/missing is itself a validation error.
pub fn require_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, CleoError> {
    if params.is_null() {
        return Err(CleoError::validation("params are required for this operation"));
    }
    serde_json::from_value(params).map_err(CleoError::from)
}
