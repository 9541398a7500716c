//! Gateway Router (spec §4.8): the two entry points `cleo_query` /
//! `cleo_mutate` funnel through one call pipeline — handler lookup,
//! rate-limit, sanitise, audit, invoke, envelope. Both the CLI and the MCP
//! stdio transport call through the same [`Router::call`]; neither talks
//! to the handler map or the accessor directly.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use cleo_core::{CleoConfig, CleoError, ProtocolValidationConfig};
use cleo_security::{Category, RateLimiter};
use cleo_storage::{DataAccessor, GitCheckpoint, SafeAccessor};
use cleo_wire::{Envelope, EnvelopeMeta, ErrorBody, GatewayKind, GatewayRequest, DOMAINS, MUTATE_OPERATION_VERBS, QUERY_OPERATION_VERBS};
use serde_json::Value;
use uuid::Uuid;

use crate::audit::AuditWriter;
use crate::ctx::HandlerCtx;
use crate::handlers::{self, HandlerMap};

/// Ties the handler map to the shared process-lifetime dependencies it
/// needs (spec §5: audit + rate-limit state are injected, not implicit
/// singletons).
pub struct Router {
    handlers: HandlerMap,
    rate_limiter: RateLimiter,
    audit: AuditWriter,
    accessor: Arc<SafeAccessor>,
    jobs: Arc<cleo_jobs::JobManager>,
    project_root: PathBuf,
    protocol_validation: ProtocolValidationConfig,
    git_checkpoint: Option<Arc<GitCheckpoint>>,
}

impl Router {
    pub fn new(
        accessor: Arc<SafeAccessor>,
        jobs: Arc<cleo_jobs::JobManager>,
        cleo_home: PathBuf,
        project_root: PathBuf,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            handlers: handlers::register(),
            rate_limiter,
            audit: AuditWriter::new(&cleo_home),
            accessor,
            jobs,
            project_root,
            protocol_validation: ProtocolValidationConfig::default(),
            git_checkpoint: None,
        }
    }

    /// Wire `protocolValidation.{strictMode,blockOnViolation,logViolations}`
    /// (spec §6) in. Defaults to the all-`false` config, under which
    /// [`Router::call`]'s shape check never blocks or logs anything.
    #[must_use]
    pub fn with_protocol_validation(mut self, protocol_validation: ProtocolValidationConfig) -> Self {
        self.protocol_validation = protocol_validation;
        self
    }

    /// Wire `gitCheckpoint.*` (spec §6) in: a debounced commit of
    /// `cleo_home` runs after every successful mutate. Omitted by default,
    /// matching [`GitCheckpointConfig::enabled`]'s own default of `false`.
    #[must_use]
    pub fn with_git_checkpoint(mut self, git_checkpoint: Arc<GitCheckpoint>) -> Self {
        self.git_checkpoint = Some(git_checkpoint);
        self
    }

    /// Build a limiter honouring `rateLimiting.{query,mutate,spawn}` from
    /// config (spec §6), or the spec-default limiter if rate limiting is
    /// disabled outright (an effectively-unlimited window).
    pub fn rate_limiter_from_config(config: &CleoConfig) -> RateLimiter {
        if config.rate_limiting.enabled {
            RateLimiter::with_limits(config.rate_limiting.query, config.rate_limiting.mutate, config.rate_limiting.spawn)
        } else {
            RateLimiter::with_limits(u32::MAX, u32::MAX, u32::MAX)
        }
    }

    /// Run one call through the full pipeline (spec §4.8, steps 1-7).
    pub async fn call(
        &self,
        gateway: GatewayKind,
        request: GatewayRequest,
        actor: String,
        session_id: Option<cleo_core::SessionId>,
    ) -> Envelope<Value> {
        let start = Instant::now();
        let request_id = Uuid::new_v4();
        let operation = format!("{}.{}", request.domain, request.operation);

        // 0. Protocol shape (spec §6 "Operation naming (enforced)"), gated
        // by `protocolValidation.*` — never runs the handler lookup on a
        // request it rejects.
        if let Err(err) = self.check_protocol_shape(gateway, &request.domain, &request.operation) {
            self.audit_failure(&operation, &actor, &err).await;
            return self.error_envelope(gateway, &request.domain, &operation, request_id, start, err);
        }

        // 1. Handler lookup.
        let handler = match self.handlers.get(&(gateway, request.domain.as_str(), request.operation.as_str())) {
            Some(h) => *h,
            None => {
                let err = CleoError::unknown_operation(gateway.as_str(), &request.domain, &request.operation);
                self.audit_failure(&operation, &actor, &err).await;
                return self.error_envelope(gateway, &request.domain, &operation, request_id, start, err);
            }
        };

        // 2. Rate-limit consume.
        let category = Category::classify(gateway == GatewayKind::Mutate, &request.domain, &request.operation);
        let decision = self.rate_limiter.check(category);
        if !decision.allowed {
            let err = CleoError::rate_limit_exceeded(decision.reset_ms, category.as_str());
            self.audit_failure(&operation, &actor, &err).await;
            let duration_ms = start.elapsed().as_millis() as u64;
            let mut body = error_body(&err);
            body.details = Some(serde_json::json!({ "retryAfter": decision.reset_ms }));
            return Envelope::failure(self.meta(gateway, &request.domain, &operation, request_id, duration_ms), body);
        }

        // 3. Sanitise params.
        let mut params = request.params.unwrap_or(Value::Null);
        if let Err(err) = cleo_security::sanitize_params(&mut params, &self.project_root) {
            self.audit_failure(&operation, &actor, &err).await;
            return self.error_envelope(gateway, &request.domain, &operation, request_id, start, err);
        }

        // 4. Open an audit record: capture `before` for mutates where the
        // touched aggregate is identifiable from params (spec §4.8 step 4).
        let audit_task_id = extract_task_id(&params);
        let before = if gateway == GatewayKind::Mutate { self.snapshot_task(audit_task_id.as_deref()).await } else { None };

        // 5. Invoke the handler through the safety-wrapped accessor.
        let ctx = HandlerCtx { accessor: self.accessor.clone(), jobs: self.jobs.clone(), actor: actor.clone(), session_id };
        let result = handler(ctx, params).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(data) => {
                // 6. Record `after`, append the audit row, return success.
                if gateway == GatewayKind::Mutate {
                    let after = self.snapshot_task(audit_task_id.as_deref()).await;
                    self.audit_success(&operation, &actor, audit_task_id.as_deref(), before, after).await;
                    if let Some(checkpoint) = &self.git_checkpoint {
                        checkpoint.maybe_checkpoint(&operation).await;
                    }
                }
                Envelope::success(self.meta(gateway, &request.domain, &operation, request_id, duration_ms), data)
            }
            Err(err) => {
                // 7. Typed errors are mapped, never swallowed; still audited.
                if gateway == GatewayKind::Mutate {
                    self.audit_error(&operation, &actor, audit_task_id.as_deref(), before, &err).await;
                }
                Envelope::failure(self.meta(gateway, &request.domain, &operation, request_id, duration_ms), error_body(&err))
            }
        }
    }

    /// Check `domain`/`operation` against [`DOMAINS`] and the gateway's
    /// verb list (before any dotted subpath), per `protocolValidation`:
    /// `logViolations` logs a shape mismatch without touching the call;
    /// `strictMode` or `blockOnViolation` turns it into a denial. Neither
    /// flag set (the default) makes this a no-op, matching today's
    /// behaviour.
    fn check_protocol_shape(&self, gateway: GatewayKind, domain: &str, operation: &str) -> Result<(), CleoError> {
        let cfg = &self.protocol_validation;
        if !cfg.strict_mode && !cfg.block_on_violation && !cfg.log_violations {
            return Ok(());
        }

        let verb = operation.split('.').next().unwrap_or(operation);
        let verbs = match gateway {
            GatewayKind::Query => QUERY_OPERATION_VERBS,
            GatewayKind::Mutate => MUTATE_OPERATION_VERBS,
        };
        let violation = if !DOMAINS.contains(&domain) {
            Some(format!("unknown domain {domain:?}"))
        } else if !verbs.contains(&verb) {
            Some(format!("operation verb {verb:?} is not valid for the {} gateway", gateway.as_str()))
        } else {
            None
        };

        let Some(detail) = violation else { return Ok(()) };

        if cfg.log_violations {
            tracing::warn!(domain, operation, gateway = gateway.as_str(), detail = %detail, "protocol validation violation");
        }
        if cfg.strict_mode || cfg.block_on_violation {
            return Err(CleoError::protocol_violation(detail));
        }
        Ok(())
    }

    fn meta(&self, gateway: GatewayKind, domain: &str, operation: &str, request_id: Uuid, duration_ms: u64) -> EnvelopeMeta {
        EnvelopeMeta {
            spec_version: cleo_wire::SPEC_VERSION.to_string(),
            schema_version: cleo_wire::SCHEMA_VERSION,
            timestamp: chrono::Utc::now(),
            operation: operation.to_string(),
            request_id,
            transport: "mcp".to_string(),
            strict: true,
            mvi: "standard".to_string(),
            context_version: 1,
            gateway: gateway.as_str().to_string(),
            domain: domain.to_string(),
            duration_ms,
        }
    }

    fn error_envelope(
        &self,
        gateway: GatewayKind,
        domain: &str,
        operation: &str,
        request_id: Uuid,
        start: Instant,
        err: CleoError,
    ) -> Envelope<Value> {
        let duration_ms = start.elapsed().as_millis() as u64;
        Envelope::failure(self.meta(gateway, domain, operation, request_id, duration_ms), error_body(&err))
    }

    async fn snapshot_task(&self, task_id: Option<&str>) -> Option<Value> {
        let raw = task_id?;
        let id = cleo_security::sanitize_task_id(raw).ok()?;
        let task = self.accessor.get_task(id).await.ok()??;
        serde_json::to_value(task).ok()
    }

    async fn audit_success(
        &self,
        action: &str,
        actor: &str,
        task_id: Option<&str>,
        before: Option<Value>,
        after: Option<Value>,
    ) {
        let row = cleo_core::AuditLogRow {
            id: cleo_core::AuditId::new(),
            timestamp: chrono::Utc::now(),
            action: action.to_string(),
            task_id: task_id.map(str::to_string),
            actor: actor.to_string(),
            details: None,
            before,
            after,
            error: None,
        };
        if let Err(e) = self.audit.record(&self.accessor, &row).await {
            tracing::warn!(error = %e, action, "failed to append audit row");
        }
    }

    async fn audit_error(&self, action: &str, actor: &str, task_id: Option<&str>, before: Option<Value>, err: &CleoError) {
        let row = cleo_core::AuditLogRow {
            id: cleo_core::AuditId::new(),
            timestamp: chrono::Utc::now(),
            action: action.to_string(),
            task_id: task_id.map(str::to_string),
            actor: actor.to_string(),
            details: None,
            before,
            after: None,
            error: Some(err.message.clone()),
        };
        if let Err(e) = self.audit.record(&self.accessor, &row).await {
            tracing::warn!(error = %e, action, "failed to append audit row for failed call");
        }
    }

    /// Failure path reached before a `before` snapshot could even be
    /// attempted (unknown operation, rate limit) — still audited per spec
    /// §7 ("Audit rows are written even when the operation fails").
    async fn audit_failure(&self, action: &str, actor: &str, err: &CleoError) {
        self.audit_error(action, actor, None, None, err).await;
    }
}

fn error_body(err: &CleoError) -> ErrorBody {
    ErrorBody {
        code: err.code.to_string(),
        exit_code: err.exit_code(),
        message: err.message.clone(),
        details: None,
        fix: err.fix.clone(),
        alternatives: err.alternatives.clone(),
    }
}

/// Best-effort `taskId` extraction from a params object, used only to
/// decide whether an audit before/after snapshot is identifiable (spec
/// §4.8 step 4) — never fatal, never used for dispatch.
fn extract_task_id(params: &Value) -> Option<String> {
    params.get("taskId").and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
