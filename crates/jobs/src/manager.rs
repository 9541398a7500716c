//! `JobManager` (spec §4.6): tracks background jobs through
//! [`cleo_storage::SafeAccessor`] for durability, and holds a
//! `CancellationToken` per running job in memory for cooperative abort —
//! mirroring the teacher's per-connection `CancellationToken` + `select!`
//! race pattern (`listener/mod.rs`), scaled to whole jobs instead of
//! single requests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cleo_core::{BackgroundJob, BackgroundJobId, BackgroundJobStatus, CleoError};
use cleo_storage::{DataAccessor, SafeAccessor};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const DEFAULT_CONCURRENT_CAP: usize = 10;
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

pub struct JobManager {
    accessor: Arc<SafeAccessor>,
    handles: Arc<Mutex<HashMap<BackgroundJobId, CancellationToken>>>,
    cap: usize,
    retention: Duration,
    shutdown: CancellationToken,
    sweep: Option<JoinHandle<()>>,
}

impl JobManager {
    pub fn new(accessor: Arc<SafeAccessor>) -> Self {
        Self::with_limits(accessor, DEFAULT_CONCURRENT_CAP, DEFAULT_RETENTION)
    }

    pub fn with_limits(accessor: Arc<SafeAccessor>, cap: usize, retention: Duration) -> Self {
        let handles: Arc<Mutex<HashMap<BackgroundJobId, CancellationToken>>> = Arc::new(Mutex::new(HashMap::new()));
        let shutdown = CancellationToken::new();

        let sweep_accessor = Arc::clone(&accessor);
        let sweep_handles = Arc::clone(&handles);
        let sweep_shutdown = shutdown.clone();
        let sweep = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = sweep_once(&sweep_accessor, &sweep_handles, retention).await {
                            warn!(error = %e, "job sweep failed");
                        }
                    }
                    _ = sweep_shutdown.cancelled() => break,
                }
            }
        });

        Self { accessor, handles, cap, retention, shutdown, sweep: Some(sweep) }
    }

    /// Start a new job, failing with `E_JOB_LIMIT` above the concurrent
    /// cap (spec §4.6).
    pub async fn start(&self, operation: impl Into<String>) -> Result<BackgroundJob, CleoError> {
        let running = self
            .accessor
            .list_jobs()
            .await?
            .into_iter()
            .filter(|j| !j.status.is_terminal())
            .count();
        if running >= self.cap {
            return Err(CleoError::job_limit(self.cap));
        }

        let job = BackgroundJob {
            id: BackgroundJobId::new(),
            operation: operation.into(),
            status: BackgroundJobStatus::Running,
            started_at: chrono::Utc::now(),
            completed_at: None,
            result: None,
            error: None,
            progress: 0,
        };
        self.accessor.insert_job(&job).await?;
        self.handles.lock().insert(job.id, CancellationToken::new());
        Ok(job)
    }

    /// The cancellation token a job's worker task should race against
    /// (spec §4.6: "each job owns an abort signal").
    pub fn cancellation_token(&self, id: BackgroundJobId) -> Option<CancellationToken> {
        self.handles.lock().get(&id).cloned()
    }

    /// Clamp progress to `[0, 100]` and persist it (spec §4.6).
    pub async fn update_progress(&self, id: BackgroundJobId, progress: u8) -> Result<BackgroundJob, CleoError> {
        let mut job = self.fetch(id).await?;
        job.progress = progress.min(100);
        self.accessor.replace_job(&job).await?;
        Ok(job)
    }

    pub async fn complete(&self, id: BackgroundJobId, result: Option<Value>) -> Result<BackgroundJob, CleoError> {
        let mut job = self.fetch(id).await?;
        job.status = BackgroundJobStatus::Completed;
        job.completed_at = Some(chrono::Utc::now());
        job.progress = 100;
        job.result = result;
        self.accessor.replace_job(&job).await?;
        self.handles.lock().remove(&id);
        Ok(job)
    }

    pub async fn fail(&self, id: BackgroundJobId, error: impl Into<String>) -> Result<BackgroundJob, CleoError> {
        let mut job = self.fetch(id).await?;
        job.status = BackgroundJobStatus::Failed;
        job.completed_at = Some(chrono::Utc::now());
        job.error = Some(error.into());
        self.accessor.replace_job(&job).await?;
        self.handles.lock().remove(&id);
        Ok(job)
    }

    /// Cancel a running job: flips status to `cancelled` and fires its
    /// abort signal (spec §4.6).
    pub async fn cancel(&self, id: BackgroundJobId) -> Result<BackgroundJob, CleoError> {
        let mut job = self.fetch(id).await?;
        job.status = BackgroundJobStatus::Cancelled;
        job.completed_at = Some(chrono::Utc::now());
        self.accessor.replace_job(&job).await?;
        if let Some(token) = self.handles.lock().remove(&id) {
            token.cancel();
        }
        Ok(job)
    }

    pub async fn get(&self, id: BackgroundJobId) -> Result<Option<BackgroundJob>, CleoError> {
        self.accessor.get_job(id).await
    }

    pub async fn list(&self) -> Result<Vec<BackgroundJob>, CleoError> {
        self.accessor.list_jobs().await
    }

    async fn fetch(&self, id: BackgroundJobId) -> Result<BackgroundJob, CleoError> {
        self.accessor.get_job(id).await?.ok_or_else(|| CleoError::not_found("job", &id.to_string()))
    }
}

async fn sweep_once(
    accessor: &SafeAccessor,
    handles: &Mutex<HashMap<BackgroundJobId, CancellationToken>>,
    retention: Duration,
) -> Result<(), CleoError> {
    let now = chrono::Utc::now();
    let jobs = accessor.list_jobs().await?;
    let mut removed = 0;
    for job in jobs {
        let Some(completed_at) = job.completed_at else { continue };
        if !job.status.is_terminal() {
            continue;
        }
        let age = now.signed_duration_since(completed_at).to_std().unwrap_or(Duration::ZERO);
        if age >= retention {
            accessor.delete_job(job.id).await?;
            handles.lock().remove(&job.id);
            removed += 1;
        }
    }
    if removed > 0 {
        info!(removed, "job sweep removed terminal jobs past retention");
    }
    Ok(())
}

impl Drop for JobManager {
    /// Abort every still-running job and stop the sweep task (spec §4.6:
    /// "destruction aborts all running jobs and stops the sweep").
    fn drop(&mut self) {
        self.shutdown.cancel();
        for (_, token) in self.handles.lock().drain() {
            token.cancel();
        }
        if let Some(sweep) = self.sweep.take() {
            sweep.abort();
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
