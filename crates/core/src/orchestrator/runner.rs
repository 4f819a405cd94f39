//! Job orchestrator implementation.
//!
//! Runs fetch pipelines under the global permit pool:
//! - acquire a permit (waiting is backpressure, not failure)
//! - fetch through the provider, bounded by the job timeout
//! - verify the artifact exists
//! - release the permit before the result propagates

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use regex_lite::Regex;
use tracing::{debug, error, info, warn};

use crate::artifact::{ArtifactStore, DisposeOutcome};
use crate::config::ConfigError;
use crate::error::ServiceError;
use crate::limiter::ConcurrencyLimiter;
use crate::metrics;
use crate::provider::{
    classify_fetch_error, classify_search_error, Artifact, ContentProvider, SearchResultSet,
};

use super::config::JobsConfig;
use super::types::{ActiveJob, DownloadJob, OrchestratorStatus};

type ActiveJobs = Arc<Mutex<HashMap<String, ActiveJob>>>;

/// Removes a job from the active set when dropped, so cancelled jobs are
/// untracked as well.
struct ActiveJobGuard {
    jobs: ActiveJobs,
    job_id: String,
}

impl ActiveJobGuard {
    fn register(jobs: &ActiveJobs, job: &DownloadJob) -> Self {
        let mut map = jobs.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(
            job.job_id.clone(),
            ActiveJob {
                job: job.clone(),
                started_at: Utc::now(),
            },
        );
        Self {
            jobs: Arc::clone(jobs),
            job_id: job.job_id.clone(),
        }
    }
}

impl Drop for ActiveJobGuard {
    fn drop(&mut self) {
        let mut map = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(&self.job_id);
    }
}

#[derive(Default)]
struct JobStats {
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Coordinates searches and fetch jobs against a content provider.
pub struct JobOrchestrator {
    config: JobsConfig,
    provider: Arc<dyn ContentProvider>,
    artifacts: ArtifactStore,
    limiter: ConcurrencyLimiter,
    record_id_pattern: Option<Regex>,
    active_jobs: ActiveJobs,
    stats: Arc<JobStats>,
}

impl JobOrchestrator {
    /// Creates a new orchestrator.
    ///
    /// Fails only if `record_id_pattern` is not a valid regex.
    pub fn new(
        config: JobsConfig,
        provider: Arc<dyn ContentProvider>,
        artifacts: ArtifactStore,
    ) -> Result<Self, ConfigError> {
        let record_id_pattern = config
            .record_id_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| {
                ConfigError::ValidationError(format!("jobs.record_id_pattern is invalid: {}", e))
            })?;

        let limiter = ConcurrencyLimiter::new(config.max_concurrent_downloads);
        info!(
            provider = provider.name(),
            capacity = limiter.capacity(),
            timeout_secs = config.job_timeout_secs,
            "Job orchestrator initialized"
        );

        Ok(Self {
            config,
            provider,
            artifacts,
            limiter,
            record_id_pattern,
            active_jobs: Arc::new(Mutex::new(HashMap::new())),
            stats: Arc::new(JobStats::default()),
        })
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Searches the provider.
    ///
    /// An empty result set is `Ok`; callers must not start a selection
    /// session from it.
    pub async fn run_search(
        &self,
        keyword: &str,
        requester_id: &str,
    ) -> Result<SearchResultSet, ServiceError> {
        let keyword = keyword.trim();
        info!(keyword, requester_id, "Searching provider");

        match self.provider.search(keyword).await {
            Ok(records) => {
                let results = SearchResultSet::new(keyword, records);
                let outcome = if results.is_empty() { "empty" } else { "results" };
                metrics::SEARCHES.with_label_values(&[outcome]).inc();
                info!(keyword, found = results.len(), "Search completed");
                Ok(results)
            }
            Err(e) => match classify_search_error(keyword, e) {
                None => {
                    warn!(keyword, "Provider reported not-found for a search; treating as empty");
                    metrics::SEARCHES.with_label_values(&["empty"]).inc();
                    Ok(SearchResultSet::new(keyword, Vec::new()))
                }
                Some(err) => {
                    metrics::SEARCHES.with_label_values(&["failed"]).inc();
                    error!(keyword, kind = %err.kind(), "Search failed: {}", err);
                    Err(err)
                }
            },
        }
    }

    /// Fetches and converts a record under the concurrency cap.
    ///
    /// Waits for a permit if the pool is exhausted. The permit is released on
    /// every exit path, including when the returned future is dropped.
    pub async fn run_fetch_job(
        &self,
        record_id: &str,
        requester_id: &str,
        destination_group_id: Option<&str>,
    ) -> Result<Artifact, ServiceError> {
        let record_id = record_id.trim();
        if let Some(pattern) = &self.record_id_pattern {
            if !pattern.is_match(record_id) {
                warn!(record_id, requester_id, "Rejecting malformed record id");
                metrics::FETCH_JOBS
                    .with_label_values(&["invalid_record_id"])
                    .inc();
                return Err(ServiceError::InvalidRecordId {
                    id: record_id.to_string(),
                });
            }
        }

        let job = DownloadJob::new(record_id, requester_id, destination_group_id);
        info!(
            job_id = %job.job_id,
            record_id,
            requester_id,
            group = destination_group_id.unwrap_or("-"),
            "Fetch job queued"
        );

        let result = self.execute(&job).await;

        match &result {
            Ok(artifact) => {
                self.stats.completed.fetch_add(1, Ordering::Relaxed);
                metrics::FETCH_JOBS.with_label_values(&["completed"]).inc();
                info!(job_id = %job.job_id, record_id, path = %artifact.path.display(), "Fetch job completed");
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                metrics::FETCH_JOBS.with_label_values(&[e.kind().as_str()]).inc();
                match e {
                    ServiceError::RecordNotFound { .. } => {
                        warn!(job_id = %job.job_id, record_id, "Requested record not found")
                    }
                    _ => error!(job_id = %job.job_id, record_id, kind = %e.kind(), "Fetch job failed: {}", e),
                }
            }
        }

        result
    }

    async fn execute(&self, job: &DownloadJob) -> Result<Artifact, ServiceError> {
        let permit = self.limiter.acquire().await.map_err(|e| ServiceError::Unknown {
            detail: "orchestrator is shutting down".to_string(),
            source: Some(Box::new(e)),
        })?;
        let tracking = ActiveJobGuard::register(&self.active_jobs, job);
        debug!(job_id = %job.job_id, in_use = self.limiter.in_use(), "Permit acquired");

        let started = Instant::now();
        let timeout = self.config.job_timeout();
        let result = match tokio::time::timeout(timeout, self.provider.fetch(&job.record_id)).await
        {
            Ok(Ok(artifact)) => self.confirm_artifact(artifact).await,
            Ok(Err(e)) => Err(classify_fetch_error(&job.record_id, e)),
            Err(_) => Err(ServiceError::ProviderTransient {
                detail: format!(
                    "fetch of {} exceeded {}s",
                    job.record_id, self.config.job_timeout_secs
                ),
                source: None,
            }),
        };

        let label = if result.is_ok() { "success" } else { "failed" };
        metrics::FETCH_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        drop(tracking);
        permit.release();
        debug!(job_id = %job.job_id, "Permit released");

        result
    }

    /// Checks that a reported artifact is actually on disk.
    ///
    /// If the reported path is absent, a file for the same record in the
    /// download directory is accepted instead.
    async fn confirm_artifact(&self, artifact: Artifact) -> Result<Artifact, ServiceError> {
        match self.artifacts.verify(&artifact).await {
            Ok(()) => Ok(artifact),
            Err(missing) => match self.artifacts.locate(&artifact.record_id).await {
                Some(found) => {
                    warn!(
                        record_id = %artifact.record_id,
                        reported = %artifact.path.display(),
                        found = %found.path.display(),
                        "Artifact not at reported path; using located file"
                    );
                    Ok(found)
                }
                None => Err(missing),
            },
        }
    }

    /// Applies the cleanup policy to an artifact after delivery was attempted.
    pub async fn dispose_artifact(&self, artifact: &Artifact) -> DisposeOutcome {
        self.artifacts.dispose(artifact).await
    }

    /// Stops accepting new jobs. Jobs already holding a permit run to completion;
    /// jobs waiting for one fail.
    pub fn shutdown(&self) {
        info!("Job orchestrator shutting down");
        self.limiter.close();
    }

    /// Get current orchestrator status.
    pub fn status(&self) -> OrchestratorStatus {
        let mut active_jobs: Vec<ActiveJob> = self
            .active_jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        active_jobs.sort_by_key(|a| a.started_at);

        OrchestratorStatus {
            capacity: self.limiter.capacity(),
            permits_in_use: self.limiter.in_use(),
            active_jobs,
            total_completed: self.stats.completed.load(Ordering::Relaxed),
            total_failed: self.stats.failed.load(Ordering::Relaxed),
            shutting_down: self.limiter.is_closed(),
        }
    }
}
