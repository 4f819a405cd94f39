//! Types for the job orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One fetch request, from queueing until it settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadJob {
    /// Unique job id (UUID).
    pub job_id: String,
    /// Record to fetch.
    pub record_id: String,
    /// User who asked for it.
    pub requester_id: String,
    /// Group the artifact is destined for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_group_id: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
}

impl DownloadJob {
    pub fn new(
        record_id: impl Into<String>,
        requester_id: impl Into<String>,
        destination_group_id: Option<&str>,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            record_id: record_id.into(),
            requester_id: requester_id.into(),
            destination_group_id: destination_group_id.map(str::to_string),
            created_at: Utc::now(),
        }
    }
}

/// A job currently holding a permit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveJob {
    /// The job.
    pub job: DownloadJob,
    /// When the permit was granted.
    pub started_at: DateTime<Utc>,
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Permit pool capacity.
    pub capacity: usize,
    /// Permits currently held.
    pub permits_in_use: usize,
    /// Jobs currently holding a permit, oldest first.
    pub active_jobs: Vec<ActiveJob>,
    /// Jobs that produced an artifact.
    pub total_completed: u64,
    /// Jobs that ended with an error.
    pub total_failed: u64,
    /// Whether the orchestrator stopped accepting jobs.
    pub shutting_down: bool,
}
