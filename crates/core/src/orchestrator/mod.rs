//! Job orchestrator for searches and fetch jobs.
//!
//! The orchestrator drives each fetch request through its pipeline:
//! - **Admission**: record id checked against the configured pattern
//! - **Permit**: bounded by the global concurrency limiter (excess jobs wait)
//! - **Fetch**: provider fetch under the job timeout, then artifact verification
//!
//! Delivery and cleanup happen outside, through [`JobOrchestrator::dispose_artifact`].

mod config;
mod runner;
mod types;

pub use config::JobsConfig;
pub use runner::JobOrchestrator;
pub use types::{ActiveJob, DownloadJob, OrchestratorStatus};
