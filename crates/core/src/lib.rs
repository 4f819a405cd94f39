pub mod artifact;
pub mod config;
pub mod error;
pub mod limiter;
pub mod metrics;
pub mod orchestrator;
pub mod provider;
pub mod session;
pub mod testing;

pub use artifact::{ArtifactStore, CleanupPolicy, DisposeOutcome};
pub use config::{
    load_config, load_config_from_str, validate_config, CatalogConfig, Config, ConfigError,
    StorageConfig,
};
pub use error::{ErrorKind, SelectionRejection, ServiceError};
pub use limiter::{ConcurrencyLimiter, LimiterClosed, Permit};
pub use orchestrator::{ActiveJob, DownloadJob, JobOrchestrator, JobsConfig, OrchestratorStatus};
pub use provider::{
    Artifact, CatalogProvider, ContentProvider, ContentRecord, ProviderError, SearchResultSet,
};
pub use session::{Reply, SelectionSession, SessionConfig, SessionState, SessionStore};
