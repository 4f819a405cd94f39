//! Artifact storage and cleanup.
//!
//! Artifacts are produced by a provider into the store's download directory,
//! verified by the orchestrator, handed to the delivery collaborator, and
//! finally disposed of according to the configured [`CleanupPolicy`].

mod store;
mod types;

pub use store::ArtifactStore;
pub use types::{CleanupPolicy, DisposeOutcome};
