//! Types for artifact lifecycle management.

use serde::{Deserialize, Serialize};

/// What happens to an artifact after it has been handed to delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    /// Delete the backing file once delivery was attempted.
    DeleteAfterDelivery,
    /// Keep the backing file.
    Retain,
}

impl CleanupPolicy {
    /// Maps the boolean `delete_after_delivery` setting.
    pub fn from_delete_flag(delete_after_delivery: bool) -> Self {
        if delete_after_delivery {
            Self::DeleteAfterDelivery
        } else {
            Self::Retain
        }
    }
}

/// Result of disposing an artifact. Never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposeOutcome {
    /// The file was deleted.
    Deleted,
    /// Policy says keep it.
    Retained,
    /// Nothing to delete; the postcondition already holds.
    AlreadyAbsent,
    /// Deletion failed; logged and left in place.
    Failed,
}

impl DisposeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisposeOutcome::Deleted => "deleted",
            DisposeOutcome::Retained => "retained",
            DisposeOutcome::AlreadyAbsent => "already_absent",
            DisposeOutcome::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_flag() {
        assert_eq!(
            CleanupPolicy::from_delete_flag(true),
            CleanupPolicy::DeleteAfterDelivery
        );
        assert_eq!(CleanupPolicy::from_delete_flag(false), CleanupPolicy::Retain);
    }

    #[test]
    fn test_policy_serialization() {
        assert_eq!(
            serde_json::to_string(&CleanupPolicy::DeleteAfterDelivery).unwrap(),
            "\"delete_after_delivery\""
        );
    }
}
