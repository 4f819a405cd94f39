//! Selection session types and state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::provider::{ContentRecord, SearchResultSet};

/// Lifecycle of one user's selection session.
///
/// ```text
/// (none) --start--> Listed --select--> Selected  --> (removed)
///                     |    --cancel--> Cancelled --> (removed)
///                     |    --ttl-----> Expired   --> (removed)
///                     +----start-----> (replaced by a new Listed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Results were shown and a numeric reply is awaited.
    Listed,
    /// A record was chosen. Terminal.
    Selected,
    /// The user backed out. Terminal.
    Cancelled,
    /// The session outlived its time-to-live. Terminal.
    Expired,
}

impl SessionState {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Listed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        matches!(self, SessionState::Listed) && next.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Listed => "listed",
            SessionState::Selected => "selected",
            SessionState::Cancelled => "cancelled",
            SessionState::Expired => "expired",
        }
    }
}

/// One user's pending choice among their latest search results.
#[derive(Debug, Clone)]
pub struct SelectionSession {
    pub user_id: String,
    pub results: SearchResultSet,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    listed_at: Instant,
}

impl SelectionSession {
    pub(crate) fn new(user_id: impl Into<String>, results: SearchResultSet) -> Self {
        Self {
            user_id: user_id.into(),
            results,
            state: SessionState::Listed,
            created_at: Utc::now(),
            listed_at: Instant::now(),
        }
    }

    pub fn keyword(&self) -> &str {
        &self.results.keyword
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Time since the results were listed, on the runtime clock.
    pub fn age(&self) -> std::time::Duration {
        self.listed_at.elapsed()
    }

    pub(crate) fn is_expired(&self, ttl: Option<std::time::Duration>) -> bool {
        ttl.is_some_and(|ttl| self.age() >= ttl)
    }
}

/// Outcome of routing a free-text reply into a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The user picked this record; the session is gone.
    Selected(ContentRecord),
    /// The user cancelled; the session is gone.
    Cancelled,
}
