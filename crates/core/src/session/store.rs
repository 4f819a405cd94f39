//! In-memory session store.
//!
//! A single `RwLock` guards the whole map, so every operation on a user is
//! linearized and a `select` can never see a half-replaced session.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, info};

use super::config::SessionConfig;
use super::types::{Reply, SelectionSession, SessionState};
use crate::error::{SelectionRejection, ServiceError};
use crate::metrics;
use crate::provider::{ContentRecord, SearchResultSet};

/// Replies that cancel a pending selection (compared case-insensitively).
const CANCEL_WORDS: &[&str] = &["取消", "cancel", "q"];

type Sessions = HashMap<String, SelectionSession>;

/// Holds at most one selection session per user.
pub struct SessionStore {
    config: SessionConfig,
    sessions: RwLock<Sessions>,
}

impl SessionStore {
    /// Creates an empty store. A `max_results` of zero is raised to one.
    pub fn new(mut config: SessionConfig) -> Self {
        config.max_results = config.max_results.max(1);
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Lists `results` for `user_id`, replacing any session they already had.
    ///
    /// Results beyond `max_results` are dropped. Returns a snapshot of the
    /// stored session for rendering.
    pub async fn start_session(
        &self,
        user_id: &str,
        results: SearchResultSet,
    ) -> Result<SelectionSession, ServiceError> {
        if results.is_empty() {
            return Err(ServiceError::EmptyResults {
                keyword: results.keyword,
            });
        }

        let session = SelectionSession::new(user_id, results.truncated(self.config.max_results));
        let snapshot = session.clone();

        let mut sessions = self.sessions.write().await;
        match sessions.insert(user_id.to_string(), session) {
            Some(previous) => info!(
                user_id,
                superseded_keyword = %previous.keyword(),
                keyword = %snapshot.keyword(),
                "Replaced pending selection with new search results"
            ),
            None => {
                metrics::ACTIVE_SESSIONS.inc();
                debug!(user_id, keyword = %snapshot.keyword(), listed = snapshot.len(), "Selection session started");
            }
        }

        Ok(snapshot)
    }

    /// Consumes the user's session by picking the record at a 1-based position.
    ///
    /// `raw` may carry surrounding whitespace and a leading `#`. A rejected
    /// reply leaves the session as it was, except an expired one, which is
    /// removed.
    pub async fn select(&self, user_id: &str, raw: &str) -> Result<ContentRecord, ServiceError> {
        let mut sessions = self.sessions.write().await;
        self.select_locked(&mut sessions, user_id, raw)
    }

    /// Removes the user's session. Returns whether one existed.
    pub async fn cancel(&self, user_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        if self.take_if_expired(&mut sessions, user_id) {
            return false;
        }
        finish(&mut sessions, user_id, SessionState::Cancelled).is_some()
    }

    /// Returns a copy of the user's live session. Expired sessions read as absent.
    pub async fn peek(&self, user_id: &str) -> Option<SelectionSession> {
        let sessions = self.sessions.read().await;
        sessions
            .get(user_id)
            .filter(|s| !s.is_expired(self.config.ttl()))
            .cloned()
    }

    /// Feeds a free-text message into the user's session.
    ///
    /// Cancel words end the session; anything else is treated as a selection.
    /// Without a live session this returns `NoActiveSession`, meaning the
    /// message was not meant for us.
    pub async fn route_reply(&self, user_id: &str, text: &str) -> Result<Reply, ServiceError> {
        let mut sessions = self.sessions.write().await;
        if self.take_if_expired(&mut sessions, user_id) || !sessions.contains_key(user_id) {
            return Err(ServiceError::NoActiveSession {
                user_id: user_id.to_string(),
            });
        }

        if is_cancel_word(text) {
            finish(&mut sessions, user_id, SessionState::Cancelled);
            return Ok(Reply::Cancelled);
        }

        self.select_locked(&mut sessions, user_id, text)
            .map(Reply::Selected)
    }

    /// Drops every expired session. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let Some(ttl) = self.config.ttl() else {
            return 0;
        };

        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .values()
            .filter(|s| s.is_expired(Some(ttl)))
            .map(|s| s.user_id.clone())
            .collect();

        for user_id in &expired {
            finish(&mut sessions, user_id, SessionState::Expired);
        }
        if !expired.is_empty() {
            info!(removed = expired.len(), "Purged expired selection sessions");
        }
        expired.len()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        let ttl = self.config.ttl();
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| !s.is_expired(ttl))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn select_locked(
        &self,
        sessions: &mut Sessions,
        user_id: &str,
        raw: &str,
    ) -> Result<ContentRecord, ServiceError> {
        let input = raw.trim();

        if self.take_if_expired(sessions, user_id) {
            return Err(ServiceError::invalid_selection(input, SelectionRejection::Expired));
        }

        let Some(session) = sessions.get(user_id) else {
            metrics::SELECTIONS.with_label_values(&["invalid"]).inc();
            return Err(ServiceError::invalid_selection(input, SelectionRejection::NoSession));
        };

        let rejection = match parse_position(input) {
            None => SelectionRejection::NotANumber,
            Some(position) => match usize::try_from(position)
                .ok()
                .and_then(|p| session.results.get_one_based(p))
            {
                Some(record) => {
                    let record = record.clone();
                    finish(sessions, user_id, SessionState::Selected);
                    info!(user_id, record_id = %record.id, "Record selected");
                    return Ok(record);
                }
                None => SelectionRejection::OutOfRange { len: session.len() },
            },
        };

        metrics::SELECTIONS.with_label_values(&["invalid"]).inc();
        debug!(user_id, input, %rejection, "Selection rejected");
        Err(ServiceError::invalid_selection(input, rejection))
    }

    /// Removes the user's session if it has expired.
    fn take_if_expired(&self, sessions: &mut Sessions, user_id: &str) -> bool {
        let expired = sessions
            .get(user_id)
            .is_some_and(|s| s.is_expired(self.config.ttl()));
        if expired {
            finish(sessions, user_id, SessionState::Expired);
        }
        expired
    }
}

/// Moves a session into a terminal state and drops it from the map.
fn finish(sessions: &mut Sessions, user_id: &str, state: SessionState) -> Option<SelectionSession> {
    let mut session = sessions.remove(user_id)?;
    debug_assert!(session.state.can_transition_to(state));
    session.state = state;

    metrics::ACTIVE_SESSIONS.dec();
    metrics::SELECTIONS.with_label_values(&[state.as_str()]).inc();
    debug!(user_id, state = state.as_str(), keyword = %session.keyword(), "Selection session closed");
    Some(session)
}

/// Parses a selection reply. Surrounding whitespace and one leading `#`
/// (optionally followed by spaces) are ignored, so `2`, ` 2 `, `#2`, `# 2`
/// and `+2` all read as 2. Signs are accepted; non-positive numbers are
/// rejected later as out of range.
fn parse_position(input: &str) -> Option<i64> {
    let digits = input.strip_prefix('#').unwrap_or(input).trim();
    digits.parse::<i64>().ok()
}

fn is_cancel_word(text: &str) -> bool {
    let text = text.trim();
    CANCEL_WORDS.iter().any(|w| w.eq_ignore_ascii_case(text))
}
