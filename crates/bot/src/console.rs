//! Line-oriented console front end.
//!
//! Each input line is treated as one chat message from a single configured
//! user. Commands start with `/`; any other text is offered to the user's
//! selection session, if one is open, and ignored otherwise.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use comicrelay_core::{Reply, ServiceError};

use crate::metrics;
use crate::render;
use crate::state::AppState;

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/jm <id>`
    Fetch(String),
    /// `/jm search <keyword>` or `/jm_search <keyword>`
    Search(String),
    Status,
    Metrics,
    Help,
    Quit,
    /// Anything that is not a known command.
    Text(String),
}

impl Command {
    /// Parses one line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Command> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        let command = match head {
            "/jm_search" => Command::Search(rest.to_string()),
            "/jm" => match rest.split_once(char::is_whitespace) {
                Some(("search", keyword)) => Command::Search(keyword.trim().to_string()),
                None if rest == "search" => Command::Search(String::new()),
                None if rest.is_empty() => Command::Help,
                _ => Command::Fetch(rest.to_string()),
            },
            "/status" => Command::Status,
            "/metrics" => Command::Metrics,
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            _ => Command::Text(line.to_string()),
        };
        Some(command)
    }

    fn label(&self) -> &'static str {
        match self {
            Command::Fetch(_) => "fetch",
            Command::Search(_) => "search",
            Command::Status => "status",
            Command::Metrics => "metrics",
            Command::Help => "help",
            Command::Quit => "quit",
            Command::Text(_) => "text",
        }
    }
}

/// Whether the read loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Dispatches console lines for one user.
pub struct Console {
    state: Arc<AppState>,
    user_id: String,
    group_id: Option<String>,
    replies: mpsc::UnboundedSender<String>,
    jobs: Mutex<JoinSet<()>>,
}

impl Console {
    pub fn new(
        state: Arc<AppState>,
        user_id: impl Into<String>,
        group_id: Option<String>,
        replies: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            state,
            user_id: user_id.into(),
            group_id,
            replies,
            jobs: Mutex::new(JoinSet::new()),
        }
    }

    pub async fn handle_line(&self, line: &str) -> Flow {
        let Some(command) = Command::parse(line) else {
            return Flow::Continue;
        };
        metrics::COMMANDS_TOTAL
            .with_label_values(&[command.label()])
            .inc();

        match command {
            Command::Fetch(record_id) => self.spawn_fetch(record_id).await,
            Command::Search(keyword) => self.search(&keyword).await,
            Command::Status => {
                let status = self.state.orchestrator().status();
                let sessions = self.state.sessions().len().await;
                self.reply(render::status(&status, sessions));
            }
            Command::Metrics => self.reply(metrics::encode_metrics()),
            Command::Help => self.reply(render::help()),
            Command::Quit => return Flow::Quit,
            Command::Text(text) => self.route_text(&text).await,
        }
        Flow::Continue
    }

    /// Waits for every spawned fetch to settle.
    pub async fn drain(&self) {
        let mut jobs = self.jobs.lock().await;
        while let Some(result) = jobs.join_next().await {
            if let Err(e) = result {
                warn!("Fetch task ended abnormally: {}", e);
            }
        }
    }

    async fn search(&self, keyword: &str) {
        if keyword.is_empty() {
            self.reply("Usage: /jm search <keyword>");
            return;
        }

        let results = match self
            .state
            .orchestrator()
            .run_search(keyword, &self.user_id)
            .await
        {
            Ok(results) => results,
            Err(e) => return self.reply_error(&e),
        };

        match self
            .state
            .sessions()
            .start_session(&self.user_id, results)
            .await
        {
            Ok(session) => self.reply(render::session_listing(&session)),
            Err(e) => self.reply_error(&e),
        }
    }

    async fn route_text(&self, text: &str) {
        if self.state.sessions().peek(&self.user_id).await.is_none() {
            if text.starts_with('/') {
                self.reply(format!("Unknown command.\n{}", render::help()));
            } else {
                debug!(user_id = %self.user_id, "No open session; ignoring message");
            }
            return;
        }

        match self.state.sessions().route_reply(&self.user_id, text).await {
            Ok(Reply::Selected(record)) => {
                self.reply(format!("Selected [{}] {}.", record.id, record.title));
                self.spawn_fetch(record.id).await;
            }
            Ok(Reply::Cancelled) => self.reply("Cancelled."),
            Err(ServiceError::NoActiveSession { .. }) => {
                debug!(user_id = %self.user_id, "Session closed before the reply was routed");
            }
            Err(e) => self.reply_error(&e),
        }
    }

    async fn spawn_fetch(&self, record_id: String) {
        self.reply(format!("Downloading {}...", record_id));

        let state = Arc::clone(&self.state);
        let user_id = self.user_id.clone();
        let group_id = self.group_id.clone();
        let replies = self.replies.clone();

        let mut jobs = self.jobs.lock().await;
        while let Some(finished) = jobs.try_join_next() {
            if let Err(e) = finished {
                warn!("Fetch task ended abnormally: {}", e);
            }
        }
        jobs.spawn(async move {
            let message = fetch_and_deliver(&state, &record_id, &user_id, group_id.as_deref()).await;
            let _ = replies.send(message);
        });
    }

    fn reply(&self, message: impl Into<String>) {
        if self.replies.send(message.into()).is_err() {
            warn!("Reply channel closed");
        }
    }

    fn reply_error(&self, err: &ServiceError) {
        self.reply(error_message(err));
    }
}

fn error_message(err: &ServiceError) -> String {
    match render::retry_hint(err) {
        Some(hint) => format!("{} {}", render::service_error(err), hint),
        None => render::service_error(err),
    }
}

/// Runs one fetch job, delivers the artifact, then always disposes of it.
async fn fetch_and_deliver(
    state: &AppState,
    record_id: &str,
    user_id: &str,
    group_id: Option<&str>,
) -> String {
    let artifact = match state
        .orchestrator()
        .run_fetch_job(record_id, user_id, group_id)
        .await
    {
        Ok(artifact) => artifact,
        Err(e) => return error_message(&e),
    };

    let message = match state.delivery().deliver(&artifact, group_id).await {
        Ok(path) => format!("Sent {} -> {}", artifact.name, path.display()),
        Err(e) => {
            error!(record_id, "Delivery failed: {:#}", e);
            format!("Could not send {}.", artifact.name)
        }
    };

    state.orchestrator().dispose_artifact(&artifact).await;
    message
}
