//! Text rendering for console replies.

use std::fmt::Write;

use comicrelay_core::{
    ErrorKind, OrchestratorStatus, SelectionRejection, SelectionSession, ServiceError,
};

/// Renders a listed session as a numbered menu.
pub fn session_listing(session: &SelectionSession) -> String {
    let results = &session.results;
    let mut out = String::new();

    if results.is_truncated() {
        let _ = writeln!(
            out,
            "Found {} results for \"{}\", showing the first {}:",
            results.total_found,
            results.keyword,
            results.len()
        );
    } else {
        let _ = writeln!(
            out,
            "Found {} results for \"{}\":",
            results.len(),
            results.keyword
        );
    }

    for (i, record) in results.records.iter().enumerate() {
        let _ = write!(out, "{}. [{}] {}", i + 1, record.id, record.title);
        if let Some(author) = &record.author {
            let _ = write!(out, " - {}", author);
        }
        if !record.tags.is_empty() {
            let _ = write!(out, " ({})", record.tags.join(", "));
        }
        out.push('\n');
    }

    let _ = write!(out, "Reply with a number to download, or \"cancel\" to stop.");
    out
}

/// Renders a failure the way the user should see it. Each kind reads differently.
pub fn service_error(err: &ServiceError) -> String {
    match err {
        ServiceError::RecordNotFound { id, .. } => {
            format!("Nothing found for id {}. Check the number and try again.", id)
        }
        ServiceError::ProviderRateLimited { .. } => {
            "The source is rate limiting us. Please wait a minute before trying again.".to_string()
        }
        ServiceError::ProviderTransient { .. } => {
            "The source did not respond in time. Try again shortly.".to_string()
        }
        ServiceError::ConversionFailed { .. } => {
            "Downloaded, but converting to PDF failed.".to_string()
        }
        ServiceError::ArtifactMissing { .. } => {
            "The download finished but the file is missing. Please try again.".to_string()
        }
        ServiceError::InvalidSelection { reason, .. } => match reason {
            SelectionRejection::NotANumber => {
                "Please reply with the number of a result, or \"cancel\".".to_string()
            }
            SelectionRejection::OutOfRange { len } => {
                format!("Please pick a number between 1 and {}.", len)
            }
            SelectionRejection::NoSession => {
                "There is nothing to choose from. Search first.".to_string()
            }
            SelectionRejection::Expired => {
                "Those search results have expired. Please search again.".to_string()
            }
        },
        ServiceError::NoActiveSession { .. } => {
            "There is nothing to choose from. Search first.".to_string()
        }
        ServiceError::InvalidRecordId { id } => format!("\"{}\" is not a valid id.", id),
        ServiceError::EmptyResults { keyword } => format!("No results for \"{}\".", keyword),
        ServiceError::Unknown { .. } => "Something went wrong. Please try again later.".to_string(),
    }
}

/// Whether an error is worth surfacing with a retry hint.
pub fn retry_hint(err: &ServiceError) -> Option<&'static str> {
    match err.kind() {
        ErrorKind::ProviderRateLimited | ErrorKind::ProviderTransient => Some("(retryable)"),
        _ => None,
    }
}

pub fn status(status: &OrchestratorStatus, sessions: usize) -> String {
    let mut out = format!(
        "permits: {}/{} in use | completed: {} | failed: {} | sessions: {}",
        status.permits_in_use,
        status.capacity,
        status.total_completed,
        status.total_failed,
        sessions
    );
    if status.shutting_down {
        out.push_str(" | shutting down");
    }
    for active in &status.active_jobs {
        let _ = write!(
            out,
            "\n  {} for {} since {}",
            active.job.record_id,
            active.job.requester_id,
            active.started_at.format("%H:%M:%S")
        );
    }
    out
}

pub fn help() -> &'static str {
    "Commands:\n  /jm <id>            download a record\n  /jm search <words>  search (also /jm_search)\n  /status             job status\n  /metrics            prometheus metrics\n  /quit               exit"
}

#[cfg(test)]
mod tests {
    use super::*;
    use comicrelay_core::testing::fixtures;
    use comicrelay_core::{SessionConfig, SessionStore};
    use std::collections::HashSet;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_listing_numbers_records() {
        let store = SessionStore::new(SessionConfig::default().with_max_results(2));
        let session = store
            .start_session("u", fixtures::sample_results())
            .await
            .unwrap();

        let text = session_listing(&session);
        assert!(text.starts_with("Found 3 results for \"示例\", showing the first 2:"));
        assert!(text.contains("1. [100001] 示例漫画一 - 测试作者 (测试)"));
        assert!(text.contains("2. [100002]"));
        assert!(!text.contains("3. "));
    }

    #[test]
    fn test_each_kind_renders_distinctly() {
        let errors = vec![
            ServiceError::not_found("1"),
            ServiceError::ProviderRateLimited { source: None },
            ServiceError::ProviderTransient {
                detail: "t".into(),
                source: None,
            },
            ServiceError::ConversionFailed {
                detail: "c".into(),
                source: None,
            },
            ServiceError::ArtifactMissing {
                path: PathBuf::from("/x"),
            },
            ServiceError::invalid_selection("9", SelectionRejection::OutOfRange { len: 3 }),
            ServiceError::InvalidRecordId { id: "x".into() },
            ServiceError::EmptyResults {
                keyword: "k".into(),
            },
            ServiceError::unknown("u"),
        ];

        let rendered: HashSet<String> = errors.iter().map(service_error).collect();
        assert_eq!(rendered.len(), errors.len());
    }

    #[test]
    fn test_retry_hint() {
        assert!(retry_hint(&ServiceError::ProviderRateLimited { source: None }).is_some());
        assert!(retry_hint(&ServiceError::not_found("1")).is_none());
    }
}
