//! Status-code classification shared by every action.

use tracing::warn;

/// Result of one server round-trip, before the action interprets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome<T> {
    Success(T),
    Rejected { status: u16, reason: &'static str },
    /// The server did not trust the attached challenge (HTTP 400).
    BotSuspected,
    Gone { reason: &'static str },
    ServerError { status: u16 },
}

/// Maps a status code onto the outcome enum using the action's own
/// rejection table. Anything the table does not name is a server error.
pub fn classify<T>(
    status: u16,
    body: T,
    rejections: &[(u16, &'static str)],
    gone: Option<&'static str>,
) -> SubmissionOutcome<T> {
    match (status, gone) {
        (200..=299, _) => SubmissionOutcome::Success(body),
        (400, _) => SubmissionOutcome::BotSuspected,
        (410, Some(reason)) => SubmissionOutcome::Gone { reason },
        _ => match rejections.iter().find(|(code, _)| *code == status) {
            Some(&(_, reason)) => SubmissionOutcome::Rejected { status, reason },
            None => {
                if !(500..=599).contains(&status) {
                    warn!(status, "unexpected status treated as server error");
                }
                SubmissionOutcome::ServerError { status }
            }
        },
    }
}
