use shared::error::ProtocolError;
use thiserror::Error;

pub const GENERIC_FAILURE_MESSAGE: &str = "Internal server error.";
pub const FALLBACK_FAILED_MESSAGE: &str = "You have failed the reCAPTCHA, please try again.";

/// Local checks that run before any network traffic. The display text is
/// what the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("At least one field has no value.")]
    MissingFields,
    #[error("Email is invalid.")]
    InvalidEmail,
    #[error("Passwords don't match.")]
    PasswordMismatch,
    #[error("The password reset link is missing its code.")]
    MissingResetCode,
    #[error("You need to select an image...")]
    MissingImage,
    #[error("You need to log in first.")]
    LoginRequired { login_location: String },
}

impl ValidationError {
    /// Some checks are answered by sending the user elsewhere instead of
    /// showing a notice.
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Self::LoginRequired { login_location } => Some(login_location),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Every way a submission flow can end other than success.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("fallback verification was rejected")]
    FallbackRejected { reason: &'static str },
    #[error("rejected with status {status}: {reason}")]
    Rejected { status: u16, reason: &'static str },
    #[error("resource gone: {reason}")]
    Gone { reason: &'static str },
    #[error("server error (status {status})")]
    Server { status: u16 },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("challenge provider failed: {0}")]
    Challenge(String),
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("malformed success response: {0}")]
    MalformedResponse(#[from] ProtocolError),
    #[error("no fallback verification is pending")]
    NoPendingFallback,
}

impl SubmissionError {
    /// Text of the single notice shown for this failure.
    pub fn notice_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::FallbackRejected { reason }
            | Self::Rejected { reason, .. }
            | Self::Gone { reason } => (*reason).to_string(),
            Self::NoPendingFallback => "There is no pending reCAPTCHA to complete.".to_string(),
            Self::Server { .. }
            | Self::Transport(_)
            | Self::Challenge(_)
            | Self::Encode(_)
            | Self::MalformedResponse(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}
