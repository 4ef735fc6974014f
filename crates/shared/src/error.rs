use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("response body is not valid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("response field `{0}` is empty")]
    EmptyField(&'static str),
}
