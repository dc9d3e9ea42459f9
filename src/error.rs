use thiserror::Error;

/// Everything a store or the API client can fail with.
#[derive(Debug, Error)]
pub enum CrmError {
    /// Input rejected before any request went out.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The server refused a uniqueness constraint (HTTP 409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other non-success status, with the raw response body.
    #[error("HTTP {status}: {body}")]
    Request { status: u16, body: String },

    /// Missing or rejected credential. The session has already been cleared.
    #[error("not authenticated: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("server returned no body where one was expected")]
    EmptyResponse,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CrmError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for errors that mean the user has to log in again.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

pub type Result<T> = std::result::Result<T, CrmError>;
