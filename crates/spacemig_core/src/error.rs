//! Error taxonomy for collaborator calls and per-item failures.
//!
//! `ApiError` is what the source/target clients return. `ItemError` is what a
//! single migrated item can fail with; it never aborts the run. Run-level and
//! command-level failures use `anyhow`.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The call itself failed: a non-success status, a timeout or a transport
    /// error. A `Decode` failure came back with a success status.
    pub fn is_call_failure(&self) -> bool {
        !matches!(self, Self::Decode(_))
    }

    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport(_) => true,
            Self::Status { status, .. } => is_transient_status(*status),
            Self::Decode(_) => false,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ItemError {
    /// Timeout, connection failure or 5xx. Not retried.
    #[error("transient network error: {message}")]
    Transient { message: String, status: Option<u16> },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("creation failed with HTTP {status}: {body}")]
    Creation { status: u16, body: String },

    #[error("folder creation failed ({folder}); fallback page creation also failed ({fallback})")]
    FallbackExhausted {
        folder: Box<ItemError>,
        fallback: Box<ItemError>,
    },

    #[error("target space unavailable")]
    SpaceUnavailable,
}

impl ItemError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transient { status, .. } => *status,
            Self::Creation { status, .. } => Some(*status),
            Self::FallbackExhausted { fallback, .. } => fallback.status(),
            Self::Validation(_) | Self::SpaceUnavailable => None,
        }
    }
}

impl From<ApiError> for ItemError {
    fn from(error: ApiError) -> Self {
        match error {
            error if error.is_transient() => Self::Transient {
                message: error.to_string(),
                status: error.status(),
            },
            ApiError::Status { status, body } => Self::Creation { status, body },
            ApiError::Decode(message) => Self::Validation(message),
            other @ (ApiError::Timeout { .. } | ApiError::Transport(_)) => Self::Transient {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

fn is_transient_status(status: u16) -> bool {
    status >= 500 || status == 408 || status == 429
}
