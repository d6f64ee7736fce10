use std::fmt;

use reqwest::StatusCode;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Failures reported by the remote data gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server answered {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("server rejected the request: {0}")]
    Rejected(String),
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: String },
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("gateway worker stopped: {0}")]
    Worker(String),
}

impl GatewayError {
    pub fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        GatewayError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Transport(err) if err.is_timeout())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Category,
    Post,
    Comment,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecordKind::Category => "category",
            RecordKind::Post => "post",
            RecordKind::Comment => "comment",
        };
        f.write_str(label)
    }
}
