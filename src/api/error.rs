//! Error types for the device API client

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// How a failed request should be presented to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Duplicate business key (HTTP 409)
    Conflict,
    /// Resource does not exist (HTTP 404)
    NotFound,
    /// Anything else, including transport failures
    Other,
}

impl std::fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflict => write!(f, "CONFLICT"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Other => write!(f, "REQUEST_FAILED"),
        }
    }
}

/// Device API error
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response, or its body could not be decoded
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("server returned {status}{}", detail_suffix(.detail))]
    Status {
        status: StatusCode,
        /// `detail` field from the error body, if there was one
        detail: Option<String>,
    },
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transport(e) => e.status(),
            Self::Status { status, .. } => Some(*status),
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Transport(_) => None,
            Self::Status { detail, .. } => detail.as_deref(),
        }
    }

    pub fn kind(&self) -> ApiErrorKind {
        map_status_to_kind(self.status())
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

/// Result type for device API operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Map HTTP status code to error kind
pub(crate) fn map_status_to_kind(status: Option<StatusCode>) -> ApiErrorKind {
    match status {
        Some(StatusCode::CONFLICT) => ApiErrorKind::Conflict,
        Some(StatusCode::NOT_FOUND) => ApiErrorKind::NotFound,
        _ => ApiErrorKind::Other,
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Message(String),
    /// Request validation failures come back as a list of field errors
    Fields(Vec<FieldDetail>),
}

#[derive(Debug, Deserialize)]
struct FieldDetail {
    #[serde(default)]
    loc: Vec<serde_json::Value>,
    msg: String,
}

/// Extract the human-readable `detail` from an error response body.
pub(crate) fn parse_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let detail = match parsed.detail? {
        ErrorDetail::Message(message) => message,
        ErrorDetail::Fields(fields) => fields
            .into_iter()
            .map(|f| match f.loc.last().and_then(|l| l.as_str()) {
                Some(field) => format!("{}: {}", field, f.msg),
                None => f.msg,
            })
            .collect::<Vec<_>>()
            .join("; "),
    };

    Some(detail).filter(|d| !d.is_empty())
}
