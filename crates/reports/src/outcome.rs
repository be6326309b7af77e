//! The status envelope every report is returned in.

use serde::Serialize;
use serde_json::{json, Value};
use stockwise_odata::{FetchError, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    /// Some data could not be fetched; the payload is still well formed.
    Partial,
    Error,
}

/// A failure summarized for the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorInfo {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<&FetchError> for ErrorInfo {
    fn from(err: &FetchError) -> Self {
        let details = match err {
            FetchError::Transport(TransportError::Http { status, details, .. }) => {
                Some(json!({ "http_status": status, "body": details }))
            }
            FetchError::Transport(TransportError::Network { transient, .. }) => {
                Some(json!({ "transient": transient }))
            }
            FetchError::Transport(TransportError::Config(_)) => None,
            FetchError::Parse(failure) => Some(json!({ "preview": failure.preview })),
        };
        ErrorInfo {
            message: err.to_string(),
            details,
        }
    }
}

/// Report result: a status plus, unless the status is `error`, the
/// report payload flattened next to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(flatten)]
    pub data: Option<T>,
}

impl<T> Outcome<T> {
    pub fn success(data: T) -> Self {
        Outcome {
            status: Status::Success,
            message: None,
            note: None,
            details: None,
            data: Some(data),
        }
    }

    pub fn partial(data: T, message: impl Into<String>, note: impl Into<String>) -> Self {
        Outcome {
            status: Status::Partial,
            message: Some(message.into()),
            note: Some(note.into()),
            details: None,
            data: Some(data),
        }
    }

    pub fn error(info: ErrorInfo) -> Self {
        Outcome {
            status: Status::Error,
            message: Some(info.message),
            note: None,
            details: info.details,
            data: None,
        }
    }

    /// Map a failed first fetch: an entity the tenant does not expose
    /// (4xx) degrades to `partial` with `empty`; anything else is `error`.
    pub fn from_fetch_error(err: &FetchError, empty: T, unavailable: &str) -> Self {
        if err.is_client_error() {
            tracing::warn!(error = %err, "{}", unavailable);
            Outcome::partial(
                empty,
                unavailable,
                format!("the ERP rejected the request ({}); the service may not be enabled on this system", err),
            )
        } else {
            tracing::warn!(error = %err, "report failed");
            Outcome::error(ErrorInfo::from(err))
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}
