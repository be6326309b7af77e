/// Configuration problems detected before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required setting is absent from the environment or config file.
    #[error("missing required setting: {0}")]
    Missing(String),

    /// A setting is present but cannot be used.
    #[error("invalid setting {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Failures surfaced by the transport once retries are exhausted or a
/// terminal condition is hit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Credentials could not be produced; no request was attempted.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The ERP answered with a non-success status.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        /// Upstream response body, kept for diagnostics.
        details: String,
    },

    /// The request never produced an HTTP response.
    #[error("network error: {message}")]
    Network { message: String, transient: bool },
}

impl TransportError {
    /// HTTP status of the failure, when the ERP produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for a non-retryable client error (4xx other than 429).
    ///
    /// Reports use this to detect an entity that is not exposed on the
    /// connected tenant.
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(s) if (400..500).contains(&s) && s != 429)
    }
}

/// Maximum number of raw-body characters kept in a parse failure.
pub const PREVIEW_CHARS: usize = 500;

/// A response body that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to parse response: {message}")]
pub struct ParseFailure {
    pub message: String,
    /// First [`PREVIEW_CHARS`] characters of the raw body.
    pub preview: String,
}

impl ParseFailure {
    pub fn new(message: impl Into<String>, raw: &str) -> Self {
        ParseFailure {
            message: message.into(),
            preview: raw.chars().take(PREVIEW_CHARS).collect(),
        }
    }
}

/// Umbrella error for one query round trip (build, send, parse).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Parse(#[from] ParseFailure),
}

impl FetchError {
    /// See [`TransportError::is_client_error`].
    pub fn is_client_error(&self) -> bool {
        match self {
            FetchError::Transport(e) => e.is_client_error(),
            FetchError::Parse(_) => false,
        }
    }
}
