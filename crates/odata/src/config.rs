//! Connection settings for the ERP OData service.
//!
//! An [`ErpConfig`] is built once at process start (from the environment or
//! a config file) and then shared read-only by the query builder and the
//! transport.

use std::fmt;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;

use crate::error::ConfigError;

/// Default URL length ceiling. The gateway starts rejecting requests
/// somewhere between 250 and 290 characters.
pub const DEFAULT_URL_CEILING: usize = 280;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of attempts per request, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default initial backoff delay in milliseconds (doubles each retry).
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 800;

// ── Response format ──────────────────────────────────────────────────────────

/// Wire format requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Json,
    Xml,
}

impl ResponseFormat {
    /// Value of the `$format` query parameter.
    pub fn query_value(self) -> &'static str {
        match self {
            ResponseFormat::Json => "json",
            ResponseFormat::Xml => "xml",
        }
    }

    /// Value of the `Accept` request header.
    pub fn accept_header(self) -> &'static str {
        match self {
            ResponseFormat::Json => "application/json",
            ResponseFormat::Xml => "application/atom+xml",
        }
    }

    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ResponseFormat::Json),
            "xml" | "atom" => Ok(ResponseFormat::Xml),
            other => Err(ConfigError::Invalid {
                key: "format".to_string(),
                message: format!("expected 'json' or 'xml', got '{}'", other),
            }),
        }
    }
}

// ── Credentials ──────────────────────────────────────────────────────────────

/// Supplies the `Authorization` header value for each request.
///
/// Token acquisition and refresh live outside this crate; an implementation
/// only has to hand back a ready-to-use header value.
pub trait CredentialProvider: Send + Sync {
    fn authorization(&self) -> Result<String, ConfigError>;
}

/// Static credentials read from configuration.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { user: String, password: String },
    Bearer { token: String },
}

impl CredentialProvider for Credentials {
    fn authorization(&self) -> Result<String, ConfigError> {
        match self {
            Credentials::Basic { user, password } => {
                if user.is_empty() {
                    return Err(ConfigError::Missing("SAP_USER".to_string()));
                }
                let token = BASE64.encode(format!("{}:{}", user, password));
                Ok(format!("Basic {}", token))
            }
            Credentials::Bearer { token } => {
                if token.is_empty() {
                    return Err(ConfigError::Missing("SAP_BEARER_TOKEN".to_string()));
                }
                Ok(format!("Bearer {}", token))
            }
        }
    }
}

// Never print secrets.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"***")
                .finish(),
            Credentials::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
        }
    }
}

// ── Retry policy ─────────────────────────────────────────────────────────────

/// Per-request timeout and retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero-based): `initial * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

// ── ErpConfig ────────────────────────────────────────────────────────────────

/// Immutable connection settings.
#[derive(Debug, Clone)]
pub struct ErpConfig {
    /// Host name, without scheme (`my-erp.example.com` or `host:port`).
    pub host: String,
    /// Optional tenant/client identifier sent as `sap-client`.
    pub client: Option<String>,
    pub format: ResponseFormat,
    pub url_ceiling: usize,
    pub credentials: Credentials,
    pub retry: RetryPolicy,
}

impl ErpConfig {
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        ErpConfig {
            host: host.into(),
            client: None,
            format: ResponseFormat::Json,
            url_ceiling: DEFAULT_URL_CEILING,
            credentials,
            retry: RetryPolicy::default(),
        }
    }

    /// Read settings from `SAP_*` environment variables.
    ///
    /// `SAP_HOST` is required, plus either `SAP_BEARER_TOKEN` or both
    /// `SAP_USER` and `SAP_PASSWORD`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`ErpConfig::from_env`] with an explicit variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("SAP_HOST").ok_or_else(|| ConfigError::Missing("SAP_HOST".to_string()))?;
        let credentials = match get("SAP_BEARER_TOKEN") {
            Some(token) => Credentials::Bearer { token },
            None => {
                let user =
                    get("SAP_USER").ok_or_else(|| ConfigError::Missing("SAP_USER".to_string()))?;
                let password = get("SAP_PASSWORD")
                    .ok_or_else(|| ConfigError::Missing("SAP_PASSWORD".to_string()))?;
                Credentials::Basic { user, password }
            }
        };

        let mut config = ErpConfig::new(normalize_host(&host), credentials);
        config.client = get("SAP_CLIENT");
        if let Some(format) = get("SAP_FORMAT") {
            config.format = ResponseFormat::parse(&format)?;
        }
        Ok(config)
    }

    /// `https://{host}`, the prefix every entity path is appended to.
    pub fn base_url(&self) -> String {
        format!("https://{}", self.host)
    }
}

/// Strip a scheme and trailing slash so `host` can be used verbatim.
fn normalize_host(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_string()
}

// ── Config file ──────────────────────────────────────────────────────────────

/// Deserialized form of a TOML/JSON config file.
///
/// ```toml
/// host = "erp.example.com"
/// client = "100"
/// format = "json"
///
/// [credentials]
/// user = "PURCHASER"
/// password = "secret"
///
/// [retry]
/// timeout_secs = 30
/// max_attempts = 3
/// initial_backoff_ms = 800
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub host: String,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub format: ResponseFormat,
    #[serde(default)]
    pub url_ceiling: Option<usize>,
    pub credentials: CredentialsFile,
    #[serde(default)]
    pub retry: RetryFile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsFile {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryFile {
    pub timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
}

impl ConfigFile {
    /// Validate and convert into an [`ErpConfig`].
    pub fn into_config(self) -> Result<ErpConfig, ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing("host".to_string()));
        }
        let credentials = match (self.credentials.token, self.credentials.user) {
            (Some(token), _) => Credentials::Bearer { token },
            (None, Some(user)) => Credentials::Basic {
                user,
                password: self
                    .credentials
                    .password
                    .ok_or_else(|| ConfigError::Missing("credentials.password".to_string()))?,
            },
            (None, None) => {
                return Err(ConfigError::Missing(
                    "credentials.user or credentials.token".to_string(),
                ))
            }
        };

        let mut config = ErpConfig::new(normalize_host(&self.host), credentials);
        config.client = self.client.filter(|c| !c.trim().is_empty());
        config.format = self.format;
        if let Some(ceiling) = self.url_ceiling {
            if ceiling < 64 {
                return Err(ConfigError::Invalid {
                    key: "url_ceiling".to_string(),
                    message: format!("{} is too small to hold any request", ceiling),
                });
            }
            config.url_ceiling = ceiling;
        }
        if let Some(secs) = self.retry.timeout_secs {
            config.retry.timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = self.retry.max_attempts {
            config.retry.max_attempts = attempts;
        }
        if let Some(ms) = self.retry.initial_backoff_ms {
            config.retry.initial_backoff = Duration::from_millis(ms);
        }
        Ok(config)
    }
}
