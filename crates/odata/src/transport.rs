//! Authenticated GET with bounded retry and exponential backoff.
//!
//! Retries HTTP 429, HTTP 5xx and transient connection failures (reset,
//! timeout). Every other failure is terminal. Each call is independent:
//! a fresh connection per attempt, no shared state between calls.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{CredentialProvider, ResponseFormat, RetryPolicy};
use crate::error::TransportError;

const USER_AGENT: &str = concat!("stockwise/", env!("CARGO_PKG_VERSION"));

// ── Executor seam ────────────────────────────────────────────────────────────

/// Status and body of one HTTP exchange, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// A request that produced no HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkFailure {
    pub message: String,
    /// Connection reset, timeout and similar conditions worth retrying.
    pub transient: bool,
}

/// Performs a single HTTP GET. Non-2xx statuses are replies, not failures.
pub trait HttpExecutor: Send + Sync {
    fn get(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        timeout: Duration,
    ) -> Result<HttpReply, NetworkFailure>;
}

/// [`HttpExecutor`] backed by `ureq`, one agent (and connection) per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqExecutor;

impl HttpExecutor for UreqExecutor {
    fn get(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        timeout: Duration,
    ) -> Result<HttpReply, NetworkFailure> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .proxy(None)
            .build()
            .into();

        let mut request = agent.get(url);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let response = request.call().map_err(classify_ureq_error)?;
        let status = response.status().as_u16();
        let body = response
            .into_body()
            .read_to_string()
            .map_err(classify_ureq_error)?;
        Ok(HttpReply { status, body })
    }
}

fn classify_ureq_error(err: ureq::Error) -> NetworkFailure {
    use std::io::ErrorKind;

    let transient = match &err {
        ureq::Error::Timeout(_) => true,
        ureq::Error::Io(io) => matches!(
            io.kind(),
            ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::TimedOut
                | ErrorKind::UnexpectedEof
                | ErrorKind::BrokenPipe
        ),
        _ => false,
    };
    NetworkFailure {
        message: err.to_string(),
        transient,
    }
}

// ── Transport ────────────────────────────────────────────────────────────────

/// A successful response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    /// Attempts used, including the successful one.
    pub attempts: u32,
}

/// Sends authenticated requests according to a [`RetryPolicy`].
pub struct Transport {
    executor: Box<dyn HttpExecutor>,
    credentials: Arc<dyn CredentialProvider>,
    policy: RetryPolicy,
    format: ResponseFormat,
}

impl Transport {
    pub fn new(
        executor: Box<dyn HttpExecutor>,
        credentials: Arc<dyn CredentialProvider>,
        policy: RetryPolicy,
        format: ResponseFormat,
    ) -> Self {
        Transport {
            executor,
            credentials,
            policy,
            format,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url`, retrying transient failures.
    ///
    /// Credential problems are reported before any network attempt. A
    /// terminal HTTP error carries the upstream body in `details`.
    pub fn request(&self, url: &str) -> Result<RawResponse, TransportError> {
        let authorization = self.credentials.authorization()?;
        let headers = [
            ("Authorization", authorization),
            ("Accept", self.format.accept_header().to_string()),
            ("User-Agent", USER_AGENT.to_string()),
            ("Connection", "close".to_string()),
        ];
        let max_attempts = self.policy.max_attempts.max(1);

        let mut attempt = 0u32;
        loop {
            let (error, retryable) = match self.executor.get(url, &headers, self.policy.timeout) {
                Ok(reply) if (200..300).contains(&reply.status) => {
                    return Ok(RawResponse {
                        status: reply.status,
                        body: reply.body,
                        attempts: attempt + 1,
                    });
                }
                Ok(reply) => {
                    let retryable = reply.status == 429 || reply.status >= 500;
                    let error = TransportError::Http {
                        status: reply.status,
                        message: format!("HTTP {}", reply.status),
                        details: reply.body,
                    };
                    (error, retryable)
                }
                Err(failure) => {
                    let retryable = failure.transient;
                    let error = TransportError::Network {
                        message: failure.message,
                        transient: failure.transient,
                    };
                    (error, retryable)
                }
            };

            if !retryable || attempt + 1 >= max_attempts {
                tracing::debug!(url, attempts = attempt + 1, error = %error, "request failed");
                return Err(error);
            }

            let delay = self.policy.backoff(attempt);
            tracing::warn!(
                attempt = attempt + 1,
                max_attempts,
                backoff_ms = delay.as_millis() as u64,
                error = %error,
                "retryable error, backing off"
            );
            std::thread::sleep(delay);
            attempt += 1;
        }
    }
}
