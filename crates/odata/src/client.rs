//! `ErpClient`: build a URL, send it, normalize the response.

use std::sync::Arc;

use crate::config::{CredentialProvider, ErpConfig};
use crate::error::FetchError;
use crate::normalize::{normalize, Parsed};
use crate::query::{QueryBuilder, QuerySpec};
use crate::transport::{HttpExecutor, Transport, UreqExecutor};

/// One round trip per [`fetch`](ErpClient::fetch). Holds no per-call state,
/// so a single client can serve concurrent callers.
pub struct ErpClient {
    config: Arc<ErpConfig>,
    builder: QueryBuilder,
    transport: Transport,
}

impl ErpClient {
    /// Client using the real HTTP stack.
    pub fn new(config: Arc<ErpConfig>) -> Self {
        Self::with_executor(config, Box::new(UreqExecutor))
    }

    /// Client over a custom executor (fixtures, recording proxies).
    pub fn with_executor(config: Arc<ErpConfig>, executor: Box<dyn HttpExecutor>) -> Self {
        let credentials: Arc<dyn CredentialProvider> = Arc::new(config.credentials.clone());
        Self::with_parts(config, executor, credentials)
    }

    /// Client with an externally managed credential source.
    pub fn with_parts(
        config: Arc<ErpConfig>,
        executor: Box<dyn HttpExecutor>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let builder = QueryBuilder::new(&config);
        let transport = Transport::new(executor, credentials, config.retry, config.format);
        ErpClient {
            config,
            builder,
            transport,
        }
    }

    pub fn config(&self) -> &ErpConfig {
        &self.config
    }

    /// Render the request URL for `spec` without sending it.
    pub fn url(&self, spec: &QuerySpec) -> String {
        self.builder.build(spec)
    }

    /// Fetch and normalize one page of `spec`.
    pub fn fetch(&self, spec: &QuerySpec) -> Result<Parsed, FetchError> {
        let url = self.builder.build(spec);
        tracing::debug!(%url, "GET");
        let response = self.transport.request(&url)?;
        let parsed = normalize(&response.body, self.config.format)?;
        tracing::debug!(
            entity = %spec.entity_path,
            entries = parsed.total_count,
            attempts = response.attempts,
            "fetched"
        );
        Ok(parsed)
    }
}
