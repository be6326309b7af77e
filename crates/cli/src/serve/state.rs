//! Shared server state.

use std::sync::Arc;

use stockwise_odata::ErpClient;

/// Application state shared across request handlers.
pub(crate) struct AppState {
    /// One client for every request; calls are blocking and run on the
    /// blocking thread pool.
    pub(crate) client: Arc<ErpClient>,
}
