//! OData v2 access for the ERP purchasing and inventory services.
//!
//! A request flows through three stages: [`QueryBuilder`] renders a
//! [`QuerySpec`] into a URL, [`Transport`] sends it with retry, and
//! [`normalize`] turns the body into cleaned [`Entry`] values.
//! [`ErpClient`] wires the three together.

pub mod client;
pub mod config;
pub mod entry;
pub mod error;
pub mod normalize;
pub mod query;
pub mod transport;

pub use client::ErpClient;
pub use config::{
    ConfigFile, CredentialProvider, Credentials, ErpConfig, ResponseFormat, RetryPolicy,
};
pub use entry::{Entry, Scalar};
pub use error::{ConfigError, FetchError, ParseFailure, TransportError};
pub use normalize::{clean, format_erp_date, normalize, Parsed, ResultSet, NAME_FIELD};
pub use query::{odata_literal, QueryBuilder, QuerySpec};
pub use transport::{HttpExecutor, HttpReply, NetworkFailure, RawResponse, Transport, UreqExecutor};
