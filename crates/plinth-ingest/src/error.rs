//! Handler error taxonomy.
//!
//! The variants map to distinct operator responses: `Config` needs an
//! operator fix, `Connection` and `Database` are transient and rely on the
//! channel's redelivery, `Validation` marks a payload redelivery cannot fix.

use thiserror::Error;

/// Result type alias for handler operations.
pub type IngestResult<T> = Result<T, HandlerError>;

/// Errors from a single handler invocation.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Missing or unresolvable secret/parameter.
    #[error("config error: {0}")]
    Config(String),

    /// Network, auth, or unreachable-socket failure while connecting.
    #[error("connection error: {0}")]
    Connection(String),

    /// Malformed event payload.
    #[error("validation error: {0}")]
    Validation(String),

    /// Statement failure after a connection was established.
    #[error("database error: {0}")]
    Database(String),
}
