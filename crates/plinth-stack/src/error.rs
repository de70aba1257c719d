//! Stack error types.

use thiserror::Error;

/// Result type alias for stack operations.
pub type StackResult<T> = Result<T, StackError>;

/// Errors from declaring or applying the stack.
#[derive(Debug, Error)]
pub enum StackError {
    #[error("no roles configured: the service identity needs at least one role")]
    EmptyRoles,

    #[error("malformed role {0:?}: expected roles/<service>.<action>")]
    InvalidRole(String),

    #[error("duplicate role in configuration: {0}")]
    DuplicateRole(String),

    #[error("graph error: {0}")]
    Graph(#[from] plinth_graph::GraphError),

    #[error("output error: {0}")]
    Output(#[from] plinth_core::outputs::OutputError),

    #[error("failed to package code artifact: {0}")]
    Package(#[from] std::io::Error),

    #[error("identity creation failed: {0}")]
    IdentityFailed(String),

    #[error("resource {id} failed: {reason}")]
    ResourceFailed { id: String, reason: String },

    #[error("database instance {id} not ready within {timeout_secs}s")]
    InstanceNotReady { id: String, timeout_secs: u64 },
}
