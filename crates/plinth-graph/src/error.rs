//! Graph error types.

use thiserror::Error;

/// Result type alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors from building or resolving the provisioning graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate resource: {0}")]
    DuplicateResource(String),

    #[error("resource {resource} depends on unknown resource {dependency}")]
    UnknownDependency { resource: String, dependency: String },

    #[error("dependency cycle involving: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("precondition unmet: {resource} requires {precondition} to be created first")]
    PreconditionUnmet {
        resource: String,
        precondition: String,
    },
}
