//! The external orchestration platform, as seen by `apply`.
//!
//! Plinth does not ship an execution engine; the platform collaborator
//! creates resources and reports success, failure, or (for the database
//! instance) a readiness timeout.

use async_trait::async_trait;
use thiserror::Error;

use crate::plan::ResourceSpec;

/// Errors reported by the platform for a single resource.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("creation failed: {0}")]
    Failed(String),

    #[error("resource did not reach ready state within {timeout_secs}s")]
    NotReady { timeout_secs: u64 },
}

/// One resource-creation call against the platform.
///
/// `create` returns once the resource exists and is usable; for the
/// database instance that includes waiting for the ready state (bounded by
/// the deployment timeout the platform was handed).
#[async_trait]
pub trait Platform: Send + Sync {
    async fn create(&self, id: &str, spec: &ResourceSpec) -> Result<(), PlatformError>;
}
