//! The per-invocation state machine.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info};

use crate::error::HandlerError;
use crate::event::StorageEvent;
use crate::resolver::{ConfigResolver, DbParams};
use crate::store::{Connector, UploadRecord};

/// Non-terminal states of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Validating,
    ResolvingConfig,
    Connecting,
    EnsuringSchema,
    Inserting,
    Acknowledged,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Validating => "validating",
            Phase::ResolvingConfig => "resolving-config",
            Phase::Connecting => "connecting",
            Phase::EnsuringSchema => "ensuring-schema",
            Phase::Inserting => "inserting",
            Phase::Acknowledged => "acknowledged",
        };
        f.write_str(label)
    }
}

/// What the delivery channel should do with a failed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Redeliver later; the failure was transient.
    Retry,
    /// Acknowledge and drop; redelivery cannot fix it.
    Drop,
}

/// Maps failures to dispositions.
///
/// Connection and database errors are transient, and a config error
/// clears once the operator restores the missing key, so all three ask
/// for redelivery. Only the malformed-event case is policy: the default
/// drops it, since redelivery resends the same payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy {
    pub retry_validation_errors: bool,
}

impl RetryPolicy {
    pub fn disposition(&self, error: &HandlerError) -> Disposition {
        match error {
            HandlerError::Connection(_)
            | HandlerError::Database(_)
            | HandlerError::Config(_) => Disposition::Retry,
            HandlerError::Validation(_) => {
                if self.retry_validation_errors {
                    Disposition::Retry
                } else {
                    Disposition::Drop
                }
            }
        }
    }
}

/// Terminal FAILED state: which phase failed, why, and what the channel
/// should do about it.
#[derive(Debug, thiserror::Error)]
#[error("{error} (phase: {phase})")]
pub struct HandlerFailure {
    pub phase: Phase,
    pub error: HandlerError,
    pub disposition: Disposition,
}

/// The ingestion handler. One `handle` call per delivered event; no state
/// is shared between invocations.
pub struct IngestHandler {
    resolver: Arc<dyn ConfigResolver>,
    connector: Arc<dyn Connector>,
    policy: RetryPolicy,
}

impl IngestHandler {
    pub fn new(resolver: Arc<dyn ConfigResolver>, connector: Arc<dyn Connector>) -> Self {
        Self {
            resolver,
            connector,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run one invocation to ACKNOWLEDGED or FAILED.
    ///
    /// The connection is scoped to this call and released on every exit
    /// path. No internal retries: a FAILED outcome carries the disposition
    /// for the delivery channel.
    pub async fn handle(&self, event: &StorageEvent) -> Result<UploadRecord, HandlerFailure> {
        // Input contract first: a malformed event must not cost config
        // resolution or a connection.
        let file_name = event
            .object_name()
            .map_err(|e| self.fail(Phase::Validating, e))?
            .to_string();
        info!(file_name, bucket = ?event.bucket, "received finalize event");

        let params = DbParams::resolve(self.resolver.as_ref())
            .map_err(|e| self.fail(Phase::ResolvingConfig, e))?;

        let mut store = self
            .connector
            .connect(&params)
            .await
            .map_err(|e| self.fail(Phase::Connecting, e))?;

        if let Err(e) = store.ensure_schema().await {
            // Release before reporting; the channel decides on redelivery.
            let _ = store.close().await;
            return Err(self.fail(Phase::EnsuringSchema, e));
        }

        let record = match store.insert_upload(&file_name).await {
            Ok(record) => record,
            Err(e) => {
                let _ = store.close().await;
                return Err(self.fail(Phase::Inserting, e));
            }
        };

        store
            .close()
            .await
            .map_err(|e| self.fail(Phase::Acknowledged, e))?;

        info!(file_name = %record.file_name, id = record.id, "upload recorded");
        Ok(record)
    }

    fn fail(&self, phase: Phase, error: HandlerError) -> HandlerFailure {
        let disposition = self.policy.disposition(&error);
        error!(%phase, %error, ?disposition, "invocation failed");
        HandlerFailure {
            phase,
            error,
            disposition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_drops_validation_errors() {
        let policy = RetryPolicy::default();
        let err = HandlerError::Validation("no file name".to_string());
        assert_eq!(policy.disposition(&err), Disposition::Drop);
    }

    #[test]
    fn policy_can_opt_into_retrying_validation_errors() {
        let policy = RetryPolicy {
            retry_validation_errors: true,
        };
        let err = HandlerError::Validation("no file name".to_string());
        assert_eq!(policy.disposition(&err), Disposition::Retry);
    }

    #[test]
    fn transient_errors_always_retry() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.disposition(&HandlerError::Connection("refused".to_string())),
            Disposition::Retry
        );
        assert_eq!(
            policy.disposition(&HandlerError::Database("deadlock".to_string())),
            Disposition::Retry
        );
    }

    #[test]
    fn config_errors_retry_so_an_operator_fix_takes_effect() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.disposition(&HandlerError::Config("missing DB_NAME".to_string())),
            Disposition::Retry
        );
    }
}
