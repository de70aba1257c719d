//! Drives a resolved plan against the platform.
//!
//! Failure policy, per resource kind:
//! - identity creation failure aborts the whole run (no partial identity);
//! - an individual role-binding failure is recorded per role and does not
//!   roll back sibling bindings (each grant is independently idempotent);
//! - any other failure, including a database-instance readiness timeout,
//!   is fatal to the run.

use std::collections::BTreeSet;

use tracing::{error, info, warn};

use plinth_core::outputs::{self, Outputs};

use crate::error::{StackError, StackResult};
use crate::plan::{ids, ResourceSpec, StackPlan};
use crate::platform::{Platform, PlatformError};

/// A role binding that failed without aborting the run.
#[derive(Debug)]
pub struct BindingFailure {
    pub role: String,
    pub reason: String,
}

/// What `apply` created, published, and skipped.
#[derive(Debug)]
pub struct ApplyReport {
    /// Node ids in the order they were created.
    pub created: Vec<String>,
    /// Identifiers published by created resources.
    pub outputs: Outputs,
    /// Role bindings that failed (siblings were still applied).
    pub binding_failures: Vec<BindingFailure>,
}

impl ApplyReport {
    /// True when every declared resource was created.
    pub fn complete(&self) -> bool {
        self.binding_failures.is_empty()
    }
}

/// Create every resource in the plan, respecting declared edges.
pub async fn apply(plan: &StackPlan, platform: &dyn Platform) -> StackResult<ApplyReport> {
    let order = plan.execution_order()?;
    let mut created: BTreeSet<String> = BTreeSet::new();
    let mut report = ApplyReport {
        created: Vec::new(),
        outputs: Outputs::new(),
        binding_failures: Vec::new(),
    };

    for id in &order {
        let spec = plan.spec(id).ok_or_else(|| StackError::ResourceFailed {
            id: id.clone(),
            reason: "plan has no spec for this node".to_string(),
        })?;

        // A failed sibling upstream means this node's precondition is
        // unmet; fail fast instead of racing platform propagation.
        plan.graph.check_preconditions(id, &created)?;

        match platform.create(id, spec).await {
            Ok(()) => {
                info!(id = %id, "resource created");
                created.insert(id.clone());
                report.created.push(id.clone());
                publish_outputs(&mut report.outputs, plan, spec)?;
            }
            Err(err) => match spec {
                ResourceSpec::ServiceIdentity(identity) => {
                    error!(id = %identity.id, error = %err, "identity creation failed; aborting run");
                    return Err(StackError::IdentityFailed(err.to_string()));
                }
                ResourceSpec::RoleBinding(binding) => {
                    warn!(role = %binding.role, error = %err, "role binding failed; continuing with siblings");
                    report.binding_failures.push(BindingFailure {
                        role: binding.role.clone(),
                        reason: err.to_string(),
                    });
                }
                ResourceSpec::DatabaseInstance(instance) => {
                    if let PlatformError::NotReady { timeout_secs } = err {
                        return Err(StackError::InstanceNotReady {
                            id: instance.id.clone(),
                            timeout_secs,
                        });
                    }
                    return Err(StackError::ResourceFailed {
                        id: id.clone(),
                        reason: err.to_string(),
                    });
                }
                _ => {
                    return Err(StackError::ResourceFailed {
                        id: id.clone(),
                        reason: err.to_string(),
                    });
                }
            },
        }
    }

    Ok(report)
}

/// Resource names are deterministic from the plan, so outputs are published
/// here the moment the owning resource exists.
fn publish_outputs(out: &mut Outputs, plan: &StackPlan, spec: &ResourceSpec) -> StackResult<()> {
    match spec {
        ResourceSpec::StorageContainer(container) => {
            // Only the event-source container is a published interface.
            if let Some(ResourceSpec::StorageContainer(source)) = plan.spec(ids::SOURCE_BUCKET) {
                if container.name == source.name {
                    out.publish(outputs::BUCKET_NAME, container.name.as_str())?;
                }
            }
        }
        ResourceSpec::DatabaseInstance(instance) => {
            out.publish(outputs::INSTANCE_NAME, instance.id.as_str())?;
            out.publish(
                outputs::INSTANCE_CONNECTION_NAME,
                instance.connection_name(&plan.project),
            )?;
        }
        ResourceSpec::Schema(schema) => {
            out.publish(outputs::DATABASE_NAME, schema.name.as_str())?;
        }
        ResourceSpec::TriggerBinding(trigger) => {
            out.publish(outputs::FUNCTION_NAME, trigger.function.name.as_str())?;
        }
        _ => {}
    }
    Ok(())
}
