//! Service identity and role bindings.
//!
//! One identity per deployment; exactly one binding per configured role,
//! each a logical child of the identity. No binding is attempted until the
//! platform has confirmed identity creation — that edge is explicit in the
//! graph, not a race.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{StackError, StackResult};

static ROLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^roles/[a-z][a-zA-Z0-9]*\.[a-zA-Z][a-zA-Z0-9]*$").unwrap()
});

/// The service identity the handler runs as.
///
/// Created once per deployment, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
    /// Account id, unique within the project.
    pub id: String,
    pub display_name: String,
    pub project: String,
}

impl ServiceIdentity {
    /// Member string used by role bindings.
    pub fn member(&self) -> String {
        format!(
            "serviceAccount:{}@{}.iam.gserviceaccount.com",
            self.id, self.project
        )
    }
}

/// Grant of one named role to the service identity.
///
/// Bindings are set-like: one per (role, identity) pair. Re-applying the
/// same grant upstream is a no-op, so individual bindings are independently
/// idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub role: String,
    pub member: String,
    pub project: String,
}

/// The validated identity-plus-roles portion of the stack.
#[derive(Debug, Clone)]
pub struct CredentialGraph {
    pub identity: ServiceIdentity,
    pub bindings: Vec<RoleBinding>,
}

impl CredentialGraph {
    /// Validate the configured roles and produce the identity with one
    /// binding per role.
    ///
    /// Duplicates are rejected rather than silently deduplicated — a role
    /// listed twice means the configuration does not say what the operator
    /// thinks it says.
    pub fn new(
        project: &str,
        account_id: &str,
        display_name: &str,
        roles: &[String],
    ) -> StackResult<Self> {
        if roles.is_empty() {
            return Err(StackError::EmptyRoles);
        }
        let mut seen = BTreeSet::new();
        for role in roles {
            if !ROLE_RE.is_match(role) {
                return Err(StackError::InvalidRole(role.clone()));
            }
            if !seen.insert(role.as_str()) {
                return Err(StackError::DuplicateRole(role.clone()));
            }
        }

        let identity = ServiceIdentity {
            id: account_id.to_string(),
            display_name: display_name.to_string(),
            project: project.to_string(),
        };
        let member = identity.member();
        let bindings = roles
            .iter()
            .map(|role| RoleBinding {
                role: role.clone(),
                member: member.clone(),
                project: project.to_string(),
            })
            .collect();

        Ok(Self { identity, bindings })
    }
}
