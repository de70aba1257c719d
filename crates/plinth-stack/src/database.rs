//! Managed database instance and schema declarations.

use plinth_core::types::DbNetworkPolicy;
use serde::{Deserialize, Serialize};

/// A managed relational instance. Long-lived; tier and network changes
/// reconfigure in place, only an engine-version change replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInstance {
    pub id: String,
    pub engine_version: String,
    pub region: String,
    pub tier: String,
    pub network_policy: DbNetworkPolicy,
}

impl DatabaseInstance {
    /// The managed-socket connection identifier consumed by the handler.
    pub fn connection_name(&self, project: &str) -> String {
        format!("{project}:{}:{}", self.region, self.id)
    }

    /// Whether replacing `other` with `self` requires a new instance
    /// rather than an in-place reconfiguration.
    pub fn requires_replacement(&self, other: &DatabaseInstance) -> bool {
        self.engine_version != other.engine_version
    }
}

/// One schema/database inside an instance, created after the instance
/// reports ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub instance: String,
    pub charset: String,
    pub collation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance() -> DatabaseInstance {
        DatabaseInstance {
            id: "upload-stack-instance".to_string(),
            engine_version: "POSTGRES_13".to_string(),
            region: "us-central1".to_string(),
            tier: "db-f1-micro".to_string(),
            network_policy: DbNetworkPolicy::PrivateDefault,
        }
    }

    #[test]
    fn connection_name_format() {
        assert_eq!(
            instance().connection_name("demo-project"),
            "demo-project:us-central1:upload-stack-instance"
        );
    }

    #[test]
    fn tier_change_reconfigures_in_place() {
        let current = instance();
        let mut desired = instance();
        desired.tier = "db-g1-small".to_string();
        desired.network_policy = DbNetworkPolicy::PublicOpen;
        assert!(!desired.requires_replacement(&current));

        desired.engine_version = "POSTGRES_15".to_string();
        assert!(desired.requires_replacement(&current));
    }
}
