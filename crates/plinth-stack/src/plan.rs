//! Stack plan — assembles the dependency graph from configuration.
//!
//! Node ids are stable within a run and double as dependency references:
//!
//! ```text
//! api/functions ─┐
//! api/sqladmin ──┼─→ identity ─→ role/<role>...
//! api/storage ───┘      │
//!   │                   │
//!   ├─→ bucket/source ──┼────────────────────┐
//!   ├─→ bucket/code ─→ artifact/code ────────┼─→ trigger
//!   └─→ database/instance ─→ database/schema │
//!         (api/sqladmin)                     │
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::warn;

use plinth_core::config::PlinthConfig;
use plinth_graph::{ResourceGraph, ResourceKind, ResourceNode};

use crate::database::{DatabaseInstance, Schema};
use crate::error::StackResult;
use crate::function::{FunctionSpec, TriggerBinding};
use crate::iam::{CredentialGraph, RoleBinding, ServiceIdentity};
use crate::storage::{CodeArtifact, StorageContainer};

/// Well-known node ids.
pub mod ids {
    pub const API_FUNCTIONS: &str = "api/functions";
    pub const API_SQLADMIN: &str = "api/sqladmin";
    pub const API_STORAGE: &str = "api/storage";
    pub const IDENTITY: &str = "identity";
    pub const SOURCE_BUCKET: &str = "bucket/source";
    pub const CODE_BUCKET: &str = "bucket/code";
    pub const CODE_ARTIFACT: &str = "artifact/code";
    pub const DB_INSTANCE: &str = "database/instance";
    pub const DB_SCHEMA: &str = "database/schema";
    pub const TRIGGER: &str = "trigger";

    pub fn role(role: &str) -> String {
        format!("role/{role}")
    }
}

/// Typed payload behind each graph node.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceSpec {
    ServiceApi { service: String },
    ServiceIdentity(ServiceIdentity),
    RoleBinding(RoleBinding),
    StorageContainer(StorageContainer),
    CodeArtifact(CodeArtifact),
    DatabaseInstance(DatabaseInstance),
    Schema(Schema),
    TriggerBinding(TriggerBinding),
}

/// The assembled provisioning plan: graph plus per-node specs.
#[derive(Debug, Clone)]
pub struct StackPlan {
    pub graph: ResourceGraph,
    specs: HashMap<String, ResourceSpec>,
    pub project: String,
    pub ready_timeout_secs: u64,
}

impl StackPlan {
    /// Build the plan from configuration, packaging the handler source if
    /// its directory exists (a missing directory leaves the artifact
    /// unpackaged; `apply` will fail on it, `plan` output still renders).
    pub fn from_config(config: &PlinthConfig) -> StackResult<Self> {
        let stack = &config.stack.name;
        let code_container = format!("{stack}-source-code-bucket");

        let source_dir = config
            .function
            .as_ref()
            .and_then(|f| f.source_dir.clone())
            .unwrap_or_else(|| "./handler".to_string());
        let artifact = if Path::new(&source_dir).is_dir() {
            CodeArtifact::package(&code_container, &format!("{stack}-function"), Path::new(&source_dir))?
        } else {
            warn!(source_dir, "handler source directory missing; artifact left unpackaged");
            CodeArtifact::from_digest(&code_container, &format!("{stack}-function"), "unpackaged")
        };

        Self::with_artifact(config, artifact)
    }

    /// Build the plan around an already-packaged code artifact.
    pub fn with_artifact(config: &PlinthConfig, artifact: CodeArtifact) -> StackResult<Self> {
        let stack = &config.stack.name;
        let project = &config.stack.project;
        let region = config.region();

        let credentials = CredentialGraph::new(
            project,
            &format!("{stack}-identity"),
            config
                .iam
                .display_name
                .as_deref()
                .unwrap_or("Plinth stack identity"),
            &config.iam.roles,
        )?;

        let location = config
            .storage
            .as_ref()
            .and_then(|s| s.location.clone())
            .unwrap_or_else(|| "US".to_string());
        let source_bucket = StorageContainer {
            name: format!("{stack}-bucket"),
            location: location.clone(),
        };
        let code_bucket = StorageContainer {
            name: artifact.container.clone(),
            location,
        };

        let db = config.database.clone().unwrap_or_default();
        let network_policy = config.network_policy();
        if network_policy.is_public() {
            warn!(
                authorized = ?network_policy.authorized_networks(),
                "database network policy is public-open; suitable for disposable environments only"
            );
        }
        let instance = DatabaseInstance {
            id: format!("{stack}-instance"),
            engine_version: db.engine_version.unwrap_or_else(|| "POSTGRES_13".to_string()),
            region: db.region.unwrap_or_else(|| region.to_string()),
            tier: db.tier.unwrap_or_else(|| "db-f1-micro".to_string()),
            network_policy,
        };
        let schema = Schema {
            name: format!("{stack}-db"),
            instance: instance.id.clone(),
            charset: db.charset.unwrap_or_else(|| "UTF8".to_string()),
            collation: db.collation.unwrap_or_else(|| "en_US.UTF8".to_string()),
        };
        let ready_timeout_secs = db.ready_timeout_secs.unwrap_or(600);

        let function = config.function.clone().unwrap_or_default();
        let trigger = TriggerBinding::new(
            FunctionSpec {
                name: format!("{stack}-function"),
                entry_point: function.entry_point.unwrap_or_else(|| "process_upload".to_string()),
                runtime: function.runtime.unwrap_or_else(|| "rust".to_string()),
                region: function.region.unwrap_or_else(|| region.to_string()),
                source_container: artifact.container.clone(),
                source_object: artifact.object_key.clone(),
            },
            &source_bucket.name,
        );

        let mut plan = Self {
            graph: ResourceGraph::new(),
            specs: HashMap::new(),
            project: project.clone(),
            ready_timeout_secs,
        };
        plan.assemble(credentials, source_bucket, code_bucket, artifact, instance, schema, trigger)?;
        Ok(plan)
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &mut self,
        credentials: CredentialGraph,
        source_bucket: StorageContainer,
        code_bucket: StorageContainer,
        artifact: CodeArtifact,
        instance: DatabaseInstance,
        schema: Schema,
        trigger: TriggerBinding,
    ) -> StackResult<()> {
        for (id, service) in [
            (ids::API_FUNCTIONS, "cloudfunctions.googleapis.com"),
            (ids::API_SQLADMIN, "sqladmin.googleapis.com"),
            (ids::API_STORAGE, "storage.googleapis.com"),
        ] {
            self.add(
                ResourceNode::new(id, ResourceKind::ServiceApi),
                ResourceSpec::ServiceApi {
                    service: service.to_string(),
                },
            )?;
        }

        // Identity waits on API enablement; every binding waits on the
        // identity and nothing else.
        self.add(
            ResourceNode::new(ids::IDENTITY, ResourceKind::ServiceIdentity)
                .depends_on(ids::API_FUNCTIONS)
                .depends_on(ids::API_SQLADMIN)
                .depends_on(ids::API_STORAGE),
            ResourceSpec::ServiceIdentity(credentials.identity),
        )?;
        for binding in credentials.bindings {
            self.add(
                ResourceNode::new(ids::role(&binding.role), ResourceKind::RoleBinding)
                    .depends_on(ids::IDENTITY),
                ResourceSpec::RoleBinding(binding),
            )?;
        }

        self.add(
            ResourceNode::new(ids::SOURCE_BUCKET, ResourceKind::StorageContainer)
                .depends_on(ids::API_STORAGE),
            ResourceSpec::StorageContainer(source_bucket),
        )?;
        self.add(
            ResourceNode::new(ids::CODE_BUCKET, ResourceKind::StorageContainer)
                .depends_on(ids::API_STORAGE),
            ResourceSpec::StorageContainer(code_bucket),
        )?;
        self.add(
            ResourceNode::new(ids::CODE_ARTIFACT, ResourceKind::CodeArtifact)
                .depends_on(ids::CODE_BUCKET),
            ResourceSpec::CodeArtifact(artifact),
        )?;

        self.add(
            ResourceNode::new(ids::DB_INSTANCE, ResourceKind::DatabaseInstance)
                .depends_on(ids::API_SQLADMIN),
            ResourceSpec::DatabaseInstance(instance),
        )?;
        self.add(
            ResourceNode::new(ids::DB_SCHEMA, ResourceKind::Schema)
                .depends_on(ids::DB_INSTANCE),
            ResourceSpec::Schema(schema),
        )?;

        // The binding's preconditions: enabled APIs, the identity, the
        // uploaded artifact, and a resolvable source container.
        self.add(
            ResourceNode::new(ids::TRIGGER, ResourceKind::TriggerBinding)
                .depends_on(ids::API_FUNCTIONS)
                .depends_on(ids::API_SQLADMIN)
                .depends_on(ids::API_STORAGE)
                .depends_on(ids::IDENTITY)
                .depends_on(ids::CODE_ARTIFACT)
                .depends_on(ids::SOURCE_BUCKET),
            ResourceSpec::TriggerBinding(trigger),
        )?;

        Ok(())
    }

    fn add(&mut self, node: ResourceNode, spec: ResourceSpec) -> StackResult<()> {
        let id = node.id.clone();
        self.graph.add(node)?;
        self.specs.insert(id, spec);
        Ok(())
    }

    pub fn spec(&self, id: &str) -> Option<&ResourceSpec> {
        self.specs.get(id)
    }

    /// A valid creation order for the whole stack.
    pub fn execution_order(&self) -> StackResult<Vec<String>> {
        Ok(self.graph.resolve_order()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plinth_core::config::PlinthConfig;

    fn test_config() -> PlinthConfig {
        toml::from_str(
            r#"
[stack]
name = "upload-stack"
project = "demo-project"

[iam]
roles = ["roles/cloudsql.client", "roles/storage.objectViewer"]
"#,
        )
        .unwrap()
    }

    fn test_plan() -> StackPlan {
        let artifact =
            CodeArtifact::from_digest("upload-stack-source-code-bucket", "upload-stack-function", "abcdef0123456789");
        StackPlan::with_artifact(&test_config(), artifact).unwrap()
    }

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|x| x == id).unwrap()
    }

    #[test]
    fn plan_declares_whole_stack() {
        let plan = test_plan();
        // 3 APIs + identity + 2 roles + 2 buckets + artifact + instance +
        // schema + trigger.
        assert_eq!(plan.graph.len(), 12);
        assert!(plan.spec(ids::TRIGGER).is_some());
    }

    #[test]
    fn bindings_never_precede_identity() {
        let plan = test_plan();
        let order = plan.execution_order().unwrap();
        let identity = position(&order, ids::IDENTITY);
        assert!(identity < position(&order, &ids::role("roles/cloudsql.client")));
        assert!(identity < position(&order, &ids::role("roles/storage.objectViewer")));
    }

    #[test]
    fn trigger_comes_after_all_preconditions() {
        let plan = test_plan();
        let order = plan.execution_order().unwrap();
        let trigger = position(&order, ids::TRIGGER);
        for dep in [
            ids::API_FUNCTIONS,
            ids::API_SQLADMIN,
            ids::API_STORAGE,
            ids::IDENTITY,
            ids::CODE_ARTIFACT,
            ids::SOURCE_BUCKET,
        ] {
            assert!(position(&order, dep) < trigger, "{dep} not before trigger");
        }
    }

    #[test]
    fn schema_waits_for_instance() {
        let plan = test_plan();
        let order = plan.execution_order().unwrap();
        assert!(position(&order, ids::DB_INSTANCE) < position(&order, ids::DB_SCHEMA));
    }

    #[test]
    fn duplicate_roles_fail_plan() {
        let mut config = test_config();
        config.iam.roles.push("roles/cloudsql.client".to_string());
        let artifact = CodeArtifact::from_digest("c", "f", "digest");
        let err = StackPlan::with_artifact(&config, artifact).unwrap_err();
        assert!(matches!(err, crate::error::StackError::DuplicateRole(_)));
    }
}
