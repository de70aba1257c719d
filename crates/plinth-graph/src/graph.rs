//! Resource nodes and creation-order resolution.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GraphError, GraphResult};

/// What kind of platform resource a node declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Platform service API enablement.
    ServiceApi,
    ServiceIdentity,
    RoleBinding,
    StorageContainer,
    CodeArtifact,
    DatabaseInstance,
    Schema,
    TriggerBinding,
}

/// One declared resource with its explicit ordering dependencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    pub id: String,
    pub kind: ResourceKind,
    /// Ids of resources that must be created (and confirmed) first.
    pub depends_on: Vec<String>,
}

impl ResourceNode {
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            depends_on: Vec::new(),
        }
    }

    pub fn depends_on(mut self, dep: impl Into<String>) -> Self {
        self.depends_on.push(dep.into());
        self
    }
}

/// The provisioning run's resource registry.
///
/// Passed explicitly through the provisioning routine; nodes expose their
/// declared dependencies so a valid creation order can be computed.
#[derive(Debug, Default, Clone)]
pub struct ResourceGraph {
    nodes: Vec<ResourceNode>,
    index: HashMap<String, usize>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. Ids are unique per run.
    pub fn add(&mut self, node: ResourceNode) -> GraphResult<()> {
        if self.index.contains_key(&node.id) {
            return Err(GraphError::DuplicateResource(node.id));
        }
        debug!(id = %node.id, kind = ?node.kind, deps = node.depends_on.len(), "resource declared");
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ResourceNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolve a valid creation order (Kahn's algorithm).
    ///
    /// Deterministic: among resources whose dependencies are all satisfied,
    /// declaration order breaks ties. Unknown dependencies and cycles are
    /// errors, not silent reorderings.
    pub fn resolve_order(&self) -> GraphResult<Vec<String>> {
        for node in &self.nodes {
            for dep in &node.depends_on {
                if !self.index.contains_key(dep) {
                    return Err(GraphError::UnknownDependency {
                        resource: node.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let mut created: BTreeSet<&str> = BTreeSet::new();
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut remaining: Vec<&ResourceNode> = self.nodes.iter().collect();

        while !remaining.is_empty() {
            let before = remaining.len();
            remaining.retain(|node| {
                let ready = node.depends_on.iter().all(|d| created.contains(d.as_str()));
                if ready {
                    created.insert(node.id.as_str());
                    order.push(node.id.clone());
                }
                !ready
            });
            if remaining.len() == before {
                // No progress: everything left is part of (or behind) a cycle.
                return Err(GraphError::Cycle(
                    remaining.iter().map(|n| n.id.clone()).collect(),
                ));
            }
        }

        Ok(order)
    }

    /// Check that every dependency of `id` is in the created set.
    ///
    /// Used at apply time to fail fast instead of racing the platform's own
    /// eventual propagation.
    pub fn check_preconditions(
        &self,
        id: &str,
        created: &BTreeSet<String>,
    ) -> GraphResult<()> {
        let node = self.get(id).ok_or_else(|| GraphError::UnknownDependency {
            resource: id.to_string(),
            dependency: id.to_string(),
        })?;
        for dep in &node.depends_on {
            if !created.contains(dep) {
                return Err(GraphError::PreconditionUnmet {
                    resource: id.to_string(),
                    precondition: dep.clone(),
                });
            }
        }
        Ok(())
    }
}
