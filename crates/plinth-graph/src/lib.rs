//! plinth-graph — the provisioning dependency graph.
//!
//! Provisioning is declarative: resources are registered as nodes with
//! explicit depends-on edges, and the orchestration runtime creates them in
//! any order that respects those edges. Creation order never comes from
//! declaration sequence — only from edges.

pub mod error;
pub mod graph;

pub use error::{GraphError, GraphResult};
pub use graph::{ResourceGraph, ResourceKind, ResourceNode};
