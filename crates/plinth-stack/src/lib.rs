//! plinth-stack — concrete resource declarations for the upload stack.
//!
//! A stack is: three enabled service APIs, one service identity with its
//! role bindings, two storage containers (event source + code artifact), a
//! managed database instance with one schema, and a function trigger bound
//! to object-finalize events on the source container.
//!
//! `plan()` assembles the dependency graph from a `PlinthConfig`; `apply()`
//! drives it against a `Platform` collaborator in a creation order resolved
//! from the declared edges.

pub mod apply;
pub mod database;
pub mod error;
pub mod function;
pub mod iam;
pub mod plan;
pub mod platform;
pub mod storage;

pub use apply::{apply, ApplyReport, BindingFailure};
pub use database::{DatabaseInstance, Schema};
pub use error::{StackError, StackResult};
pub use function::{FunctionSpec, TriggerBinding, OBJECT_FINALIZE};
pub use iam::{CredentialGraph, RoleBinding, ServiceIdentity};
pub use plan::{ids, ResourceSpec, StackPlan};
pub use platform::{Platform, PlatformError};
pub use storage::{CodeArtifact, StorageContainer};
