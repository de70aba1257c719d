//! Published provisioning outputs.
//!
//! Every resource that other resources (or the handler) consume publishes a
//! stable string identifier once it is created: `instance_name`,
//! `database_name`, `instance_connection_name`, `bucket_name`,
//! `function_name`. The registry is passed explicitly through the
//! provisioning run, never held as process-global state.

use std::collections::BTreeMap;

use thiserror::Error;

pub const INSTANCE_NAME: &str = "instance_name";
pub const DATABASE_NAME: &str = "database_name";
pub const INSTANCE_CONNECTION_NAME: &str = "instance_connection_name";
pub const BUCKET_NAME: &str = "bucket_name";
pub const FUNCTION_NAME: &str = "function_name";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output already published: {0}")]
    AlreadyPublished(String),

    #[error("output not published: {0}")]
    NotPublished(String),
}

/// Registry of identifiers published by created resources.
///
/// Each key is published exactly once; re-publishing is an error because an
/// identifier is immutable once its owning resource exists.
#[derive(Debug, Default, Clone)]
pub struct Outputs {
    values: BTreeMap<String, String>,
}

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an identifier. Fails if the key was already published.
    pub fn publish(&mut self, key: &str, value: impl Into<String>) -> Result<(), OutputError> {
        if self.values.contains_key(key) {
            return Err(OutputError::AlreadyPublished(key.to_string()));
        }
        self.values.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Read a published identifier.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Read a published identifier, erroring if the owning resource has not
    /// been created yet.
    pub fn require(&self, key: &str) -> Result<&str, OutputError> {
        self.get(key)
            .ok_or_else(|| OutputError::NotPublished(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
