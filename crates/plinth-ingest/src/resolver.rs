//! Config/secret resolution at handler cold start.
//!
//! Four values are required: database name, user, password, and one
//! connection endpoint (managed socket path or network host). Each value
//! may come from the environment or from a named secret; both variants sit
//! behind the one `resolve` capability so the handler never branches on
//! where a value came from.

use std::collections::HashMap;

use plinth_core::types::ValueSource;

use crate::error::HandlerError;

pub const DB_NAME: &str = "DB_NAME";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASS: &str = "DB_PASS";
pub const DB_PASSWORD: &str = "DB_PASSWORD";
pub const CLOUD_SQL_CONNECTION_NAME: &str = "CLOUD_SQL_CONNECTION_NAME";
pub const DB_HOST: &str = "DB_HOST";

/// External collaborator: `resolve(key) -> value | NotFound`.
pub trait ConfigResolver: Send + Sync {
    fn resolve(&self, key: &str) -> Option<String>;
}

/// Plain environment-variable resolution.
#[derive(Debug, Default, Clone)]
pub struct EnvResolver;

impl ConfigResolver for EnvResolver {
    fn resolve(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed key/value resolution, for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    values: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new(values: impl IntoIterator<Item = (&'static str, &'static str)>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl ConfigResolver for StaticResolver {
    fn resolve(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Latest-version lookup against a secret manager.
pub trait SecretStore: Send + Sync {
    fn latest(&self, name: &str) -> Option<String>;
}

/// Resolver over declared `ValueSource`s: plain values answer directly,
/// secret references go through the secret store.
pub struct MappedResolver<S> {
    sources: HashMap<String, ValueSource>,
    secrets: S,
}

impl<S: SecretStore> MappedResolver<S> {
    pub fn new(sources: HashMap<String, ValueSource>, secrets: S) -> Self {
        Self { sources, secrets }
    }
}

impl<S: SecretStore> ConfigResolver for MappedResolver<S> {
    fn resolve(&self, key: &str) -> Option<String> {
        match self.sources.get(key)? {
            ValueSource::PlainValue(value) => Some(value.clone()),
            ValueSource::SecretRef { secret } => self.secrets.latest(secret),
        }
    }
}

/// Where the database connection goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbEndpoint {
    /// Managed-socket connection identifier (`project:region:instance`).
    ManagedSocket(String),
    /// Plain network host.
    Host(String),
}

impl DbEndpoint {
    /// Unix socket path for a managed-socket endpoint.
    pub fn socket_path(connection_name: &str) -> String {
        format!("/cloudsql/{connection_name}/.s.PGSQL.5432")
    }
}

/// The four resolved connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbParams {
    pub database: String,
    pub user: String,
    pub password: String,
    pub endpoint: DbEndpoint,
}

impl DbParams {
    /// Resolve all required parameters, erroring on the first missing key.
    ///
    /// The password accepts `DB_PASS` or `DB_PASSWORD`; the endpoint is
    /// `CLOUD_SQL_CONNECTION_NAME` (socket-style) with `DB_HOST` as the
    /// network-style alternative.
    pub fn resolve(resolver: &dyn ConfigResolver) -> Result<Self, HandlerError> {
        let require = |key: &str| {
            resolver
                .resolve(key)
                .ok_or_else(|| HandlerError::Config(format!("missing required value: {key}")))
        };

        let database = require(DB_NAME)?;
        let user = require(DB_USER)?;
        let password = resolver
            .resolve(DB_PASS)
            .or_else(|| resolver.resolve(DB_PASSWORD))
            .ok_or_else(|| {
                HandlerError::Config(format!(
                    "missing required value: {DB_PASS} (or {DB_PASSWORD})"
                ))
            })?;
        let endpoint = match resolver.resolve(CLOUD_SQL_CONNECTION_NAME) {
            Some(conn) => DbEndpoint::ManagedSocket(conn),
            None => DbEndpoint::Host(resolver.resolve(DB_HOST).ok_or_else(|| {
                HandlerError::Config(format!(
                    "missing connection endpoint: {CLOUD_SQL_CONNECTION_NAME} or {DB_HOST}"
                ))
            })?),
        };

        Ok(Self {
            database,
            user,
            password,
            endpoint,
        })
    }
}
