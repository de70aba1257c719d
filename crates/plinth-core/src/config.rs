//! plinth.toml deployment configuration parser.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::types::{DbNetworkPolicy, ValueSource};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlinthConfig {
    pub stack: StackConfig,
    pub iam: IamConfig,
    pub storage: Option<StorageConfig>,
    pub database: Option<DatabaseConfig>,
    pub function: Option<FunctionConfig>,
    pub retry: Option<RetryConfig>,
    /// Environment handed to the deployed handler. Values are either plain
    /// strings or `{ secret = "name" }` references.
    pub env: Option<HashMap<String, ValueSource>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    /// Logical stack name; resource names derive from it.
    pub name: String,
    /// Cloud project to provision into.
    pub project: String,
    /// Default region for regional resources.
    pub region: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IamConfig {
    /// Roles granted to the stack's service identity, each of the form
    /// `roles/<service>.<action>`. Duplicates are a configuration error.
    pub roles: Vec<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Location for both the event-source and code-artifact containers.
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub engine_version: Option<String>,
    pub tier: Option<String>,
    pub region: Option<String>,
    /// Named network mode; `public-open` requires explicit opt-in.
    pub network_policy: Option<DbNetworkPolicy>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    /// Seconds to wait for the instance to report ready (e.g. 600).
    pub ready_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionConfig {
    pub entry_point: Option<String>,
    pub runtime: Option<String>,
    pub region: Option<String>,
    /// Directory whose contents are packaged into the code artifact.
    pub source_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Whether malformed events should be surfaced as retryable to the
    /// delivery channel. Defaults to false: redelivery cannot fix a
    /// malformed payload.
    pub retry_validation_errors: Option<bool>,
}

impl PlinthConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PlinthConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a minimal plinth.toml for the given stack name and project.
    pub fn scaffold(name: &str, project: &str) -> Self {
        PlinthConfig {
            stack: StackConfig {
                name: name.to_string(),
                project: project.to_string(),
                region: Some("us-central1".to_string()),
            },
            iam: IamConfig {
                roles: vec![
                    "roles/cloudsql.client".to_string(),
                    "roles/storage.objectViewer".to_string(),
                ],
                display_name: None,
            },
            storage: Some(StorageConfig {
                location: Some("US".to_string()),
            }),
            database: Some(DatabaseConfig {
                engine_version: Some("POSTGRES_13".to_string()),
                tier: Some("db-f1-micro".to_string()),
                region: None,
                network_policy: Some(DbNetworkPolicy::PrivateDefault),
                charset: Some("UTF8".to_string()),
                collation: Some("en_US.UTF8".to_string()),
                ready_timeout_secs: Some(600),
            }),
            function: Some(FunctionConfig {
                entry_point: Some("process_upload".to_string()),
                runtime: Some("rust".to_string()),
                region: None,
                source_dir: Some("./handler".to_string()),
            }),
            retry: None,
            env: None,
        }
    }

    pub fn region(&self) -> &str {
        self.stack.region.as_deref().unwrap_or("us-central1")
    }

    pub fn network_policy(&self) -> DbNetworkPolicy {
        self.database
            .as_ref()
            .and_then(|db| db.network_policy)
            .unwrap_or_default()
    }

    pub fn retry_validation_errors(&self) -> bool {
        self.retry
            .as_ref()
            .and_then(|r| r.retry_validation_errors)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaffold_round_trips() {
        let config = PlinthConfig::scaffold("upload-stack", "demo-project");
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("upload-stack"));
        assert!(toml_str.contains("POSTGRES_13"));

        let parsed: PlinthConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.stack.name, "upload-stack");
        assert_eq!(parsed.network_policy(), DbNetworkPolicy::PrivateDefault);
    }

    #[test]
    fn parse_minimal() {
        let toml_str = r#"
[stack]
name = "demo"
project = "p-1"

[iam]
roles = ["roles/cloudsql.client"]
"#;
        let config: PlinthConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.stack.name, "demo");
        assert_eq!(config.region(), "us-central1");
        assert!(!config.retry_validation_errors());
    }

    #[test]
    fn public_open_requires_explicit_opt_in() {
        let toml_str = r#"
[stack]
name = "demo"
project = "p-1"

[iam]
roles = ["roles/cloudsql.client"]

[database]
network_policy = "public-open"
"#;
        let config: PlinthConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.network_policy(), DbNetworkPolicy::PublicOpen);
    }

    #[test]
    fn env_accepts_secret_refs_and_plain_values() {
        let toml_str = r#"
[stack]
name = "demo"
project = "p-1"

[iam]
roles = ["roles/cloudsql.client"]

[env]
DB_USER = "svc"
DB_PASS = { secret = "app-db-pass" }
"#;
        let config: PlinthConfig = toml::from_str(toml_str).unwrap();
        let env = config.env.unwrap();
        assert_eq!(env["DB_USER"], ValueSource::PlainValue("svc".to_string()));
        assert_eq!(
            env["DB_PASS"],
            ValueSource::SecretRef {
                secret: "app-db-pass".to_string()
            }
        );
    }
}
