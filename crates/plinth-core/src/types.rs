//! Shared types used across Plinth crates.

use serde::{Deserialize, Serialize};

/// Stable identifier of a declared resource within one provisioning run.
pub type ResourceId = String;

/// Cloud project the stack is provisioned into.
pub type ProjectId = String;

/// Network exposure mode for the managed database instance.
///
/// `PublicOpen` authorizes `0.0.0.0/0` and is only suitable for disposable
/// demo environments. It must be opted into explicitly in `plinth.toml`;
/// the default is `PrivateDefault`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DbNetworkPolicy {
    /// No inbound public access.
    #[default]
    PrivateDefault,
    /// Any source IP, via an authorized-network entry for `0.0.0.0/0`.
    PublicOpen,
}

impl DbNetworkPolicy {
    /// Authorized-network CIDR entries this policy translates to.
    pub fn authorized_networks(&self) -> &'static [&'static str] {
        match self {
            DbNetworkPolicy::PrivateDefault => &[],
            DbNetworkPolicy::PublicOpen => &["0.0.0.0/0"],
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, DbNetworkPolicy::PublicOpen)
    }
}

/// A configuration value that is either inlined or fetched from a named
/// secret at resolution time. The handler never branches on the variant;
/// both resolve to a plain string through the config resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSource {
    /// Reference to a named secret; resolves to its latest version.
    SecretRef { secret: String },
    /// Literal value, environment-variable style.
    PlainValue(String),
}
