//! Federated OIDC provider configuration.

use serde::{Deserialize, Serialize};

/// Settings for the Keycloak-based OIDC provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeycloakConfig {
    /// Issuer base URL including the realm, e.g.
    /// `https://id.example.com/realms/main`.
    pub issuer: String,
    /// OIDC client id.
    pub client_id: String,
    /// OIDC client secret, used for HTTP Basic at the token endpoint.
    pub client_secret: String,
    /// Create a user on first login when no matching login exists.
    #[serde(default)]
    pub implicitly_create_users: bool,
    /// Restrict implicitly created users to the tenant they logged in on.
    /// When false they are synced across all tenants per the multitenant
    /// settings.
    #[serde(default = "default_true")]
    pub single_tenant: bool,
    /// Outbound request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    10
}
