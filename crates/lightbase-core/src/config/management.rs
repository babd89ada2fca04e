//! Operator management interface configuration.

use serde::{Deserialize, Serialize};

/// Settings for the self-provisioning management interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagementConfig {
    /// API token for the external messaging workspace.
    pub chat_token: String,
    /// Role identifier granted to transient management users.
    #[serde(default = "default_role")]
    pub role_identifier: String,
    /// Hours a transient management user lives before the daily job purges it.
    #[serde(default = "default_ttl")]
    pub transient_user_ttl_hours: i64,
}

fn default_role() -> String {
    "lightbase-management".to_string()
}

fn default_ttl() -> i64 {
    24
}
