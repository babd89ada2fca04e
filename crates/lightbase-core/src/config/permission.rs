//! Permission catalog and mandatory role declarations.

use serde::{Deserialize, Serialize};

/// The static permission catalog and the roles kept in sync at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionConfig {
    /// Every permission identifier known to the platform.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Roles whose identifier and permission set are declared here and
    /// re-synchronized on every startup. Non-editable at runtime.
    #[serde(default)]
    pub mandatory_roles: Vec<MandatoryRole>,
}

/// A configuration-declared role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MandatoryRole {
    /// Role identifier, unique within its tenant scope (or among globals).
    pub identifier: String,
    /// Owning tenant name; `None` declares a global role.
    #[serde(default)]
    pub tenant: Option<String>,
    /// Permission identifiers granted to the role.
    #[serde(default)]
    pub permissions: Vec<String>,
}
