//! Feature flag entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A boolean flag resolved per tenant.
///
/// `tenant_values` maps tenant name to an override; resolution is
/// `tenant_values[tenant.name] ?? global_value`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeatureFlag {
    /// Unique flag identifier.
    pub id: Uuid,
    /// Unique flag name; internal flags carry the `__FEATURE_LPC_` prefix.
    pub name: String,
    /// Default value when no tenant override exists.
    pub global_value: bool,
    /// Operator-facing description.
    pub description: String,
    /// Tenant-name → bool override map.
    pub tenant_values: serde_json::Value,
    /// When the flag was created.
    pub created_at: DateTime<Utc>,
    /// When the flag was last updated.
    pub updated_at: DateTime<Utc>,
}

impl FeatureFlag {
    /// Resolve the flag for a tenant by name.
    pub fn value_for_tenant(&self, tenant_name: &str) -> bool {
        self.tenant_values
            .get(tenant_name)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(self.global_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag(global: bool, tenant_values: serde_json::Value) -> FeatureFlag {
        FeatureFlag {
            id: Uuid::nil(),
            name: "__FEATURE_LPC_EXAMPLE_FLAG".into(),
            global_value: global,
            description: String::new(),
            tenant_values,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn tenant_override_wins() {
        let f = flag(false, serde_json::json!({ "acme": true }));
        assert!(f.value_for_tenant("acme"));
        assert!(!f.value_for_tenant("globex"));
    }

    #[test]
    fn non_bool_override_falls_back() {
        let f = flag(true, serde_json::json!({ "acme": "yes" }));
        assert!(f.value_for_tenant("acme"));
    }
}
