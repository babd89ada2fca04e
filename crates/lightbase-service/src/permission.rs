//! Permission engine: startup synchronization of the catalog and mandatory
//! roles, role administration, and user summaries.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use sqlx::PgConnection;
use tracing::info;
use uuid::Uuid;

use lightbase_core::config::PermissionConfig;
use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;
use lightbase_database::repositories::role::RoleRepository;
use lightbase_entity::permission::{Permission, Role};

/// Permission guarding every administrative operation below.
pub const PERMISSION_MANAGE: &str = "auth:permission:manage";

/// Permission to list users.
pub const PERMISSION_USER_LIST: &str = "auth:user:list";

/// Permission to mutate users (update, soft-delete, provider admin).
pub const PERMISSION_USER_MANAGE: &str = "auth:user:manage";

/// Permission to remove another user's TOTP settings.
pub const PERMISSION_TOTP_MANAGE: &str = "auth:totp:manage";

/// Permission to administer feature flags.
pub const PERMISSION_FEATURE_FLAG_MANAGE: &str = "auth:feature-flag:manage";

/// A role with its permissions and editability, the admin listing shape.
#[derive(Debug, Clone)]
pub struct RoleView {
    /// The role row.
    pub role: Role,
    /// Permission identifiers granted to it.
    pub permissions: Vec<String>,
    /// Whether runtime edits are allowed: tenant-scoped and not mandatory.
    pub is_editable: bool,
}

/// Argument of `user_sync_roles`: exactly one selector must be present.
#[derive(Debug, Clone, Default)]
pub struct RoleSelector {
    /// Select roles by id.
    pub id_in: Option<Vec<Uuid>>,
    /// Select roles by identifier, resolved within the tenant scope.
    pub identifier_in: Option<Vec<String>>,
}

/// The permission engine.
#[derive(Debug)]
pub struct PermissionEngine {
    roles: RoleRepository,
    static_role_ids: RwLock<HashSet<Uuid>>,
}

impl PermissionEngine {
    /// Creates the engine.
    pub fn new(roles: RoleRepository) -> Self {
        Self {
            roles,
            static_role_ids: RwLock::new(HashSet::new()),
        }
    }

    /// Whether a role is mandatory (declared in configuration).
    pub fn is_static(&self, role_id: Uuid) -> bool {
        self.static_role_ids
            .read()
            .map(|set| set.contains(&role_id))
            .unwrap_or(false)
    }

    // ── Startup synchronization ──────────────────────────────────

    /// Synchronize the permission catalog and mandatory roles.
    ///
    /// Runs on the advisory-locked startup transaction. Running it twice
    /// with the same configuration is a no-op from the database's
    /// perspective.
    pub async fn sync(
        &self,
        conn: &mut PgConnection,
        config: &PermissionConfig,
        tenant_ids_by_name: &HashMap<String, Uuid>,
    ) -> AppResult<()> {
        validate_config(config)?;

        self.roles.sync_permissions(conn, &config.permissions).await?;

        let mut static_ids = HashSet::new();

        for declared in &config.mandatory_roles {
            let tenant_id = match &declared.tenant {
                Some(name) => Some(*tenant_ids_by_name.get(name).ok_or_else(|| {
                    AppError::configuration(format!(
                        "mandatory role '{}' references unknown tenant '{name}'",
                        declared.identifier
                    ))
                })?),
                None => None,
            };

            let role = match self
                .roles
                .find_by_identifier(conn, &declared.identifier, tenant_id)
                .await?
            {
                Some(role) => {
                    // Links are recreated from configuration below.
                    self.roles.clear_role_permissions(conn, role.id).await?;
                    role
                }
                None => self.roles.insert(conn, &declared.identifier, tenant_id).await?,
            };

            let permissions = self
                .roles
                .permissions_by_identifiers(conn, &declared.permissions)
                .await?;
            if permissions.len() < declared.permissions.len() {
                // Means sync-permissions was skipped for these identifiers.
                let known: HashSet<&str> =
                    permissions.iter().map(|p| p.identifier.as_str()).collect();
                let missing: Vec<&String> = declared
                    .permissions
                    .iter()
                    .filter(|p| !known.contains(p.as_str()))
                    .collect();
                return Err(AppError::server("permission.sync.missingPermissions")
                    .with_info(serde_json::json!({
                        "role": declared.identifier,
                        "missing": missing,
                    })));
            }

            let permission_ids: Vec<Uuid> = permissions.iter().map(|p| p.id).collect();
            self.roles
                .add_role_permissions(conn, role.id, &permission_ids)
                .await?;

            static_ids.insert(role.id);
        }

        let count = static_ids.len();
        if let Ok(mut guard) = self.static_role_ids.write() {
            *guard = static_ids;
        }

        info!(
            permissions = config.permissions.len(),
            mandatory_roles = count,
            "Permission catalog synchronized"
        );
        Ok(())
    }

    // ── Administrative operations ────────────────────────────────

    /// List the permission catalog.
    pub async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        self.roles.all_permissions().await
    }

    /// List roles visible to a tenant (its own plus globals) with their
    /// permissions and editability.
    pub async fn list_roles(&self, tenant_id: Uuid) -> AppResult<Vec<RoleView>> {
        let roles = self.roles.visible_to_tenant(tenant_id).await?;
        let mut views = Vec::with_capacity(roles.len());

        for role in roles {
            let permissions = self.roles.role_permission_identifiers(role.id).await?;
            let is_editable = !self.is_static(role.id) && role.tenant_id.is_some();
            views.push(RoleView {
                role,
                permissions,
                is_editable,
            });
        }
        Ok(views)
    }

    /// Create a tenant-scoped role with a per-tenant unique identifier.
    pub async fn create_role(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        identifier: &str,
    ) -> AppResult<Role> {
        if self
            .roles
            .find_by_identifier(conn, identifier, Some(tenant_id))
            .await?
            .is_some()
        {
            return Err(AppError::validation("permission.roleCreate.duplicateIdentifier"));
        }
        self.roles.insert(conn, identifier, Some(tenant_id)).await
    }

    /// Delete a role; mandatory and global roles are refused.
    pub async fn delete_role(&self, conn: &mut PgConnection, role_id: Uuid) -> AppResult<()> {
        let role = self
            .roles
            .find_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::not_found("permission.roleDelete.unknownRole"))?;

        if self.is_static(role.id) || role.is_global() {
            return Err(AppError::validation("permission.roleDelete.notEditable"));
        }

        self.roles.delete(conn, role_id).await?;
        info!(role = %role.identifier, "Role deleted");
        Ok(())
    }

    /// Add permissions to an editable role; duplicates are ignored.
    pub async fn add_permissions(
        &self,
        conn: &mut PgConnection,
        role_id: Uuid,
        identifiers: &[String],
    ) -> AppResult<()> {
        let role = self.require_editable(role_id).await?;

        let permissions = self
            .roles
            .permissions_by_identifiers(conn, identifiers)
            .await?;
        if permissions.len() < identifiers.len() {
            let known: HashSet<&str> =
                permissions.iter().map(|p| p.identifier.as_str()).collect();
            let unknown: Vec<&String> = identifiers
                .iter()
                .filter(|p| !known.contains(p.as_str()))
                .collect();
            return Err(
                AppError::validation("permission.roleAddPermissions.unknownPermission")
                    .with_info(serde_json::json!({ "identifiers": unknown })),
            );
        }

        let ids: Vec<Uuid> = permissions.iter().map(|p| p.id).collect();
        self.roles.add_role_permissions(conn, role.id, &ids).await
    }

    /// Remove permissions from an editable role; absent entries are
    /// rejected.
    pub async fn remove_permissions(
        &self,
        conn: &mut PgConnection,
        role_id: Uuid,
        identifiers: &[String],
    ) -> AppResult<()> {
        let role = self.require_editable(role_id).await?;

        let permissions = self
            .roles
            .permissions_by_identifiers(conn, identifiers)
            .await?;
        let ids: Vec<Uuid> = permissions.iter().map(|p| p.id).collect();

        let removed = self
            .roles
            .remove_role_permissions(conn, role.id, &ids)
            .await?;
        if removed < identifiers.len() as u64 {
            return Err(AppError::validation(
                "permission.roleRemovePermissions.permissionNotAssigned",
            ));
        }
        Ok(())
    }

    /// Assign a role to a user; an already-held role is rejected.
    pub async fn assign_role(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        role_id: Uuid,
    ) -> AppResult<()> {
        self.roles
            .find_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::not_found("permission.userAssignRole.unknownRole"))?;

        let inserted = self.roles.assign_to_user(conn, user_id, role_id).await?;
        if !inserted {
            return Err(AppError::validation("permission.userAssignRole.userHasRole"));
        }
        Ok(())
    }

    /// Remove a role from a user; a role they do not hold is rejected.
    pub async fn remove_role(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        role_id: Uuid,
    ) -> AppResult<()> {
        let removed = self.roles.remove_from_user(conn, user_id, role_id).await?;
        if !removed {
            return Err(AppError::validation(
                "permission.userRemoveRole.userDoesNotHaveRole",
            ));
        }
        Ok(())
    }

    /// Bring a user's assignments to exactly the selected set.
    ///
    /// Exactly one of `id_in` / `identifier_in` must be present;
    /// identifiers resolve within the tenant scope (tenant or global).
    pub async fn user_sync_roles(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        tenant_id: Uuid,
        selector: RoleSelector,
    ) -> AppResult<()> {
        let target_ids: HashSet<Uuid> = match (selector.id_in, selector.identifier_in) {
            (Some(ids), None) => ids.into_iter().collect(),
            (None, Some(identifiers)) => {
                let visible = self.roles.visible_to_tenant(tenant_id).await?;
                let by_identifier: HashMap<&str, Uuid> = visible
                    .iter()
                    .map(|r| (r.identifier.as_str(), r.id))
                    .collect();

                let mut ids = HashSet::new();
                for identifier in &identifiers {
                    let id = by_identifier.get(identifier.as_str()).ok_or_else(|| {
                        AppError::validation("permission.userSyncRoles.unknownRole")
                            .with_info(serde_json::json!({ "identifier": identifier }))
                    })?;
                    ids.insert(*id);
                }
                ids
            }
            _ => {
                return Err(AppError::validation(
                    "permission.userSyncRoles.exactlyOneOfIdInIdentifierIn",
                ));
            }
        };

        let current: HashSet<Uuid> = self
            .roles
            .roles_of_user(user_id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();

        for role_id in target_ids.difference(&current) {
            self.roles.assign_to_user(conn, user_id, *role_id).await?;
        }
        for role_id in current.difference(&target_ids) {
            self.roles.remove_from_user(conn, user_id, *role_id).await?;
        }
        Ok(())
    }

    /// Sorted role identifiers and the sorted union of permission
    /// identifiers a user holds within a tenant.
    pub async fn user_summary(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> AppResult<(Vec<String>, Vec<String>)> {
        let mut roles: Vec<String> = self
            .roles
            .roles_of_user(user_id)
            .await?
            .into_iter()
            .filter(|r| r.tenant_id.is_none() || r.tenant_id == Some(tenant_id))
            .map(|r| r.identifier)
            .collect();
        roles.sort();

        let permissions = self
            .roles
            .user_permission_identifiers(user_id, tenant_id)
            .await?;

        Ok((roles, permissions))
    }

    async fn require_editable(&self, role_id: Uuid) -> AppResult<Role> {
        let role = self
            .roles
            .find_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::not_found("permission.role.unknownRole"))?;

        if self.is_static(role.id) || role.is_global() {
            return Err(AppError::validation("permission.role.notEditable"));
        }
        Ok(role)
    }
}

/// Reject duplicate permission identifiers and mandatory-role identifiers
/// that collide within a tenant scope or among globals.
fn validate_config(config: &PermissionConfig) -> AppResult<()> {
    let mut seen_permissions = HashSet::new();
    for identifier in &config.permissions {
        if !seen_permissions.insert(identifier.as_str()) {
            return Err(AppError::configuration(format!(
                "duplicate permission identifier '{identifier}'"
            )));
        }
    }

    let mut seen_roles = HashSet::new();
    for role in &config.mandatory_roles {
        let scope = (role.tenant.as_deref(), role.identifier.as_str());
        if !seen_roles.insert(scope) {
            return Err(AppError::configuration(format!(
                "duplicate mandatory role '{}' within its scope",
                role.identifier
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightbase_core::config::permission::MandatoryRole;

    #[test]
    fn duplicate_permissions_are_rejected() {
        let config = PermissionConfig {
            permissions: vec!["auth:user:list".into(), "auth:user:list".into()],
            mandatory_roles: vec![],
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn duplicate_mandatory_roles_collide_per_scope() {
        let config = PermissionConfig {
            permissions: vec![],
            mandatory_roles: vec![
                MandatoryRole {
                    identifier: "admin".into(),
                    tenant: None,
                    permissions: vec![],
                },
                MandatoryRole {
                    identifier: "admin".into(),
                    tenant: None,
                    permissions: vec![],
                },
            ],
        };
        assert!(validate_config(&config).is_err());

        let scoped = PermissionConfig {
            permissions: vec![],
            mandatory_roles: vec![
                MandatoryRole {
                    identifier: "admin".into(),
                    tenant: None,
                    permissions: vec![],
                },
                MandatoryRole {
                    identifier: "admin".into(),
                    tenant: Some("acme".into()),
                    permissions: vec![],
                },
            ],
        };
        assert!(validate_config(&scoped).is_ok());
    }
}
