//! Permission engine handlers.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use lightbase_core::result::AppResult;
use lightbase_service::permission::{PERMISSION_MANAGE, RoleSelector};
use lightbase_service::user::RequireUserOptions;

use crate::dto::request::{RoleCreateRequest, RolePermissionsRequest, UserRoleRequest};
use crate::dto::response::SuccessResponse;
use crate::error::tx_err;
use crate::extractors::{AuthSession, TenantContext};
use crate::state::AppState;

async fn require_manage(
    state: &AppState,
    tenant: &TenantContext,
    auth: &AuthSession,
    event_key_prefix: &str,
) -> AppResult<()> {
    state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new(event_key_prefix).with_permissions(&[PERMISSION_MANAGE]),
        )
        .await?;
    Ok(())
}

/// `GET /auth/permission/summary` — the caller's roles and permissions.
pub async fn summary(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
) -> AppResult<Json<serde_json::Value>> {
    let user = state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("permission.summary"),
        )
        .await?;

    let (roles, permissions) = state
        .permission_engine
        .user_summary(user.user.id, tenant.tenant.id)
        .await?;

    Ok(Json(serde_json::json!({
        "roles": roles,
        "permissions": permissions,
    })))
}

/// `GET /auth/permission/permission/list`
pub async fn list_permissions(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
) -> AppResult<Json<serde_json::Value>> {
    require_manage(&state, &tenant, &auth, "permission.permissionList").await?;

    let permissions = state.permission_engine.list_permissions().await?;
    Ok(Json(serde_json::json!({ "permissions": permissions })))
}

/// `GET /auth/permission/role/list` — roles visible to the tenant.
pub async fn list_roles(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
) -> AppResult<Json<serde_json::Value>> {
    require_manage(&state, &tenant, &auth, "permission.roleList").await?;

    let views = state.permission_engine.list_roles(tenant.tenant.id).await?;
    let roles: Vec<serde_json::Value> = views
        .iter()
        .map(|view| {
            serde_json::json!({
                "id": view.role.id,
                "identifier": view.role.identifier,
                "tenantId": view.role.tenant_id,
                "isEditable": view.is_editable,
                "permissions": view.permissions,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({ "roles": roles })))
}

/// `POST /auth/permission/role` — create a tenant-scoped role.
pub async fn create_role(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Json(body): Json<RoleCreateRequest>,
) -> AppResult<Json<serde_json::Value>> {
    require_manage(&state, &tenant, &auth, "permission.roleCreate").await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    let role = state
        .permission_engine
        .create_role(&mut *tx, tenant.tenant.id, &body.identifier)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(serde_json::json!({
        "id": role.id,
        "identifier": role.identifier,
    })))
}

/// `DELETE /auth/permission/role/{id}`
pub async fn delete_role(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Path(role_id): Path<Uuid>,
) -> AppResult<Json<SuccessResponse>> {
    require_manage(&state, &tenant, &auth, "permission.roleDelete").await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state.permission_engine.delete_role(&mut *tx, role_id).await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}

/// `POST /auth/permission/role/{id}/add-permissions`
pub async fn add_permissions(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Path(role_id): Path<Uuid>,
    Json(body): Json<RolePermissionsRequest>,
) -> AppResult<Json<SuccessResponse>> {
    require_manage(&state, &tenant, &auth, "permission.roleAddPermissions").await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .permission_engine
        .add_permissions(&mut *tx, role_id, &body.permissions)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}

/// `POST /auth/permission/role/{id}/remove-permissions`
pub async fn remove_permissions(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Path(role_id): Path<Uuid>,
    Json(body): Json<RolePermissionsRequest>,
) -> AppResult<Json<SuccessResponse>> {
    require_manage(&state, &tenant, &auth, "permission.roleRemovePermissions").await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .permission_engine
        .remove_permissions(&mut *tx, role_id, &body.permissions)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}

/// `POST /auth/permission/user/{id}/assign-role`
pub async fn assign_role(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UserRoleRequest>,
) -> AppResult<Json<SuccessResponse>> {
    require_manage(&state, &tenant, &auth, "permission.userAssignRole").await?;
    state.user_directory.get_user(user_id).await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .permission_engine
        .assign_role(&mut *tx, user_id, body.role)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}

/// `POST /auth/permission/user/{id}/remove-role`
pub async fn remove_role(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UserRoleRequest>,
) -> AppResult<Json<SuccessResponse>> {
    require_manage(&state, &tenant, &auth, "permission.userRemoveRole").await?;
    state.user_directory.get_user(user_id).await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .permission_engine
        .remove_role(&mut *tx, user_id, body.role)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}

/// `GET /auth/permission/user/{id}/summary`
pub async fn user_summary(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    require_manage(&state, &tenant, &auth, "permission.userSummary").await?;
    state.user_directory.get_user(user_id).await?;

    let (roles, permissions) = state
        .permission_engine
        .user_summary(user_id, tenant.tenant.id)
        .await?;

    Ok(Json(serde_json::json!({
        "roles": roles,
        "permissions": permissions,
    })))
}

/// `POST /auth/permission/user/{id}/sync-roles`
pub async fn user_sync_roles(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Path(user_id): Path<Uuid>,
    Json(body): Json<serde_json::Value>,
) -> AppResult<Json<SuccessResponse>> {
    require_manage(&state, &tenant, &auth, "permission.userSyncRoles").await?;
    state.user_directory.get_user(user_id).await?;

    let selector = RoleSelector {
        id_in: body
            .get("idIn")
            .and_then(|v| serde_json::from_value(v.clone()).ok()),
        identifier_in: body
            .get("identifierIn")
            .and_then(|v| serde_json::from_value(v.clone()).ok()),
    };

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .permission_engine
        .user_sync_roles(&mut *tx, user_id, tenant.tenant.id, selector)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}
