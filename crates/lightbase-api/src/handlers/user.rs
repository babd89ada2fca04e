//! Admin user handlers.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use lightbase_core::result::AppResult;
use lightbase_database::repositories::user::UserListFilter;
use lightbase_service::permission::{PERMISSION_USER_LIST, PERMISSION_USER_MANAGE};
use lightbase_service::user::RequireUserOptions;

use crate::dto::request::{ListUsersRequest, SetActiveRequest, UpdateUserRequest};
use crate::dto::response::SuccessResponse;
use crate::error::tx_err;
use crate::extractors::{AuthSession, TenantContext};
use crate::state::AppState;

/// `POST /auth/list-users`
pub async fn list_users(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Json(body): Json<ListUsersRequest>,
) -> AppResult<Json<serde_json::Value>> {
    state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("auth.listUsers").with_permissions(&[PERMISSION_USER_LIST]),
        )
        .await?;

    let filter = UserListFilter {
        tenant_id: Some(tenant.tenant.id),
        has_password_login: body.has_password_login,
        has_anonymous_login: body.has_anonymous_login,
        has_digid_login: body.has_digid_login,
        has_keycloak_login: body.has_keycloak_login,
        include_deleted: body.include_deleted,
    };

    let users = state.user_directory.list_users(&filter).await?;

    let mut summaries = Vec::with_capacity(users.len());
    for user in &users {
        let with_logins = state.user_directory.get_user(user.id).await?;
        summaries.push(
            state
                .user_directory
                .user_summary(&with_logins, tenant.tenant.id)
                .await?,
        );
    }

    Ok(Json(serde_json::json!({ "users": summaries })))
}

/// `GET /auth/user/{id}`
pub async fn get_user(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("auth.getUser").with_permissions(&[PERMISSION_USER_LIST]),
        )
        .await?;

    let user = state.user_directory.get_user(user_id).await?;
    let summary = state
        .user_directory
        .user_summary(&user, tenant.tenant.id)
        .await?;

    Ok(Json(serde_json::json!({ "user": summary })))
}

/// `PUT /auth/user/{id}/update`
pub async fn update_user(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("auth.updateUser").with_permissions(&[PERMISSION_USER_MANAGE]),
        )
        .await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .user_directory
        .update_user(&mut *tx, user_id, body.name.as_deref())
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}

/// `POST /auth/user/{id}/set-active` — soft-delete or re-activate.
pub async fn set_active(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetActiveRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("auth.setUserActive")
                .with_permissions(&[PERMISSION_USER_MANAGE]),
        )
        .await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .user_directory
        .set_active(&mut *tx, user_id, body.active)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}
