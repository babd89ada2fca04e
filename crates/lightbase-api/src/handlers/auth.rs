//! Core auth handlers: me, token rotation, logout, impersonation.

use axum::Json;
use axum::extract::State;

use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;
use lightbase_entity::session::{SessionType, TokenPair};
use lightbase_service::session::PERMISSION_IMPERSONATE;
use lightbase_service::user::RequireUserOptions;

use crate::dto::request::{ImpersonateRequest, RefreshTokensRequest};
use crate::dto::response::SuccessResponse;
use crate::error::{normalize_session_error, tx_err};
use crate::extractors::{AuthSession, TenantContext};
use crate::state::AppState;

/// `GET /auth/me` — the current session, with the user summary once the
/// session is fully authenticated.
pub async fn me(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
) -> AppResult<Json<serde_json::Value>> {
    let session_view = serde_json::to_value(&auth.data)?;

    if auth.data.session_type != SessionType::User {
        return Ok(Json(serde_json::json!({ "session": session_view })));
    }

    let user = state
        .user_directory
        .require_user(&auth.data, tenant.tenant.id, &RequireUserOptions::new("auth.me"))
        .await?;
    let summary = state
        .user_directory
        .user_summary(&user, tenant.tenant.id)
        .await?;

    Ok(Json(serde_json::json!({
        "session": session_view,
        "user": summary,
    })))
}

/// `POST /auth/refresh-tokens` — rotate the token pair.
pub async fn refresh_tokens(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokensRequest>,
) -> AppResult<Json<TokenPair>> {
    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;

    let pair = state
        .session_store
        .refresh(&mut *tx, &body.refresh_token)
        .await
        .map_err(normalize_session_error)?;

    tx.commit().await.map_err(tx_err)?;
    Ok(Json(pair))
}

/// `POST /auth/logout` — revoke the current session.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthSession,
) -> AppResult<Json<SuccessResponse>> {
    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state.session_store.invalidate(&mut *tx, auth.session.id).await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}

/// `POST /auth/impersonate-start-session` — operate as another user.
pub async fn impersonate_start(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Json(body): Json<ImpersonateRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("auth.impersonateStartSession")
                .with_permissions(&[PERMISSION_IMPERSONATE]),
        )
        .await?;

    // The target must exist and be visible in this tenant.
    let target = state.user_directory.get_user(body.user_id).await?;
    if !target.is_member_of(tenant.tenant.id) {
        return Err(AppError::not_found("auth.impersonateStartSession.invalidUser"));
    }

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .session_service
        .impersonate_start(&mut *tx, auth.session.id, &auth.data, body.user_id)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}

/// `POST /auth/impersonate-stop-session` — exit impersonation.
pub async fn impersonate_stop(
    State(state): State<AppState>,
    auth: AuthSession,
) -> AppResult<Json<SuccessResponse>> {
    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .session_service
        .impersonate_stop(&mut *tx, auth.session.id, &auth.data)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}
