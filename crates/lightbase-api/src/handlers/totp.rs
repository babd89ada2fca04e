//! TOTP second-factor handlers.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;
use lightbase_entity::session::{SessionType, TwoStepType};
use lightbase_service::permission::PERMISSION_TOTP_MANAGE;
use lightbase_service::user::RequireUserOptions;

use crate::dto::request::TotpRequest;
use crate::dto::response::SuccessResponse;
use crate::error::tx_err;
use crate::extractors::{AuthSession, TenantContext};
use crate::state::AppState;

/// `GET /auth/totp-provider/info`
pub async fn info(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
) -> AppResult<Json<serde_json::Value>> {
    let user = state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("authTotpProvider.info"),
        )
        .await?;

    let settings = state.totp_provider.info(user.user.id).await?;

    Ok(Json(serde_json::json!({
        "isConfigured": settings.is_some(),
        "isVerified": settings.map(|s| s.is_verified()).unwrap_or(false),
    })))
}

/// `POST /auth/totp-provider/setup` — issue a secret, persisted unverified.
pub async fn setup(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
) -> AppResult<Json<serde_json::Value>> {
    let user = state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("authTotpProvider.setup"),
        )
        .await?;

    let account_label = user
        .password_login
        .as_ref()
        .map(|login| login.email.clone())
        .unwrap_or_else(|| user.user.id.to_string());

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    let setup = state
        .totp_provider
        .setup(&mut *tx, user.user.id, &account_label)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(serde_json::json!({
        "secret": setup.secret,
        "otpauthUrl": setup.otpauth_url,
    })))
}

/// `POST /auth/totp-provider/setup/verify`
pub async fn setup_verify(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Json(body): Json<TotpRequest>,
) -> AppResult<Json<SuccessResponse>> {
    let user = state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("authTotpProvider.setupVerify"),
        )
        .await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .totp_provider
        .setup_verify(&mut *tx, user.user.id, &body.totp)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}

/// `POST /auth/totp-provider/verify` — runtime second factor; promotes the
/// session from `checkTwoStep` to `user`.
pub async fn verify(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(body): Json<TotpRequest>,
) -> AppResult<Json<SuccessResponse>> {
    if auth.data.session_type != SessionType::CheckTwoStep
        || auth.data.two_step_type != Some(TwoStepType::TotpProvider)
    {
        return Err(AppError::unauthorized("authTotpProvider.verify.invalidSession"));
    }

    state
        .totp_provider
        .verify(auth.data.user_id, &body.totp)
        .await?;

    let mut promoted = auth.data.clone();
    promoted.session_type = SessionType::User;
    promoted.two_step_type = None;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .session_store
        .update_data(&mut *tx, auth.session.id, &promoted)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}

/// `DELETE /auth/totp-provider/remove`
pub async fn remove(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
) -> AppResult<Json<SuccessResponse>> {
    let user = state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("authTotpProvider.remove"),
        )
        .await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state.totp_provider.remove(&mut *tx, user.user.id).await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}

/// `DELETE /auth/totp-provider/user/{id}/remove` — admin removal.
pub async fn remove_for_user(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<SuccessResponse>> {
    state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("authTotpProvider.removeForUser")
                .with_permissions(&[PERMISSION_TOTP_MANAGE]),
        )
        .await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state.totp_provider.remove(&mut *tx, user_id).await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}
