//! Operator management handlers.

use axum::Json;
use axum::extract::State;

use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;
use lightbase_service::management::MagicLinkDelivery;
use lightbase_service::permission::PERMISSION_FEATURE_FLAG_MANAGE;
use lightbase_service::user::RequireUserOptions;

use crate::dto::request::{FeatureFlagSetRequest, MagicLinkRequest};
use crate::dto::response::SuccessResponse;
use crate::error::tx_err;
use crate::extractors::{AuthSession, TenantContext};
use crate::state::AppState;

/// `POST /_lightbase/management/request-magic-link`
///
/// In development the link comes back inline; elsewhere it is delivered
/// through the messaging platform.
pub async fn request_magic_link(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(body): Json<MagicLinkRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let management = state
        .management
        .as_ref()
        .ok_or_else(|| AppError::not_found("management.notEnabled"))?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    let delivery = management
        .request_magic_link(&mut *tx, &tenant.0, &body.chat_user_id)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    match delivery {
        MagicLinkDelivery::Sent => Ok(Json(serde_json::json!({ "success": true }))),
        MagicLinkDelivery::Inline(link) => Ok(Json(serde_json::json!({
            "success": true,
            "magicLink": link,
        }))),
    }
}

/// `GET /_lightbase/management/feature-flags`
pub async fn list_feature_flags(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
) -> AppResult<Json<serde_json::Value>> {
    state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("management.featureFlagList")
                .with_permissions(&[PERMISSION_FEATURE_FLAG_MANAGE]),
        )
        .await?;

    let flags = state.feature_flags.list().await?;
    let rows: Vec<serde_json::Value> = flags
        .iter()
        .map(|flag| {
            serde_json::json!({
                "name": flag.name,
                "globalValue": flag.global_value,
                "description": flag.description,
                "tenantValues": flag.tenant_values,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({ "featureFlags": rows })))
}

/// `POST /_lightbase/management/feature-flags` — update a flag.
pub async fn set_feature_flag(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Json(body): Json<FeatureFlagSetRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("management.featureFlagSet")
                .with_permissions(&[PERMISSION_FEATURE_FLAG_MANAGE]),
        )
        .await?;

    state
        .feature_flags
        .set_dynamic(&body.name, body.global_value, body.tenant_values.as_ref())
        .await?;

    Ok(Json(SuccessResponse::ok()))
}
