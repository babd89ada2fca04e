//! Feature flag handlers.

use axum::Json;
use axum::extract::State;

use lightbase_core::result::AppResult;

use crate::extractors::TenantContext;
use crate::state::AppState;

/// `GET /feature-flag/current` — the declared flag set resolved for the
/// request's tenant.
pub async fn current(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> AppResult<Json<serde_json::Value>> {
    let flags = state
        .feature_flags
        .current_for_tenant(&tenant.tenant.name)
        .await?;

    Ok(Json(serde_json::json!({ "featureFlags": flags })))
}
