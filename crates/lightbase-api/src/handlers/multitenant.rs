//! Multitenant handlers.

use axum::Json;

use lightbase_core::result::AppResult;

use crate::extractors::TenantContext;

/// `GET /multitenant/current` — the tenant this request resolved to.
pub async fn current(tenant: TenantContext) -> AppResult<Json<serde_json::Value>> {
    Ok(Json(serde_json::json!({
        "tenant": {
            "id": tenant.tenant.id,
            "name": tenant.tenant.name,
        },
        "publicUrl": tenant.public_url,
        "apiUrl": tenant.api_url,
    })))
}
