//! `TenantContext` extractor — resolves the tenant from the request
//! headers on every call.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use lightbase_core::error::AppError;
use lightbase_service::tenant::{RequestOrigin, ResolvedTenant, TENANT_ORIGIN_HEADER};

use crate::state::AppState;

/// The tenant the request resolved to.
#[derive(Debug, Clone)]
pub struct TenantContext(pub ResolvedTenant);

impl std::ops::Deref for TenantContext {
    type Target = ResolvedTenant;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn header(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

impl FromRequestParts<AppState> for TenantContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let origin = RequestOrigin {
            host: header(parts, "host"),
            origin: header(parts, "origin"),
            tenant_origin_override: header(parts, TENANT_ORIGIN_HEADER),
        };

        let resolved = state.tenant_service.resolve_request(&origin).await?;
        Ok(TenantContext(resolved))
    }
}
