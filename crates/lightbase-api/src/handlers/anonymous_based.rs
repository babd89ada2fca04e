//! Anonymous provider handlers.

use axum::Json;
use axum::extract::State;

use lightbase_core::result::AppResult;
use lightbase_auth::providers::finalize_login;
use lightbase_entity::login::LoginType;
use lightbase_entity::session::{SessionData, TokenPair};

use crate::dto::request::AnonymousLoginRequest;
use crate::error::tx_err;
use crate::extractors::{OptionalAuthSession, TenantContext};
use crate::state::AppState;

/// `POST /auth/anonymous-based/login`
pub async fn login(
    State(state): State<AppState>,
    tenant: TenantContext,
    OptionalAuthSession(existing): OptionalAuthSession,
    Json(body): Json<AnonymousLoginRequest>,
) -> AppResult<Json<TokenPair>> {
    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;

    let user_id = state
        .anonymous_provider
        .login(&mut *tx, &tenant.tenant, &body.token)
        .await?;

    let result = finalize_login(
        &state.session_store,
        &mut *tx,
        existing.as_ref(),
        SessionData::user(user_id, LoginType::AnonymousBased),
        body.device.as_ref(),
    )
    .await?;

    tx.commit().await.map_err(tx_err)?;
    Ok(Json(result.tokens))
}
