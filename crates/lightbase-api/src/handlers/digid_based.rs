//! DigiD provider handlers.

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};

use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;
use lightbase_auth::providers::digid::DigidProvider;
use lightbase_auth::providers::{determine_session_data, finalize_login};
use lightbase_entity::login::LoginType;
use lightbase_entity::session::TokenPair;

use crate::dto::request::DigidLoginRequest;
use crate::dto::response::RedirectUrlResponse;
use crate::error::tx_err;
use crate::extractors::{OptionalAuthSession, TenantContext};
use crate::state::AppState;

fn provider(state: &AppState) -> AppResult<&DigidProvider> {
    state
        .digid_provider
        .as_deref()
        .ok_or_else(|| AppError::not_found("authDigidBased.notEnabled"))
}

/// `POST /auth/digid-based/metadata` — signed SAML metadata for federation
/// onboarding.
pub async fn metadata(State(state): State<AppState>) -> AppResult<Response> {
    let xml = provider(&state)?.metadata()?;

    Ok((
        [(header::CONTENT_TYPE, "application/samlmetadata+xml")],
        xml,
    )
        .into_response())
}

/// `POST /auth/digid-based/redirect` — the signed AuthnRequest URL.
pub async fn redirect(State(state): State<AppState>) -> AppResult<Json<RedirectUrlResponse>> {
    let redirect_url = provider(&state)?.redirect_url()?;
    Ok(Json(RedirectUrlResponse { redirect_url }))
}

/// `POST /auth/digid-based/login` — resolve the artifact over the back
/// channel and log the BSN's user in.
pub async fn login(
    State(state): State<AppState>,
    tenant: TenantContext,
    OptionalAuthSession(existing): OptionalAuthSession,
    Json(body): Json<DigidLoginRequest>,
) -> AppResult<Json<TokenPair>> {
    // The back-channel round trip happens before the transaction opens so
    // no locks are held across the outbound call.
    let bsn = provider(&state)?.resolve_artifact(&body.saml_art).await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;

    let user_id = provider(&state)?
        .login(&mut *tx, &tenant.tenant, &bsn)
        .await?;

    let data = determine_session_data(&state.totp_provider, user_id, LoginType::DigidBased).await?;
    let result = finalize_login(
        &state.session_store,
        &mut *tx,
        existing.as_ref(),
        data,
        body.device.as_ref(),
    )
    .await?;

    tx.commit().await.map_err(tx_err)?;
    Ok(Json(result.tokens))
}
