//! Keycloak provider handlers.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;
use lightbase_auth::providers::keycloak::KeycloakProvider;
use lightbase_auth::providers::{determine_session_data, finalize_login};
use lightbase_entity::login::LoginType;
use lightbase_entity::session::TokenPair;
use lightbase_service::permission::PERMISSION_USER_MANAGE;
use lightbase_service::user::{NewUser, RequireUserOptions};

use crate::dto::request::{KeycloakCreateRequest, KeycloakLoginRequest, KeycloakRedirectRequest, KeycloakUpdateRequest};
use crate::dto::response::{RedirectUrlResponse, SuccessResponse};
use crate::error::tx_err;
use crate::extractors::{AuthSession, OptionalAuthSession, TenantContext};
use crate::state::AppState;

fn provider(state: &AppState) -> AppResult<&KeycloakProvider> {
    state
        .keycloak_provider
        .as_deref()
        .ok_or_else(|| AppError::not_found("authKeycloakBased.notEnabled"))
}

/// `POST /auth/keycloak-based/redirect` — the authorization-code URL.
pub async fn redirect(
    State(state): State<AppState>,
    Json(body): Json<KeycloakRedirectRequest>,
) -> AppResult<Json<RedirectUrlResponse>> {
    let state_param = Uuid::new_v4().simple().to_string();
    let redirect_url = provider(&state)?.redirect_url(&body.redirect_uri, &state_param)?;
    Ok(Json(RedirectUrlResponse { redirect_url }))
}

/// `POST /auth/keycloak-based/login` — exchange the code, read userinfo,
/// and log the federated user in.
pub async fn login(
    State(state): State<AppState>,
    tenant: TenantContext,
    OptionalAuthSession(existing): OptionalAuthSession,
    Json(body): Json<KeycloakLoginRequest>,
) -> AppResult<Json<TokenPair>> {
    // Token exchange and userinfo happen before the transaction opens.
    let user_info = provider(&state)?
        .exchange_code(&body.code, &body.redirect_uri)
        .await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;

    let user_id = provider(&state)?
        .attach_user(&mut *tx, &tenant.tenant, &user_info)
        .await?;

    if let Some(loaded) = &existing {
        state
            .user_directory
            .combine_users(&mut *tx, loaded.data.user_id, user_id)
            .await?;
    }

    let data =
        determine_session_data(&state.totp_provider, user_id, LoginType::KeycloakBased).await?;
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

/// `POST /auth/keycloak-based/create` — admin-create a federated user.
pub async fn create(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Json(body): Json<KeycloakCreateRequest>,
) -> AppResult<Json<serde_json::Value>> {
    state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("authKeycloakBased.create")
                .with_permissions(&[PERMISSION_USER_MANAGE]),
        )
        .await?;

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    let user = state
        .user_directory
        .create_user(
            &mut *tx,
            tenant.tenant.id,
            NewUser {
                name: body.name,
                with_keycloak: Some(body.email),
                ..NewUser::default()
            },
        )
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(serde_json::json!({ "id": user.id })))
}

/// `POST /auth/keycloak-based/user/{id}/update` — admin-rewrite the login
/// email.
pub async fn update(
    State(state): State<AppState>,
    tenant: TenantContext,
    auth: AuthSession,
    Path(user_id): Path<Uuid>,
    Json(body): Json<KeycloakUpdateRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state
        .user_directory
        .require_user(
            &auth.data,
            tenant.tenant.id,
            &RequireUserOptions::new("authKeycloakBased.updateUser")
                .with_permissions(&[PERMISSION_USER_MANAGE]),
        )
        .await?;

    let target = state.user_directory.get_user(user_id).await?;
    if target.keycloak_login.is_none() {
        return Err(AppError::validation("authKeycloakBased.updateUser.noKeycloakLogin"));
    }

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .user_directory
        .update_keycloak_email(&mut *tx, user_id, &body.email)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}
