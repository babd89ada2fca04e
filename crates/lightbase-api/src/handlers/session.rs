//! Session administration handlers.

use axum::Json;
use axum::extract::State;

use lightbase_core::result::AppResult;

use crate::dto::request::{SessionLogoutRequest, SetNotificationTokenRequest};
use crate::dto::response::SuccessResponse;
use crate::error::tx_err;
use crate::extractors::AuthSession;
use crate::state::AppState;

/// `GET /session/list` — the caller's non-revoked sessions with devices.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthSession,
) -> AppResult<Json<serde_json::Value>> {
    let sessions = state
        .session_service
        .list_for_user(auth.data.user_id)
        .await?;

    let rows: Vec<serde_json::Value> = sessions
        .iter()
        .map(|entry| {
            serde_json::json!({
                "id": entry.session.id,
                "createdAt": entry.session.created_at,
                "isCurrentSession": entry.session.id == auth.session.id,
                "device": entry.device.as_ref().map(|device| serde_json::json!({
                    "platform": device.platform,
                    "name": device.name,
                })),
            })
        })
        .collect();

    Ok(Json(serde_json::json!({ "sessions": rows })))
}

/// `POST /session/logout` — revoke one of the caller's sessions.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(body): Json<SessionLogoutRequest>,
) -> AppResult<Json<SuccessResponse>> {
    let target = body.session_id.unwrap_or(auth.session.id);

    let mut tx = state.db_pool.begin().await.map_err(tx_err)?;
    state
        .session_service
        .logout_session(&mut *tx, auth.data.user_id, target)
        .await?;
    tx.commit().await.map_err(tx_err)?;

    Ok(Json(SuccessResponse::ok()))
}

/// `POST /session/set-notification-token` — update the device's push
/// channel.
pub async fn set_notification_token(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(body): Json<SetNotificationTokenRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state
        .session_service
        .set_notification_token(
            auth.session.id,
            body.notification_token.as_deref(),
            body.web_push_subscription.as_ref(),
        )
        .await?;

    Ok(Json(SuccessResponse::ok()))
}
