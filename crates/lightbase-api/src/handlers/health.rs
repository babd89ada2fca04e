//! Health check handler.

use axum::Json;
use axum::extract::State;

use lightbase_core::result::AppResult;

use crate::state::AppState;

/// `GET /health` — process and database liveness.
pub async fn health(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db_pool)
        .await
        .map_err(|e| lightbase_core::AppError::database(Box::new(e)))?;

    Ok(Json(serde_json::json!({ "status": "ok" })))
}
