//! `AuthSession` extractor — pulls the bearer token from the Authorization
//! header and loads the session through the store.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use lightbase_auth::session::LoadedSession;
use lightbase_core::error::AppError;

use crate::error::normalize_session_error;
use crate::state::AppState;

/// Extracted authenticated session available in handlers.
#[derive(Debug, Clone)]
pub struct AuthSession(pub LoadedSession);

impl std::ops::Deref for AuthSession {
    type Target = LoadedSession;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("session.load.missingToken"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("session.load.missingToken"))?;

        let loaded = state
            .session_store
            .load(token)
            .await
            .map_err(normalize_session_error)?;

        Ok(AuthSession(loaded))
    }
}

/// Like [`AuthSession`] but absent instead of rejecting when no (valid)
/// bearer token is presented. Login endpoints use this to pick up a
/// session that is being replaced.
#[derive(Debug, Clone)]
pub struct OptionalAuthSession(pub Option<LoadedSession>);

impl FromRequestParts<AppState> for OptionalAuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match AuthSession::from_request_parts(parts, state).await {
            Ok(AuthSession(loaded)) => Ok(Self(Some(loaded))),
            Err(e) if e.is_server_error() => Err(e),
            Err(_) => Ok(Self(None)),
        }
    }
}
