//! Session store: issue access/refresh pairs, validate bearer tokens,
//! rotate refresh tokens, revoke sessions.
//!
//! Every non-500 error raised here carries a `session.`-prefixed key and is
//! surfaced as HTTP 401 at the API boundary.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgConnection;
use tracing::{info, warn};
use uuid::Uuid;

use lightbase_core::config::{AuthConfig, SessionConfig};
use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;
use lightbase_database::repositories::device::DeviceRepository;
use lightbase_database::repositories::session::SessionRepository;
use lightbase_database::repositories::session_token::SessionTokenRepository;
use lightbase_entity::session::{DeviceInput, Session, SessionData, SessionToken, TokenPair};

use crate::device;
use crate::token::TokenSigner;

/// Per-call override of the refresh token max age.
///
/// Sees the session data and the proposed device; returning `None` keeps
/// the configured default.
pub trait RefreshMaxAgeResolver: Send + Sync {
    /// Resolve the refresh token lifetime for this session.
    fn resolve(&self, data: &SessionData, device: Option<&DeviceInput>) -> Option<Duration>;
}

/// A validated session attached to a request.
#[derive(Debug, Clone)]
pub struct LoadedSession {
    /// The session row.
    pub session: Session,
    /// The access-token row the bearer string pointed at.
    pub token: SessionToken,
    /// Parsed session data.
    pub data: SessionData,
}

/// Content hash over the serialized session data.
///
/// A stored checksum that no longer matches the blob denotes tampering or
/// a stale concurrent update and invalidates the session on load.
pub fn session_checksum(data: &serde_json::Value) -> String {
    let serialized = serde_json::to_vec(data).unwrap_or_default();
    let digest = Sha256::digest(&serialized);
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Manages session records and their token chains.
#[derive(Clone)]
pub struct SessionStore {
    sessions: SessionRepository,
    tokens: SessionTokenRepository,
    devices: DeviceRepository,
    signer: TokenSigner,
    auth_config: AuthConfig,
    session_config: SessionConfig,
    refresh_max_age: Option<Arc<dyn RefreshMaxAgeResolver>>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("auth_config", &self.auth_config)
            .field("session_config", &self.session_config)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates a new session store.
    pub fn new(
        sessions: SessionRepository,
        tokens: SessionTokenRepository,
        devices: DeviceRepository,
        signer: TokenSigner,
        auth_config: AuthConfig,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            sessions,
            tokens,
            devices,
            signer,
            auth_config,
            session_config,
            refresh_max_age: None,
        }
    }

    /// Register a per-call refresh max age resolver.
    #[must_use]
    pub fn with_refresh_max_age_resolver(
        mut self,
        resolver: Arc<dyn RefreshMaxAgeResolver>,
    ) -> Self {
        self.refresh_max_age = Some(resolver);
        self
    }

    /// Create a session for the given data, bind the device, and issue the
    /// first token pair. Runs on the caller's transaction.
    pub async fn create_session(
        &self,
        conn: &mut PgConnection,
        data: &SessionData,
        device_input: Option<&DeviceInput>,
    ) -> AppResult<(Session, TokenPair)> {
        if self.session_config.require_device && device_input.is_none() {
            return Err(AppError::validation("auth.login.missingDevice"));
        }
        if let Some(input) = device_input {
            device::validate_input(input)?;
            device::enforce_mobile_cap(
                &self.sessions,
                data.user_id,
                input,
                &self.session_config,
            )
            .await?;
        }

        let value = serde_json::to_value(data)?;
        let checksum = session_checksum(&value);
        let session = self.sessions.create(conn, &checksum, &value).await?;

        if let Some(input) = device_input {
            self.devices.create(conn, session.id, input).await?;
        }

        let pair = self.issue_pair(conn, &session, data, device_input).await?;

        info!(
            session_id = %session.id,
            user_id = %data.user_id,
            login_type = %data.login_type,
            "Session created"
        );

        Ok((session, pair))
    }

    /// Validate an access bearer string and load its session.
    pub async fn load(&self, bearer: &str) -> AppResult<LoadedSession> {
        let token_id = self.signer.verify(bearer)?;

        let token = self
            .tokens
            .find_by_id(token_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("session.load.invalidToken"))?;

        // Access rows carry the link to their paired refresh row; a refresh
        // token presented as a bearer is rejected outright.
        if token.refresh_token_id.is_none() {
            return Err(AppError::unauthorized("session.load.invalidToken"));
        }
        if token.revoked_at.is_some() {
            return Err(AppError::unauthorized("session.load.revokedToken"));
        }
        if token.expires_at <= Utc::now() {
            return Err(AppError::unauthorized("session.load.expiredToken"));
        }

        let session = self
            .sessions
            .find_by_id(token.session_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("session.load.invalidSession"))?;

        if session.is_revoked() {
            return Err(AppError::unauthorized("session.load.invalidSession"));
        }
        if session_checksum(&session.data) != session.checksum {
            warn!(session_id = %session.id, "Session checksum mismatch");
            return Err(AppError::unauthorized("session.load.invalidSession"));
        }

        let data = session
            .parsed_data()
            .map_err(|_| AppError::unauthorized("session.load.invalidSession"))?;

        Ok(LoadedSession {
            session,
            token,
            data,
        })
    }

    /// Rotate a refresh token: revoke the presented row and issue a new
    /// pair on the same session.
    ///
    /// Replay rule: a refresh row that is already revoked burns the entire
    /// chain of its session, which catches stolen-token replay.
    pub async fn refresh(
        &self,
        conn: &mut PgConnection,
        refresh_bearer: &str,
    ) -> AppResult<TokenPair> {
        let token_id = self.signer.verify(refresh_bearer).map_err(|mut e| {
            e.key = "session.refresh.invalidToken".into();
            e
        })?;

        let token = self
            .tokens
            .find_by_id(token_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("session.refresh.invalidToken"))?;

        // Refresh rows have no paired-refresh link.
        if token.refresh_token_id.is_some() {
            return Err(AppError::unauthorized("session.refresh.invalidToken"));
        }

        if token.revoked_at.is_some() {
            // Detached from the request transaction: the revocation must
            // stick even though this request fails.
            let burned = self.tokens.revoke_chain_detached(token.session_id).await?;
            warn!(
                session_id = %token.session_id,
                burned,
                "Refresh token replay detected, chain revoked"
            );
            return Err(AppError::unauthorized("session.refresh.revokedToken"));
        }
        if token.expires_at <= Utc::now() {
            return Err(AppError::unauthorized("session.refresh.expiredToken"));
        }

        let session = self
            .sessions
            .find_by_id(token.session_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("session.refresh.invalidSession"))?;
        if session.is_revoked() {
            return Err(AppError::unauthorized("session.refresh.invalidSession"));
        }

        let data = session
            .parsed_data()
            .map_err(|_| AppError::unauthorized("session.refresh.invalidSession"))?;

        self.tokens.revoke(conn, token.id).await?;

        let pair = self.issue_pair(conn, &session, &data, None).await?;

        info!(session_id = %session.id, "Refresh token rotated");
        Ok(pair)
    }

    /// Rewrite the session data blob and its checksum.
    pub async fn update_data(
        &self,
        conn: &mut PgConnection,
        session_id: Uuid,
        data: &SessionData,
    ) -> AppResult<()> {
        let value = serde_json::to_value(data)?;
        let checksum = session_checksum(&value);
        self.sessions
            .update_data(conn, session_id, &checksum, &value)
            .await
    }

    /// Soft-revoke a session and burn its token chain.
    pub async fn invalidate(&self, conn: &mut PgConnection, session_id: Uuid) -> AppResult<()> {
        self.sessions.revoke(conn, session_id).await?;
        self.tokens.revoke_chain(conn, session_id).await?;
        info!(session_id = %session_id, "Session invalidated");
        Ok(())
    }

    /// Hard-delete a session; tokens and device cascade.
    pub async fn delete(&self, conn: &mut PgConnection, session_id: Uuid) -> AppResult<()> {
        self.sessions.delete(conn, session_id).await
    }

    /// Issue a linked refresh + access row pair and sign both.
    async fn issue_pair(
        &self,
        conn: &mut PgConnection,
        session: &Session,
        data: &SessionData,
        device_input: Option<&DeviceInput>,
    ) -> AppResult<TokenPair> {
        let now = Utc::now();

        let refresh_age = self
            .refresh_max_age
            .as_ref()
            .and_then(|r| r.resolve(data, device_input))
            .unwrap_or_else(|| Duration::hours(self.auth_config.refresh_token_ttl_hours));
        let refresh_expires: DateTime<Utc> = now + refresh_age;
        let access_expires: DateTime<Utc> =
            now + Duration::minutes(self.auth_config.access_token_ttl_minutes);

        let refresh_row = self
            .tokens
            .create(conn, session.id, refresh_expires, None)
            .await?;
        let access_row = self
            .tokens
            .create(conn, session.id, access_expires, Some(refresh_row.id))
            .await?;

        Ok(TokenPair {
            access_token: self.signer.sign(access_row.id, access_expires)?,
            refresh_token: self.signer.sign(refresh_row.id, refresh_expires)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_stable_and_content_sensitive() {
        let a = serde_json::json!({ "userId": "u1", "type": "user" });
        let b = serde_json::json!({ "userId": "u1", "type": "user" });
        let c = serde_json::json!({ "userId": "u2", "type": "user" });

        assert_eq!(session_checksum(&a), session_checksum(&b));
        assert_ne!(session_checksum(&a), session_checksum(&c));
        assert_eq!(session_checksum(&a).len(), 64);
    }
}
