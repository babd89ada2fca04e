//! Authentication provider state machines.
//!
//! Each provider authenticates a user and produces a session seed; the
//! shared tail here turns the seed into a session: an already-loaded
//! session is invalidated, the new session is created with its device
//! bound, and the signed token pair is returned.

pub mod anonymous;
pub mod digid;
pub mod keycloak;
pub mod password;
pub mod totp;

use sqlx::PgConnection;
use uuid::Uuid;

use lightbase_core::result::AppResult;
use lightbase_entity::login::LoginType;
use lightbase_entity::session::{DeviceInput, Session, SessionData, TokenPair, TwoStepType};

use crate::providers::totp::TotpProvider;
use crate::session::{LoadedSession, SessionStore};

/// Result of a completed login through any provider.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    /// The created session.
    pub session: Session,
    /// The signed access/refresh pair.
    pub tokens: TokenPair,
}

/// Determine the session seed for a first-factor authentication: a user
/// with a verified authenticator setup lands in `checkTwoStep` until the
/// second factor passes.
pub async fn determine_session_data(
    totp_provider: &TotpProvider,
    user_id: Uuid,
    login_type: LoginType,
) -> AppResult<SessionData> {
    if totp_provider.is_active_for_user(user_id).await? {
        return Ok(SessionData::check_two_step(
            user_id,
            login_type,
            TwoStepType::TotpProvider,
        ));
    }
    Ok(SessionData::user(user_id, login_type))
}

/// Shared provider tail: replace the current session (if any) with a fresh
/// one for the authenticated seed.
pub async fn finalize_login(
    store: &SessionStore,
    conn: &mut PgConnection,
    existing: Option<&LoadedSession>,
    data: SessionData,
    device: Option<&DeviceInput>,
) -> AppResult<AuthOutcome> {
    if let Some(loaded) = existing {
        store.invalidate(conn, loaded.session.id).await?;
    }

    let (session, tokens) = store.create_session(conn, &data, device).await?;

    Ok(AuthOutcome { session, tokens })
}
