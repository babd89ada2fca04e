//! Session administration: listing, targeted logout, device notification
//! channels, and impersonation.

use sqlx::PgConnection;
use tracing::info;
use uuid::Uuid;

use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;
use lightbase_auth::session::SessionStore;
use lightbase_database::repositories::device::DeviceRepository;
use lightbase_database::repositories::session::SessionRepository;
use lightbase_entity::session::{Device, Session, SessionData};

/// Permission required to start impersonating another user.
pub const PERMISSION_IMPERSONATE: &str = "auth:impersonate";

/// A session with its bound device, the `/session/list` row.
#[derive(Debug, Clone)]
pub struct SessionWithDevice {
    /// The session row.
    pub session: Session,
    /// The bound device, if any.
    pub device: Option<Device>,
}

/// Session administration service.
#[derive(Debug, Clone)]
pub struct SessionService {
    sessions: SessionRepository,
    devices: DeviceRepository,
    store: SessionStore,
}

impl SessionService {
    /// Creates the service.
    pub fn new(sessions: SessionRepository, devices: DeviceRepository, store: SessionStore) -> Self {
        Self {
            sessions,
            devices,
            store,
        }
    }

    /// Non-revoked sessions of a user with their devices, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<SessionWithDevice>> {
        let sessions = self.sessions.find_active_by_user(user_id).await?;
        let mut result = Vec::with_capacity(sessions.len());

        for session in sessions {
            let device = self.devices.find_by_session(session.id).await?;
            result.push(SessionWithDevice { session, device });
        }
        Ok(result)
    }

    /// Revoke one session of a user. The target must belong to the caller.
    pub async fn logout_session(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        session_id: Uuid,
    ) -> AppResult<()> {
        let session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| AppError::not_found("session.logout.unknownSession"))?;

        let data = session
            .parsed_data()
            .map_err(|_| AppError::not_found("session.logout.unknownSession"))?;
        if data.user_id != user_id {
            return Err(AppError::not_found("session.logout.unknownSession"));
        }

        self.store.invalidate(conn, session_id).await
    }

    /// Update the notification channel of the device bound to a session:
    /// notification tokens for mobile platforms, web-push subscriptions
    /// for desktop.
    pub async fn set_notification_token(
        &self,
        session_id: Uuid,
        notification_token: Option<&str>,
        web_push_subscription: Option<&serde_json::Value>,
    ) -> AppResult<()> {
        let device = self
            .devices
            .find_by_session(session_id)
            .await?
            .ok_or_else(|| AppError::validation("session.setNotificationToken.noDevice"))?;

        if let Some(token) = notification_token {
            if !device.platform.is_mobile() {
                return Err(AppError::validation(
                    "auth.device.notificationTokenRequiresMobile",
                ));
            }
            self.devices.set_notification_token(session_id, token).await?;
        }

        if let Some(subscription) = web_push_subscription {
            if device.platform != lightbase_entity::session::DevicePlatform::Desktop {
                return Err(AppError::validation("auth.device.webPushRequiresDesktop"));
            }
            self.devices
                .set_web_push_subscription(session_id, subscription)
                .await?;
        }

        Ok(())
    }

    // ── Impersonation ────────────────────────────────────────────

    /// Start operating as another user. The session keeps the operator in
    /// `impersonatorUserId`; permission checks from here on see the target.
    pub async fn impersonate_start(
        &self,
        conn: &mut PgConnection,
        session_id: Uuid,
        data: &SessionData,
        target_user_id: Uuid,
    ) -> AppResult<()> {
        if data.impersonator_user_id.is_some() {
            return Err(AppError::validation("auth.impersonate.alreadyImpersonating"));
        }

        let mut updated = data.clone();
        updated.impersonator_user_id = Some(data.user_id);
        updated.user_id = target_user_id;

        self.store.update_data(conn, session_id, &updated).await?;
        info!(
            operator = %data.user_id,
            target = %target_user_id,
            "Impersonation started"
        );
        Ok(())
    }

    /// Exit impersonation and restore the operator's own identity.
    pub async fn impersonate_stop(
        &self,
        conn: &mut PgConnection,
        session_id: Uuid,
        data: &SessionData,
    ) -> AppResult<()> {
        let Some(operator) = data.impersonator_user_id else {
            return Err(AppError::validation("auth.impersonateStop.notImpersonating"));
        };

        let mut updated = data.clone();
        updated.user_id = operator;
        updated.impersonator_user_id = None;

        self.store.update_data(conn, session_id, &updated).await?;
        info!(operator = %operator, "Impersonation stopped");
        Ok(())
    }
}
