//! Device repository implementation.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use lightbase_core::result::AppResult;
use lightbase_entity::session::{Device, DeviceInput};

use super::db_err;

/// Repository for session-bound devices.
#[derive(Debug, Clone)]
pub struct DeviceRepository {
    pool: PgPool,
}

impl DeviceRepository {
    /// Create a new device repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the device record in the transaction that creates its session.
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        session_id: Uuid,
        input: &DeviceInput,
    ) -> AppResult<Device> {
        sqlx::query_as::<_, Device>(
            "INSERT INTO device \
             (session_id, platform, name, notification_token, web_push_subscription) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(session_id)
        .bind(input.platform)
        .bind(&input.name)
        .bind(&input.notification_token)
        .bind(&input.web_push_subscription)
        .fetch_one(conn)
        .await
        .map_err(db_err)
    }

    /// Find the device bound to a session.
    pub async fn find_by_session(&self, session_id: Uuid) -> AppResult<Option<Device>> {
        sqlx::query_as::<_, Device>("SELECT * FROM device WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Update the push notification token of a mobile device.
    pub async fn set_notification_token(
        &self,
        session_id: Uuid,
        notification_token: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE device SET notification_token = $2, updated_at = NOW() WHERE session_id = $1",
        )
        .bind(session_id)
        .bind(notification_token)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Update the web-push subscription of a desktop device.
    pub async fn set_web_push_subscription(
        &self,
        session_id: Uuid,
        subscription: &serde_json::Value,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE device SET web_push_subscription = $2, updated_at = NOW() \
             WHERE session_id = $1",
        )
        .bind(session_id)
        .bind(subscription)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
