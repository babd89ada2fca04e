//! Session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::login::LoginType;

/// Revocable server-side authentication state.
///
/// The `data` blob is owned by the auth layer; the stored checksum is a
/// content hash over it, and a mismatch at load means tampering or a stale
/// update and invalidates the session.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Unique session identifier.
    pub id: Uuid,
    /// Hex SHA-256 over the serialized `data`.
    pub checksum: String,
    /// Opaque session data blob.
    pub data: serde_json::Value,
    /// Soft revocation marker.
    pub revoked_at: Option<DateTime<Utc>>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has been revoked.
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Deserialize the data blob into its structured form.
    pub fn parsed_data(&self) -> Result<SessionData, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

/// The lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionType {
    /// Fully authenticated.
    User,
    /// Authenticated with the first factor, waiting on the second.
    CheckTwoStep,
    /// Password expired; only the update-password endpoint is reachable.
    PasswordBasedUpdatePassword,
}

/// The pending second factor of a `checkTwoStep` session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TwoStepType {
    /// Email OTP issued by the password provider.
    PasswordBasedOtp,
    /// Authenticator-app TOTP.
    TotpProvider,
}

/// Structured form of the session data blob.
///
/// `user_id` is required when `session_type` is [`SessionType::User`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    /// The authenticated (or authenticating) user.
    pub user_id: Uuid,
    /// The provider that established the session.
    pub login_type: LoginType,
    /// Lifecycle state.
    #[serde(rename = "type")]
    pub session_type: SessionType,
    /// Pending second factor, present while `session_type` is checkTwoStep.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_step_type: Option<TwoStepType>,
    /// Set while an operator is impersonating `user_id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impersonator_user_id: Option<Uuid>,
}

impl SessionData {
    /// A fully-authenticated session seed for the given user and provider.
    pub fn user(user_id: Uuid, login_type: LoginType) -> Self {
        Self {
            user_id,
            login_type,
            session_type: SessionType::User,
            two_step_type: None,
            impersonator_user_id: None,
        }
    }

    /// A two-step pending session seed.
    pub fn check_two_step(user_id: Uuid, login_type: LoginType, two_step: TwoStepType) -> Self {
        Self {
            user_id,
            login_type,
            session_type: SessionType::CheckTwoStep,
            two_step_type: Some(two_step),
            impersonator_user_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_data_wire_shape() {
        let data = SessionData::check_two_step(
            Uuid::nil(),
            LoginType::PasswordBased,
            TwoStepType::PasswordBasedOtp,
        );
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["type"], "checkTwoStep");
        assert_eq!(value["loginType"], "passwordBased");
        assert_eq!(value["twoStepType"], "passwordBasedOtp");
        assert!(value.get("impersonatorUserId").is_none());
    }
}
