//! Device bound to a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use std::fmt;

/// The platform a session's device runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "device_platform", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DevicePlatform {
    /// iOS / iPadOS.
    Apple,
    /// Android.
    Android,
    /// Desktop browser.
    Desktop,
    /// Anything else.
    Other,
}

impl DevicePlatform {
    /// Whether this platform counts toward the mobile session cap and may
    /// carry a notification token.
    pub fn is_mobile(self) -> bool {
        matches!(self, Self::Apple | Self::Android)
    }

    /// The lowercase wire form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Apple => "apple",
            Self::Android => "android",
            Self::Desktop => "desktop",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for DevicePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The device record bound 1:1 to a session.
///
/// Notification tokens are only valid on mobile platforms; web-push
/// subscriptions only on desktop.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Device {
    /// Unique device identifier.
    pub id: Uuid,
    /// The owning session (1:1).
    pub session_id: Uuid,
    /// Device platform.
    pub platform: DevicePlatform,
    /// Human-readable device name.
    pub name: String,
    /// Push notification token (mobile only).
    pub notification_token: Option<String>,
    /// Web-push subscription blob (desktop only).
    pub web_push_subscription: Option<serde_json::Value>,
    /// When the device was recorded.
    pub created_at: DateTime<Utc>,
    /// When the device was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Device info supplied on login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInput {
    /// Device platform.
    pub platform: DevicePlatform,
    /// Human-readable device name.
    pub name: String,
    /// Push notification token (mobile only).
    #[serde(default)]
    pub notification_token: Option<String>,
    /// Web-push subscription blob (desktop only).
    #[serde(default)]
    pub web_push_subscription: Option<serde_json::Value>,
}
