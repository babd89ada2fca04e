//! Device binding rules.
//!
//! The device record is inserted in the same transaction that creates its
//! session; the checks here run first.

use lightbase_core::config::SessionConfig;
use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;
use lightbase_database::repositories::session::SessionRepository;
use lightbase_entity::session::DeviceInput;
use uuid::Uuid;

/// Reject device payloads that mix platform-specific fields: notification
/// tokens belong to mobile platforms, web-push subscriptions to desktop.
pub fn validate_input(input: &DeviceInput) -> AppResult<()> {
    if input.notification_token.is_some() && !input.platform.is_mobile() {
        return Err(AppError::validation(
            "auth.device.notificationTokenRequiresMobile",
        ));
    }
    if input.web_push_subscription.is_some()
        && input.platform != lightbase_entity::session::DevicePlatform::Desktop
    {
        return Err(AppError::validation(
            "auth.device.webPushRequiresDesktop",
        ));
    }
    Ok(())
}

/// Enforce the cap on concurrent mobile sessions for a user.
pub async fn enforce_mobile_cap(
    sessions: &SessionRepository,
    user_id: Uuid,
    input: &DeviceInput,
    config: &SessionConfig,
) -> AppResult<()> {
    let Some(max) = config.max_mobile_sessions else {
        return Ok(());
    };
    if !input.platform.is_mobile() {
        return Ok(());
    }

    let active = sessions.count_active_mobile_for_user(user_id).await?;
    if active >= max {
        return Err(
            AppError::validation("auth.device.tooManyMobileSessions").with_info(
                serde_json::json!({ "max": max }),
            ),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightbase_entity::session::DevicePlatform;

    fn device(platform: DevicePlatform) -> DeviceInput {
        DeviceInput {
            platform,
            name: "test".into(),
            notification_token: None,
            web_push_subscription: None,
        }
    }

    #[test]
    fn notification_token_requires_mobile() {
        let mut input = device(DevicePlatform::Desktop);
        input.notification_token = Some("tok".into());
        assert!(validate_input(&input).is_err());

        let mut input = device(DevicePlatform::Apple);
        input.notification_token = Some("tok".into());
        assert!(validate_input(&input).is_ok());
    }

    #[test]
    fn web_push_requires_desktop() {
        let mut input = device(DevicePlatform::Android);
        input.web_push_subscription = Some(serde_json::json!({ "endpoint": "x" }));
        assert!(validate_input(&input).is_err());

        let mut input = device(DevicePlatform::Desktop);
        input.web_push_subscription = Some(serde_json::json!({ "endpoint": "x" }));
        assert!(validate_input(&input).is_ok());
    }
}
