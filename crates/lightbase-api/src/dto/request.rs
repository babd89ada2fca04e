//! Request bodies.

use serde::Deserialize;
use uuid::Uuid;

use lightbase_entity::session::DeviceInput;

/// `POST /auth/password-based/login`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordLoginRequest {
    /// Login email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// Device info; mandatory when the deployment requires device binding.
    #[serde(default)]
    pub device: Option<DeviceInput>,
}

/// `POST /auth/password-based/verify-otp`
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    /// The emailed OTP.
    pub otp: String,
}

/// `POST /auth/password-based/verify-email`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    /// The verify token from the registration mail.
    pub reset_token: String,
}

/// `POST /auth/password-based/forgot-password`
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    /// Login email.
    pub email: String,
}

/// `POST /auth/password-based/reset-password`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    /// The reset token from the mail.
    pub reset_token: String,
    /// The new plaintext password.
    pub password: String,
}

/// `POST /auth/password-based/update-email`
#[derive(Debug, Deserialize)]
pub struct UpdateEmailRequest {
    /// The new email address.
    pub email: String,
}

/// `POST /auth/password-based/update-password`
#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    /// The new plaintext password.
    pub password: String,
}

/// `POST /auth/anonymous-based/login`
#[derive(Debug, Deserialize)]
pub struct AnonymousLoginRequest {
    /// The opaque login token.
    pub token: String,
    /// Device info.
    #[serde(default)]
    pub device: Option<DeviceInput>,
}

/// `POST /auth/digid-based/login`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigidLoginRequest {
    /// The artifact handed back by the IdP.
    pub saml_art: String,
    /// Device info.
    #[serde(default)]
    pub device: Option<DeviceInput>,
}

/// `POST /auth/keycloak-based/redirect`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakRedirectRequest {
    /// Where the IdP sends the browser back to.
    pub redirect_uri: String,
}

/// `POST /auth/keycloak-based/login`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakLoginRequest {
    /// The authorization code.
    pub code: String,
    /// The redirect URI the code was issued for.
    pub redirect_uri: String,
    /// Device info.
    #[serde(default)]
    pub device: Option<DeviceInput>,
}

/// `POST /auth/keycloak-based/create`
#[derive(Debug, Deserialize)]
pub struct KeycloakCreateRequest {
    /// Email of the new federated user.
    pub email: String,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// `POST /auth/keycloak-based/user/{id}/update`
#[derive(Debug, Deserialize)]
pub struct KeycloakUpdateRequest {
    /// The new email address.
    pub email: String,
}

/// `POST /auth/totp-provider/setup/verify` and `/verify`
#[derive(Debug, Deserialize)]
pub struct TotpRequest {
    /// The authenticator token.
    pub totp: String,
}

/// `POST /auth/refresh-tokens`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokensRequest {
    /// The refresh token to rotate.
    pub refresh_token: String,
}

/// `POST /session/logout`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLogoutRequest {
    /// Session to revoke; defaults to the caller's.
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

/// `POST /session/set-notification-token`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetNotificationTokenRequest {
    /// Push token for mobile devices.
    #[serde(default)]
    pub notification_token: Option<String>,
    /// Web-push subscription for desktop devices.
    #[serde(default)]
    pub web_push_subscription: Option<serde_json::Value>,
}

/// `POST /auth/list-users`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersRequest {
    /// Require or exclude a password login.
    #[serde(default)]
    pub has_password_login: Option<bool>,
    /// Require or exclude an anonymous login.
    #[serde(default)]
    pub has_anonymous_login: Option<bool>,
    /// Require or exclude a DigiD login.
    #[serde(default)]
    pub has_digid_login: Option<bool>,
    /// Require or exclude a Keycloak login.
    #[serde(default)]
    pub has_keycloak_login: Option<bool>,
    /// Include soft-deleted users.
    #[serde(default)]
    pub include_deleted: bool,
}

/// `PUT /auth/user/{id}/update`
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    /// The new display name; null clears it.
    #[serde(default)]
    pub name: Option<String>,
}

/// `POST /auth/user/{id}/set-active`
#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    /// False soft-deletes the user, true re-activates.
    pub active: bool,
}

/// `POST /auth/permission/role`
#[derive(Debug, Deserialize)]
pub struct RoleCreateRequest {
    /// Per-tenant unique role identifier.
    pub identifier: String,
}

/// `POST /auth/permission/role/{id}/{add,remove}-permissions`
#[derive(Debug, Deserialize)]
pub struct RolePermissionsRequest {
    /// Permission identifiers.
    pub permissions: Vec<String>,
}

/// `POST /auth/permission/user/{id}/{assign,remove}-role`
#[derive(Debug, Deserialize)]
pub struct UserRoleRequest {
    /// The role id.
    pub role: Uuid,
}

/// `POST /auth/impersonate-start-session`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpersonateRequest {
    /// The user to operate as.
    pub user_id: Uuid,
}

/// `POST /_lightbase/management/request-magic-link`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagicLinkRequest {
    /// The operator's chat workspace user id.
    pub chat_user_id: String,
}

/// `POST /_lightbase/management/feature-flags`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlagSetRequest {
    /// The flag name.
    pub name: String,
    /// New global value.
    #[serde(default)]
    pub global_value: Option<bool>,
    /// Tenant overrides to merge in.
    #[serde(default)]
    pub tenant_values: Option<serde_json::Value>,
}
