//! Domain events emitted by the identity core.
//!
//! Events are enqueued as background jobs inside the transaction that
//! produced the state change, so a rolled-back request leaves no events
//! behind. Consumers (mail, push, audit) live outside this repository; the
//! job name is the contract.

use serde::{Deserialize, Serialize};

/// All events the identity core can emit.
///
/// The serialized job name is camelCase-dotted and stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthEvent {
    /// A password-based user was registered; payload carries the verify or
    /// reset token for mail delivery.
    PasswordUserRegistered,
    /// A password login requested an email OTP as second factor.
    PasswordRequestOtp,
    /// A password login's email address was verified.
    PasswordLoginVerified,
    /// A password was reset through a reset token.
    PasswordReset,
    /// A forgot-password flow issued a reset token.
    PasswordForgot,
    /// The email address of a password login changed.
    PasswordEmailUpdated,
    /// The password of a password login changed.
    PasswordUpdated,
    /// An anonymous user was registered.
    AnonymousUserRegistered,
    /// A federated user was implicitly registered via the OIDC provider.
    KeycloakUserRegistered,
    /// A user was soft-deleted.
    UserSoftDeleted,
}

impl AuthEvent {
    /// The job name written to the queue for this event.
    pub fn job_name(self) -> &'static str {
        match self {
            Self::PasswordUserRegistered => "auth.passwordBased.userRegistered",
            Self::PasswordRequestOtp => "auth.passwordBased.requestOtp",
            Self::PasswordLoginVerified => "auth.passwordBased.loginVerified",
            Self::PasswordReset => "auth.passwordBased.passwordReset",
            Self::PasswordForgot => "auth.passwordBased.forgotPassword",
            Self::PasswordEmailUpdated => "auth.passwordBased.emailUpdated",
            Self::PasswordUpdated => "auth.passwordBased.passwordUpdated",
            Self::AnonymousUserRegistered => "auth.anonymousBased.userRegistered",
            Self::KeycloakUserRegistered => "auth.keycloakBased.userRegistered",
            Self::UserSoftDeleted => "auth.user.softDeleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_names_are_stable() {
        assert_eq!(
            AuthEvent::PasswordRequestOtp.job_name(),
            "auth.passwordBased.requestOtp"
        );
        assert_eq!(AuthEvent::UserSoftDeleted.job_name(), "auth.user.softDeleted");
    }
}
