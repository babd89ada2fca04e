//! Provider login attachments.
//!
//! Every attachment is 1:1 with a user and cascade-deletes with it.

mod anonymous;
mod digid;
mod keycloak;
mod password;
mod totp;

pub use anonymous::AnonymousLogin;
pub use digid::DigidLogin;
pub use keycloak::KeycloakLogin;
pub use password::{PasswordLogin, PasswordLoginAttempt, PasswordLoginReset};
pub use totp::TotpSettings;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The provider a session was established through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoginType {
    /// Email + password, optionally with an email OTP second factor.
    PasswordBased,
    /// Opaque token login.
    AnonymousBased,
    /// BSN via the SAML artifact binding.
    DigidBased,
    /// Federated OIDC.
    KeycloakBased,
}

impl LoginType {
    /// The camelCase wire form stored in session data.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PasswordBased => "passwordBased",
            Self::AnonymousBased => "anonymousBased",
            Self::DigidBased => "digidBased",
            Self::KeycloakBased => "keycloakBased",
        }
    }
}

impl fmt::Display for LoginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
