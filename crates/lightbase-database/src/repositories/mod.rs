//! Repository implementations, one per aggregate.

pub mod anonymous_login;
pub mod device;
pub mod digid_login;
pub mod feature_flag;
pub mod job;
pub mod keycloak_login;
pub mod password_login;
pub mod role;
pub mod session;
pub mod session_token;
pub mod tenant;
pub mod totp_settings;
pub mod user;

use lightbase_core::error::AppError;

/// Map an sqlx error into the unified database error.
pub(crate) fn db_err(e: sqlx::Error) -> AppError {
    AppError::database(Box::new(e))
}
