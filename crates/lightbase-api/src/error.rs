//! Boundary error normalization.

use axum::http::StatusCode;

use lightbase_core::error::AppError;

/// Surface every non-500 session-layer error as 401.
///
/// The session store already raises its own failures as unauthorized;
/// this guards the contract at the boundary for errors that bubbled
/// through other layers.
pub fn normalize_session_error(mut error: AppError) -> AppError {
    if error.key_starts_with("session.") && !error.is_server_error() {
        error.status = StatusCode::UNAUTHORIZED;
    }
    error
}

/// Map a pool/transaction error into the unified database error.
pub fn tx_err(e: sqlx::Error) -> AppError {
    AppError::database(Box::new(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_validation_errors_become_401() {
        let err = normalize_session_error(AppError::validation("session.load.invalidToken"));
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn session_server_errors_pass_through() {
        let err = normalize_session_error(AppError::server("session.load.broken"));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn other_errors_are_untouched() {
        let err = normalize_session_error(AppError::validation("authPasswordBased.login.unknownEmail"));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
