//! Unified application error types for Lightbase.
//!
//! Every error carries a stable machine-readable `key` (documented per
//! operation), an HTTP status, and an optional `info` object. All crates map
//! their internal errors into [`AppError`] for consistent propagation
//! through the ? operator, and the API boundary renders the
//! `{key, status, info}` wire body.

use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// The unified application error used throughout Lightbase.
///
/// Crate-specific errors are mapped into `AppError` using `From` impls or
/// explicit `.map_err()` calls. The `key` is part of the public API contract
/// and must not change between releases without a changelog entry.
#[derive(Debug, Error)]
#[error("{key} ({status})")]
pub struct AppError {
    /// Stable machine-readable error key, e.g. `authPasswordBased.login.unknownEmail`.
    pub key: String,
    /// HTTP status surfaced at the boundary.
    pub status: StatusCode,
    /// Structured details attached to the error (rendered as-is on the wire).
    pub info: serde_json::Value,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error with an explicit status.
    pub fn new(status: StatusCode, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status,
            info: serde_json::Value::Null,
            source: None,
        }
    }

    /// Create a validation error (400).
    pub fn validation(key: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, key)
    }

    /// Create an unauthorized error (401).
    pub fn unauthorized(key: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, key)
    }

    /// Create a forbidden error (403).
    pub fn forbidden(key: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, key)
    }

    /// Create a not-found error (404).
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, key)
    }

    /// Create a rate-limited error (429).
    pub fn rate_limited(key: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, key)
    }

    /// Create a server error (500) for programmer errors and upstream failures.
    pub fn server(key: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, key)
    }

    /// Create a server error wrapping a database failure.
    pub fn database(source: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self {
            key: "server.internal.database".into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            info: serde_json::Value::Null,
            source: Some(source),
        }
    }

    /// Create a configuration error (500), raised during startup.
    pub fn configuration(message: impl fmt::Display) -> Self {
        Self::server("server.internal.configuration")
            .with_info(serde_json::json!({ "message": message.to_string() }))
    }

    /// Attach structured info to the error.
    #[must_use]
    pub fn with_info(mut self, info: serde_json::Value) -> Self {
        self.info = info;
        self
    }

    /// Attach an underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Whether this is a 500-class error that must pass through boundary
    /// normalization untouched.
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// Whether the error key starts with the given prefix.
    pub fn key_starts_with(&self, prefix: &str) -> bool {
        self.key.starts_with(prefix)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            status: self.status,
            info: self.info.clone(),
            source: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(key = %self.key, source = ?self.source, "Internal server error");
        }

        let mut body = serde_json::json!({
            "key": self.key,
            "status": self.status.as_u16(),
        });
        if !self.info.is_null() {
            body["info"] = self.info;
        }

        (self.status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::server("server.internal.serialization").with_source(err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::configuration(&err).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_400() {
        let err = AppError::validation("authPasswordBased.login.unknownEmail");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
    }

    #[test]
    fn info_is_attached() {
        let err = AppError::validation("permission.roleAddPermissions.unknownPermission")
            .with_info(serde_json::json!({ "identifiers": ["a", "b"] }));
        assert_eq!(err.info["identifiers"][0], "a");
    }

    #[test]
    fn key_prefix_matching() {
        let err = AppError::unauthorized("session.load.invalidToken");
        assert!(err.key_starts_with("session."));
        assert!(!err.key_starts_with("auth."));
    }
}
