//! Rate-limit middleware for the password route family.
//!
//! Applied to mutating requests under `/auth/password-based`: login costs
//! two tokens, every other route one. Exhaustion surfaces as 429
//! `server.internal.rateLimit`.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use lightbase_core::error::AppError;

use crate::state::AppState;

/// Token cost of a request to the password route family.
fn request_cost(path: &str) -> u32 {
    if path.ends_with("/login") { 2 } else { 1 }
}

/// Middleware entry point.
pub async fn password_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method();
    if !matches!(method.as_str(), "POST" | "PUT" | "PATCH") {
        return next.run(request).await;
    }

    let peer_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let ssr_ip = request
        .headers()
        .get("x-ssr-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let ssr_verification = request
        .headers()
        .get("x-ssr-ip-verification")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let key = state.rate_limiter.client_ip(
        ssr_ip.as_deref(),
        ssr_verification.as_deref(),
        &peer_ip,
    );
    let cost = request_cost(request.uri().path());

    if !state.rate_limiter.check(&key, cost).await {
        return AppError::rate_limited("server.internal.rateLimit").into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_costs_double() {
        assert_eq!(request_cost("/auth/password-based/login"), 2);
        assert_eq!(request_cost("/auth/password-based/forgot-password"), 1);
    }
}
