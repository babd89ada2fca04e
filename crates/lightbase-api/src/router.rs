//! Route definitions for the Lightbase HTTP API.
//!
//! Routes are organized by domain. The router receives [`AppState`] and
//! passes it to all handlers via Axum's `State` extractor.

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state);

    Router::new()
        .merge(auth_routes())
        .merge(password_routes(state.clone()))
        .merge(anonymous_routes())
        .merge(digid_routes())
        .merge(keycloak_routes())
        .merge(totp_routes())
        .merge(session_routes())
        .merge(permission_routes())
        .merge(platform_routes())
        .merge(management_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Core auth endpoints: me, refresh, logout, impersonation, user admin.
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/refresh-tokens", post(handlers::auth::refresh_tokens))
        .route("/auth/logout", post(handlers::auth::logout))
        .route(
            "/auth/impersonate-start-session",
            post(handlers::auth::impersonate_start),
        )
        .route(
            "/auth/impersonate-stop-session",
            post(handlers::auth::impersonate_stop),
        )
        .route("/auth/list-users", post(handlers::user::list_users))
        .route("/auth/user/{id}", get(handlers::user::get_user))
        .route("/auth/user/{id}/update", put(handlers::user::update_user))
        .route(
            "/auth/user/{id}/set-active",
            post(handlers::user::set_active),
        )
}

/// Password provider endpoints, behind the rate limiter.
fn password_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/password-based/login", post(handlers::password_based::login))
        .route(
            "/auth/password-based/verify-otp",
            post(handlers::password_based::verify_otp),
        )
        .route(
            "/auth/password-based/verify-email",
            post(handlers::password_based::verify_email),
        )
        .route(
            "/auth/password-based/forgot-password",
            post(handlers::password_based::forgot_password),
        )
        .route(
            "/auth/password-based/reset-password",
            post(handlers::password_based::reset_password),
        )
        .route(
            "/auth/password-based/list-emails",
            post(handlers::password_based::list_emails),
        )
        .route(
            "/auth/password-based/update-email",
            post(handlers::password_based::update_email),
        )
        .route(
            "/auth/password-based/update-password",
            post(handlers::password_based::update_password),
        )
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::rate_limit::password_rate_limit,
        ))
}

/// Anonymous provider endpoints.
fn anonymous_routes() -> Router<AppState> {
    Router::new().route(
        "/auth/anonymous-based/login",
        post(handlers::anonymous_based::login),
    )
}

/// DigiD provider endpoints.
fn digid_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/auth/digid-based/metadata",
            post(handlers::digid_based::metadata),
        )
        .route(
            "/auth/digid-based/redirect",
            post(handlers::digid_based::redirect),
        )
        .route("/auth/digid-based/login", post(handlers::digid_based::login))
}

/// Keycloak provider endpoints.
fn keycloak_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/auth/keycloak-based/redirect",
            post(handlers::keycloak_based::redirect),
        )
        .route(
            "/auth/keycloak-based/login",
            post(handlers::keycloak_based::login),
        )
        .route(
            "/auth/keycloak-based/create",
            post(handlers::keycloak_based::create),
        )
        .route(
            "/auth/keycloak-based/user/{id}/update",
            post(handlers::keycloak_based::update),
        )
}

/// TOTP second-factor endpoints.
fn totp_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/totp-provider/info", get(handlers::totp::info))
        .route("/auth/totp-provider/setup", post(handlers::totp::setup))
        .route(
            "/auth/totp-provider/setup/verify",
            post(handlers::totp::setup_verify),
        )
        .route("/auth/totp-provider/verify", post(handlers::totp::verify))
        .route("/auth/totp-provider/remove", delete(handlers::totp::remove))
        .route(
            "/auth/totp-provider/user/{id}/remove",
            delete(handlers::totp::remove_for_user),
        )
}

/// Session administration endpoints.
fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/session/list", get(handlers::session::list))
        .route("/session/logout", post(handlers::session::logout))
        .route(
            "/session/set-notification-token",
            post(handlers::session::set_notification_token),
        )
}

/// Permission engine endpoints.
fn permission_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/permission/summary", get(handlers::permission::summary))
        .route(
            "/auth/permission/permission/list",
            get(handlers::permission::list_permissions),
        )
        .route(
            "/auth/permission/role/list",
            get(handlers::permission::list_roles),
        )
        .route("/auth/permission/role", post(handlers::permission::create_role))
        .route(
            "/auth/permission/role/{id}",
            delete(handlers::permission::delete_role),
        )
        .route(
            "/auth/permission/role/{id}/add-permissions",
            post(handlers::permission::add_permissions),
        )
        .route(
            "/auth/permission/role/{id}/remove-permissions",
            post(handlers::permission::remove_permissions),
        )
        .route(
            "/auth/permission/user/{id}/assign-role",
            post(handlers::permission::assign_role),
        )
        .route(
            "/auth/permission/user/{id}/remove-role",
            post(handlers::permission::remove_role),
        )
        .route(
            "/auth/permission/user/{id}/summary",
            get(handlers::permission::user_summary),
        )
        .route(
            "/auth/permission/user/{id}/sync-roles",
            post(handlers::permission::user_sync_roles),
        )
}

/// Tenant, feature flag, and health endpoints.
fn platform_routes() -> Router<AppState> {
    Router::new()
        .route("/multitenant/current", get(handlers::multitenant::current))
        .route("/feature-flag/current", get(handlers::feature_flag::current))
        .route("/health", get(handlers::health::health))
}

/// Operator management endpoints.
fn management_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/_lightbase/management/request-magic-link",
            post(handlers::management::request_magic_link),
        )
        .route(
            "/_lightbase/management/feature-flags",
            get(handlers::management::list_feature_flags)
                .post(handlers::management::set_feature_flag),
        )
}

/// Build the CORS layer from configuration.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let origins = &state.config.server.cors_origins;

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<http::HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}
