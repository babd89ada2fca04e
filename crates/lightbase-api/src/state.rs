//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use sqlx::PgPool;

use lightbase_auth::providers::anonymous::AnonymousProvider;
use lightbase_auth::providers::digid::DigidProvider;
use lightbase_auth::providers::keycloak::KeycloakProvider;
use lightbase_auth::providers::password::PasswordProvider;
use lightbase_auth::providers::totp::TotpProvider;
use lightbase_auth::rate_limit::RateLimiter;
use lightbase_auth::session::SessionStore;
use lightbase_core::config::{AppConfig, DeployEnvironment};
use lightbase_service::feature_flag::FeatureFlagService;
use lightbase_service::management::ManagementService;
use lightbase_service::permission::PermissionEngine;
use lightbase_service::session::SessionService;
use lightbase_service::tenant::TenantService;
use lightbase_service::user::UserDirectory;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. All fields are
/// `Arc`-wrapped for cheap cloning across tasks.
#[derive(Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Deployment environment.
    pub environment: DeployEnvironment,

    // ── Infrastructure ───────────────────────────────────────
    /// PostgreSQL connection pool.
    pub db_pool: PgPool,

    // ── Auth ─────────────────────────────────────────────────
    /// Session store.
    pub session_store: Arc<SessionStore>,
    /// Password provider.
    pub password_provider: Arc<PasswordProvider>,
    /// Anonymous provider.
    pub anonymous_provider: Arc<AnonymousProvider>,
    /// DigiD provider; absent when not configured.
    pub digid_provider: Option<Arc<DigidProvider>>,
    /// Keycloak provider; absent when not configured.
    pub keycloak_provider: Option<Arc<KeycloakProvider>>,
    /// TOTP second-factor provider.
    pub totp_provider: Arc<TotpProvider>,
    /// Password-route rate limiter.
    pub rate_limiter: Arc<RateLimiter>,

    // ── Services ─────────────────────────────────────────────
    /// Tenant resolution.
    pub tenant_service: Arc<TenantService>,
    /// Permission engine.
    pub permission_engine: Arc<PermissionEngine>,
    /// User directory.
    pub user_directory: Arc<UserDirectory>,
    /// Feature flags.
    pub feature_flags: Arc<FeatureFlagService>,
    /// Session administration.
    pub session_service: Arc<SessionService>,
    /// Management interface; absent when not configured.
    pub management: Option<Arc<ManagementService>>,
}
