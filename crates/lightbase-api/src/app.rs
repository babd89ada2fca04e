//! Application bootstrap: state construction, advisory-locked startup
//! synchronization, and the HTTP server loop.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use lightbase_auth::password::PasswordHasher;
use lightbase_auth::providers::anonymous::AnonymousProvider;
use lightbase_auth::providers::digid::DigidProvider;
use lightbase_auth::providers::keycloak::KeycloakProvider;
use lightbase_auth::providers::password::PasswordProvider;
use lightbase_auth::providers::totp::TotpProvider;
use lightbase_auth::rate_limit::RateLimiter;
use lightbase_auth::session::SessionStore;
use lightbase_auth::token::TokenSigner;
use lightbase_core::config::{AppConfig, DeployEnvironment};
use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;
use lightbase_database::connection::acquire_startup_lock;
use lightbase_database::repositories::anonymous_login::AnonymousLoginRepository;
use lightbase_database::repositories::device::DeviceRepository;
use lightbase_database::repositories::digid_login::DigidLoginRepository;
use lightbase_database::repositories::feature_flag::FeatureFlagRepository;
use lightbase_database::repositories::job::JobRepository;
use lightbase_database::repositories::keycloak_login::KeycloakLoginRepository;
use lightbase_database::repositories::password_login::PasswordLoginRepository;
use lightbase_database::repositories::role::RoleRepository;
use lightbase_database::repositories::session::SessionRepository;
use lightbase_database::repositories::session_token::SessionTokenRepository;
use lightbase_database::repositories::tenant::TenantRepository;
use lightbase_database::repositories::totp_settings::TotpSettingsRepository;
use lightbase_database::repositories::user::UserRepository;
use lightbase_service::feature_flag::FeatureFlagService;
use lightbase_service::management::{DisabledChatDirectory, ManagementService, SlackDirectory};
use lightbase_service::permission::PermissionEngine;
use lightbase_service::session::SessionService;
use lightbase_service::tenant::{TenantCache, TenantIndex, TenantService};
use lightbase_service::user::UserDirectory;

use crate::router::build_router;
use crate::state::AppState;

/// Name shown by authenticator apps during TOTP setup.
const TOTP_ISSUER: &str = "Lightbase";

/// Construct the full application state.
pub fn build_state(
    config: AppConfig,
    environment: DeployEnvironment,
    pool: PgPool,
) -> AppResult<AppState> {
    let signing_key = config.signing_key(environment)?;

    // Repositories.
    let tenants = TenantRepository::new(pool.clone());
    let users = UserRepository::new(pool.clone());
    let password_logins = PasswordLoginRepository::new(pool.clone());
    let anonymous_logins = AnonymousLoginRepository::new(pool.clone());
    let digid_logins = DigidLoginRepository::new(pool.clone());
    let keycloak_logins = KeycloakLoginRepository::new(pool.clone());
    let totp_settings = TotpSettingsRepository::new(pool.clone());
    let roles = RoleRepository::new(pool.clone());
    let sessions = SessionRepository::new(pool.clone());
    let session_tokens = SessionTokenRepository::new(pool.clone());
    let devices = DeviceRepository::new(pool.clone());
    let feature_flags_repo = FeatureFlagRepository::new(pool.clone());
    let jobs = JobRepository::new(pool.clone());

    // Auth layer.
    let signer = TokenSigner::new(&signing_key);
    let session_store = Arc::new(SessionStore::new(
        sessions.clone(),
        session_tokens.clone(),
        devices.clone(),
        signer,
        config.auth.clone(),
        config.session.clone(),
    ));
    let hasher = PasswordHasher::new();

    let password_provider = Arc::new(PasswordProvider::new(
        password_logins.clone(),
        users.clone(),
        sessions.clone(),
        jobs.clone(),
        hasher,
        config.auth.password.clone(),
    ));
    let anonymous_provider = Arc::new(AnonymousProvider::new(
        anonymous_logins.clone(),
        users.clone(),
        jobs.clone(),
    ));
    let totp_provider = Arc::new(TotpProvider::new(totp_settings.clone(), TOTP_ISSUER));

    let digid_provider = match &config.digid {
        Some(digid_config) => Some(Arc::new(DigidProvider::new(
            digid_logins.clone(),
            users.clone(),
            digid_config.clone(),
            environment,
        )?)),
        None => None,
    };

    // Services.
    let permission_engine = Arc::new(PermissionEngine::new(roles.clone()));

    let user_directory = Arc::new(UserDirectory::new(
        users.clone(),
        tenants.clone(),
        password_logins.clone(),
        keycloak_logins.clone(),
        digid_logins.clone(),
        totp_settings.clone(),
        jobs.clone(),
        password_provider.as_ref().clone(),
        anonymous_provider.as_ref().clone(),
        Arc::clone(&permission_engine),
        config.multitenant.clone(),
    ));

    let keycloak_provider = match &config.keycloak {
        Some(keycloak_config) => Some(Arc::new(
            KeycloakProvider::new(
                keycloak_logins.clone(),
                users.clone(),
                jobs.clone(),
                keycloak_config.clone(),
            )?
            .with_provisioner(
                Arc::clone(&user_directory) as Arc<dyn lightbase_auth::providers::keycloak::ImplicitUserProvisioner>
            ),
        )),
        None => None,
    };

    let tenant_index = TenantIndex::from_config(&config.multitenant, environment)?;
    let tenant_cache = Arc::new(TenantCache::new(tenants.clone()));
    let tenant_service = Arc::new(TenantService::new(
        tenant_index,
        Arc::clone(&tenant_cache),
        environment,
    ));

    let feature_flags = Arc::new(FeatureFlagService::new(
        feature_flags_repo,
        config.feature_flag.clone(),
    ));

    let session_service = Arc::new(SessionService::new(
        sessions,
        devices,
        session_store.as_ref().clone(),
    ));

    let management = match &config.management {
        Some(management_config) => {
            let directory: Arc<dyn lightbase_service::management::ChatDirectory> =
                if management_config.chat_token.is_empty() {
                    Arc::new(DisabledChatDirectory)
                } else {
                    Arc::new(SlackDirectory::new(management_config)?)
                };
            Some(Arc::new(ManagementService::new(
                users,
                anonymous_provider.as_ref().clone(),
                Arc::clone(&permission_engine),
                directory,
                management_config.clone(),
                environment,
            )))
        }
        None => None,
    };

    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

    Ok(AppState {
        config: Arc::new(config),
        environment,
        db_pool: pool,
        session_store,
        password_provider,
        anonymous_provider,
        digid_provider,
        keycloak_provider,
        totp_provider,
        rate_limiter,
        tenant_service,
        permission_engine,
        user_directory,
        feature_flags,
        session_service,
        management,
    })
}

/// Advisory-locked startup synchronization: tenants, the permission
/// catalog with mandatory roles, and the declared feature flags.
///
/// Instances starting simultaneously serialize behind the lock; running
/// the block twice with the same configuration is a database no-op.
pub async fn run_startup_sync(state: &AppState) -> AppResult<()> {
    let mut tx = state
        .db_pool
        .begin()
        .await
        .map_err(|e| AppError::database(Box::new(e)))?;

    acquire_startup_lock(&mut *tx).await?;

    let tenants = TenantRepository::new(state.db_pool.clone());
    let mut tenant_ids_by_name = HashMap::new();
    for (name, indexed) in state.tenant_service.index().tenants() {
        let tenant = tenants.sync_from_config(&mut *tx, name, &indexed.data).await?;
        tenant_ids_by_name.insert(name.clone(), tenant.id);
    }

    state
        .permission_engine
        .sync(&mut *tx, &state.config.permission, &tenant_ids_by_name)
        .await?;

    state.feature_flags.sync(&mut *tx).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::database(Box::new(e)))?;

    info!(tenants = tenant_ids_by_name.len(), "Startup synchronization complete");
    Ok(())
}

/// Bind the listener and serve until shutdown.
pub async fn run_server(state: AppState) -> AppResult<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::configuration(format!("failed to bind {addr}: {e}")))?;

    info!(addr = %addr, "Lightbase listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| AppError::server("server.internal.serve").with_source(e))
}
