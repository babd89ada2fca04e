//! Federated OIDC provider ("Keycloak-based"): authorization-code redirect,
//! code exchange, userinfo read, and implicit user provisioning.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgConnection;
use tracing::info;
use url::Url;
use uuid::Uuid;

use lightbase_core::config::KeycloakConfig;
use lightbase_core::error::AppError;
use lightbase_core::events::AuthEvent;
use lightbase_core::result::AppResult;
use lightbase_database::repositories::job::JobRepository;
use lightbase_database::repositories::keycloak_login::KeycloakLoginRepository;
use lightbase_database::repositories::user::UserRepository;
use lightbase_entity::tenant::Tenant;

/// Claims read from the `/userinfo` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct KeycloakUserInfo {
    /// Email address, the login identifier.
    pub email: String,
    /// Display name as reported by the IdP.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Seam through which the provider creates users it has never seen.
///
/// Implemented by the user directory and registered at startup, keeping
/// the wire exchange below free of the directory's invariants.
#[async_trait]
pub trait ImplicitUserProvisioner: Send + Sync {
    /// Create a user with a Keycloak login in the given tenant scope.
    async fn provision_keycloak_user(
        &self,
        conn: &mut PgConnection,
        tenant: &Tenant,
        email: &str,
        name: Option<&str>,
        single_tenant: bool,
    ) -> AppResult<Uuid>;
}

/// The federated OIDC authentication provider.
#[derive(Clone)]
pub struct KeycloakProvider {
    logins: KeycloakLoginRepository,
    users: UserRepository,
    jobs: JobRepository,
    config: KeycloakConfig,
    http: reqwest::Client,
    provisioner: Option<Arc<dyn ImplicitUserProvisioner>>,
}

impl std::fmt::Debug for KeycloakProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeycloakProvider")
            .field("issuer", &self.config.issuer)
            .finish_non_exhaustive()
    }
}

impl KeycloakProvider {
    /// Creates the provider with a bounded-timeout HTTP client.
    pub fn new(
        logins: KeycloakLoginRepository,
        users: UserRepository,
        jobs: JobRepository,
        config: KeycloakConfig,
    ) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AppError::server("server.internal.httpClient").with_source(e))?;

        Ok(Self {
            logins,
            users,
            jobs,
            config,
            http,
            provisioner: None,
        })
    }

    /// Register the implicit-creation seam.
    #[must_use]
    pub fn with_provisioner(mut self, provisioner: Arc<dyn ImplicitUserProvisioner>) -> Self {
        self.provisioner = Some(provisioner);
        self
    }

    /// The standard authorization-code URL for the browser redirect.
    pub fn redirect_url(&self, redirect_uri: &str, state: &str) -> AppResult<String> {
        let mut url = Url::parse(&format!(
            "{}/protocol/openid-connect/auth",
            self.config.issuer
        ))
        .map_err(|e| AppError::server("server.internal.keycloakIssuer").with_source(e))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", "openid email profile")
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", state);

        Ok(url.into())
    }

    /// Exchange the authorization code and read `/userinfo`.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> AppResult<KeycloakUserInfo> {
        let token: TokenResponse = self
            .http
            .post(format!("{}/protocol/openid-connect/token", self.config.issuer))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| AppError::server("authKeycloakBased.login.tokenExchangeFailed").with_source(e))?
            .error_for_status()
            .map_err(|e| AppError::server("authKeycloakBased.login.tokenExchangeFailed").with_source(e))?
            .json()
            .await
            .map_err(|e| AppError::server("authKeycloakBased.login.tokenExchangeFailed").with_source(e))?;

        self.http
            .get(format!(
                "{}/protocol/openid-connect/userinfo",
                self.config.issuer
            ))
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| AppError::server("authKeycloakBased.login.userInfoFailed").with_source(e))?
            .error_for_status()
            .map_err(|e| AppError::server("authKeycloakBased.login.userInfoFailed").with_source(e))?
            .json()
            .await
            .map_err(|e| AppError::server("authKeycloakBased.login.userInfoFailed").with_source(e))
    }

    /// Authenticate a code against (tenant); provisions or joins the user
    /// per the implicit-creation settings.
    pub async fn login(
        &self,
        conn: &mut PgConnection,
        tenant: &Tenant,
        code: &str,
        redirect_uri: &str,
    ) -> AppResult<Uuid> {
        let user_info = self.exchange_code(code, redirect_uri).await?;
        self.attach_user(conn, tenant, &user_info).await
    }

    /// Resolve or provision the user for verified IdP claims.
    pub async fn attach_user(
        &self,
        conn: &mut PgConnection,
        tenant: &Tenant,
        user_info: &KeycloakUserInfo,
    ) -> AppResult<Uuid> {
        if let Some(login) = self
            .logins
            .find_by_email_in_tenant(tenant.id, &user_info.email)
            .await?
        {
            self.fill_missing_name(conn, login.user_id, user_info.name.as_deref())
                .await?;
            self.users.set_last_login(conn, login.user_id).await?;
            return Ok(login.user_id);
        }

        if !self.config.implicitly_create_users {
            return Err(AppError::validation("authKeycloakBased.login.unknownEmail"));
        }

        // A login may exist under another tenant; joining beats duplicating.
        if let Some(login) = self.logins.find_by_email(&user_info.email).await? {
            if self.config.single_tenant {
                return Err(AppError::validation("authKeycloakBased.login.unknownEmail"));
            }
            self.users.add_tenant(conn, login.user_id, tenant.id).await?;
            self.fill_missing_name(conn, login.user_id, user_info.name.as_deref())
                .await?;
            self.users.set_last_login(conn, login.user_id).await?;
            info!(user_id = %login.user_id, tenant = %tenant.name, "Keycloak user joined tenant");
            return Ok(login.user_id);
        }

        let provisioner = self.provisioner.as_ref().ok_or_else(|| {
            AppError::server("server.internal.keycloakProvisionerMissing")
        })?;

        let user_id = provisioner
            .provision_keycloak_user(
                conn,
                tenant,
                &user_info.email,
                user_info.name.as_deref(),
                self.config.single_tenant,
            )
            .await?;

        self.jobs
            .enqueue(
                conn,
                AuthEvent::KeycloakUserRegistered.job_name(),
                &serde_json::json!({ "userId": user_id, "email": user_info.email }),
                None,
                5,
            )
            .await?;

        self.users.set_last_login(conn, user_id).await?;
        info!(user_id = %user_id, tenant = %tenant.name, "Keycloak user implicitly created");
        Ok(user_id)
    }

    async fn fill_missing_name(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        idp_name: Option<&str>,
    ) -> AppResult<()> {
        let Some(name) = idp_name else {
            return Ok(());
        };
        let Some(user) = self.users.find_by_id(user_id).await? else {
            return Ok(());
        };
        if user.name.is_none() {
            self.users.update_name(conn, user_id, Some(name)).await?;
        }
        Ok(())
    }
}
