//! Anonymous provider: opaque-token login and registration.

use sqlx::PgConnection;
use uuid::Uuid;

use lightbase_core::error::AppError;
use lightbase_core::events::AuthEvent;
use lightbase_core::result::AppResult;
use lightbase_database::repositories::anonymous_login::AnonymousLoginRepository;
use lightbase_database::repositories::job::JobRepository;
use lightbase_database::repositories::user::UserRepository;
use lightbase_entity::login::{AnonymousLogin, LoginType};
use lightbase_entity::session::SessionData;
use lightbase_entity::tenant::Tenant;

/// The anonymous token authentication provider.
#[derive(Debug, Clone)]
pub struct AnonymousProvider {
    logins: AnonymousLoginRepository,
    users: UserRepository,
    jobs: JobRepository,
}

impl AnonymousProvider {
    /// Creates the provider.
    pub fn new(
        logins: AnonymousLoginRepository,
        users: UserRepository,
        jobs: JobRepository,
    ) -> Self {
        Self {
            logins,
            users,
            jobs,
        }
    }

    /// Authenticate (tenant, token) through the login endpoint.
    ///
    /// Tokens with `is_allowed_to_login = false` are reserved for internal
    /// session creation (magic links) and rejected here.
    pub async fn login(
        &self,
        conn: &mut PgConnection,
        tenant: &Tenant,
        login_token: &str,
    ) -> AppResult<Uuid> {
        let login = self
            .logins
            .find_by_token_in_tenant(tenant.id, login_token)
            .await?
            .ok_or_else(|| AppError::validation("authAnonymousBased.login.unknownToken"))?;

        if !login.is_allowed_to_login {
            return Err(AppError::validation(
                "authAnonymousBased.login.tokenIsNotAllowedToLogin",
            ));
        }

        self.users.set_last_login(conn, login.user_id).await?;
        Ok(login.user_id)
    }

    /// Attach an anonymous login with a fresh opaque token to a user.
    pub async fn register(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        is_allowed_to_login: bool,
    ) -> AppResult<AnonymousLogin> {
        let token = format!("auth-anonymous-{}", Uuid::new_v4());
        let login = self
            .logins
            .create(conn, user_id, &token, is_allowed_to_login)
            .await?;

        self.jobs
            .enqueue(
                conn,
                AuthEvent::AnonymousUserRegistered.job_name(),
                &serde_json::json!({ "userId": user_id }),
                None,
                5,
            )
            .await?;

        Ok(login)
    }

    /// Convert a user with an anonymous login into a session seed without
    /// issuing tokens. Used by internal flows (magic links).
    pub async fn session_for_user(&self, user_id: Uuid) -> AppResult<SessionData> {
        self.logins
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::validation("authAnonymousBased.getSessionForUser.unknownUser"))?;

        Ok(SessionData::user(user_id, LoginType::AnonymousBased))
    }
}
