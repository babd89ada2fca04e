//! Password provider: login with rolling-attempt blocking and timing
//! equalization, registration, email verification, reset/forgot flows,
//! email/password updates, and the email OTP second factor.

use chrono::{Duration, Utc};
use sqlx::PgConnection;
use tracing::{info, warn};
use uuid::Uuid;

use lightbase_core::config::PasswordConfig;
use lightbase_core::error::AppError;
use lightbase_core::events::AuthEvent;
use lightbase_core::result::AppResult;
use lightbase_database::repositories::job::JobRepository;
use lightbase_database::repositories::password_login::PasswordLoginRepository;
use lightbase_database::repositories::session::SessionRepository;
use lightbase_database::repositories::user::UserRepository;
use lightbase_entity::login::{PasswordLogin, PasswordLoginReset};
use lightbase_entity::tenant::Tenant;

use crate::password::PasswordHasher;
use crate::totp;

/// Rolling window for attempt counting.
const ATTEMPT_WINDOW_MINUTES: i64 = 5;
/// Attempts tolerated inside the window before blocking.
const MAX_ATTEMPTS: i64 = 10;
/// Verify/reset token lifetime.
const RESET_TOKEN_HOURS: i64 = 24;
/// Stored hashes older than this force a rotation when enabled.
const FORCE_ROTATION_MONTHS: i64 = 6;

/// How a successful password login proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordLoginOutcome {
    /// Fully authenticated; issue a `user` session.
    Authenticated,
    /// Email OTP sent; issue a `checkTwoStep` session with
    /// `twoStepType = passwordBasedOtp`.
    RequiresOtp,
    /// Stored hash is older than six months; issue a
    /// `passwordBasedUpdatePassword` session.
    RequiresPasswordUpdate,
}

/// Result of registering a password login.
#[derive(Debug, Clone)]
pub struct PasswordRegistration {
    /// The created login.
    pub login: PasswordLogin,
    /// The issued verify or reset token.
    pub reset: PasswordLoginReset,
}

/// The password-based authentication provider.
#[derive(Debug, Clone)]
pub struct PasswordProvider {
    logins: PasswordLoginRepository,
    users: UserRepository,
    sessions: SessionRepository,
    jobs: JobRepository,
    hasher: PasswordHasher,
    config: PasswordConfig,
}

impl PasswordProvider {
    /// Creates the provider.
    pub fn new(
        logins: PasswordLoginRepository,
        users: UserRepository,
        sessions: SessionRepository,
        jobs: JobRepository,
        hasher: PasswordHasher,
        config: PasswordConfig,
    ) -> Self {
        Self {
            logins,
            users,
            sessions,
            jobs,
            hasher,
            config,
        }
    }

    /// Authenticate (tenant, email, password).
    ///
    /// With the reduce-error-info flag on, an unknown email runs a dummy
    /// compare against a fixed hash to equalize timing and fails with the
    /// same generic key as a wrong password.
    pub async fn login(
        &self,
        conn: &mut PgConnection,
        tenant: &Tenant,
        email: &str,
        password: &str,
        reduce_error_info: bool,
    ) -> AppResult<(Uuid, PasswordLoginOutcome)> {
        let Some(login) = self.logins.find_by_email_in_tenant(tenant.id, email).await? else {
            if reduce_error_info {
                self.hasher.dummy_verify(password);
                return Err(AppError::validation(
                    "authPasswordBased.login.invalidEmailPasswordCombination",
                ));
            }
            return Err(AppError::validation("authPasswordBased.login.unknownEmail"));
        };

        if self.config.rolling_attempt_blocking {
            let since = Utc::now() - Duration::minutes(ATTEMPT_WINDOW_MINUTES);
            let attempts = self.logins.count_recent_attempts(login.id, since).await?;
            if attempts >= MAX_ATTEMPTS {
                self.logins.insert_attempt(login.id).await?;
                warn!(user_id = %login.user_id, "Password login blocked, attempt window exhausted");
                return Err(AppError::validation(
                    "authPasswordBased.login.maxAttemptsExceeded",
                ));
            }
        }

        if !self.hasher.verify(password, &login.password_hash)? {
            self.logins.insert_attempt(login.id).await?;
            return Err(AppError::validation(
                "authPasswordBased.login.invalidEmailPasswordCombination",
            ));
        }

        if login.verified_at.is_none() {
            return Err(AppError::validation(
                "authPasswordBased.login.emailNotVerified",
            ));
        }

        self.users.set_last_login(conn, login.user_id).await?;

        if self.config.force_rotation_after_six_months
            && login.updated_at < Utc::now() - Duration::days(FORCE_ROTATION_MONTHS * 30)
        {
            info!(user_id = %login.user_id, "Password rotation forced");
            return Ok((login.user_id, PasswordLoginOutcome::RequiresPasswordUpdate));
        }

        if login.otp_enabled() {
            let secret = match &login.otp_secret {
                Some(secret) => secret.clone(),
                None => {
                    let secret = totp::generate_secret();
                    self.logins.set_otp_secret(conn, login.id, &secret).await?;
                    secret
                }
            };
            let otp = totp::current_token(&secret)?;

            self.jobs
                .enqueue(
                    conn,
                    AuthEvent::PasswordRequestOtp.job_name(),
                    &serde_json::json!({
                        "userId": login.user_id,
                        "email": login.email,
                        "otp": otp,
                    }),
                    None,
                    5,
                )
                .await?;

            return Ok((login.user_id, PasswordLoginOutcome::RequiresOtp));
        }

        Ok((login.user_id, PasswordLoginOutcome::Authenticated))
    }

    /// Attach a password login to an existing user.
    ///
    /// With `random_password` the stored hash is a placeholder, the email
    /// counts as verified, and a reset token (`shouldSetPassword = true`)
    /// is issued; otherwise the password is hashed and a verify token is
    /// issued. Both tokens expire in 24 hours.
    pub async fn register(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        email: &str,
        password: Option<&str>,
        random_password: bool,
    ) -> AppResult<PasswordRegistration> {
        let (hash, verified_at, should_set_password) = if random_password {
            (self.hasher.placeholder_hash().to_string(), Some(Utc::now()), true)
        } else {
            let password = password.ok_or_else(|| {
                AppError::validation("authPasswordBased.register.missingPassword")
            })?;
            (self.hasher.hash(password)?, None, false)
        };

        let login = self
            .logins
            .create(conn, user_id, email, &hash, verified_at)
            .await?;

        let reset = self
            .issue_reset(conn, login.id, should_set_password)
            .await?;

        self.jobs
            .enqueue(
                conn,
                AuthEvent::PasswordUserRegistered.job_name(),
                &serde_json::json!({
                    "userId": user_id,
                    "email": email,
                    "resetToken": reset.reset_token,
                    "shouldSetPassword": should_set_password,
                }),
                None,
                5,
            )
            .await?;

        Ok(PasswordRegistration { login, reset })
    }

    /// Consume a verify token and mark the email verified.
    pub async fn verify_email(&self, conn: &mut PgConnection, token: &str) -> AppResult<Uuid> {
        let reset = self
            .logins
            .find_valid_reset(token, false)
            .await?
            .ok_or_else(|| AppError::validation("authPasswordBased.verifyEmail.invalidToken"))?;

        let login = self
            .logins
            .find_by_id(reset.password_login_id)
            .await?
            .ok_or_else(|| AppError::validation("authPasswordBased.verifyEmail.invalidToken"))?;

        self.logins.set_verified(conn, login.id).await?;
        self.logins.delete_reset(conn, reset.id).await?;

        self.jobs
            .enqueue(
                conn,
                AuthEvent::PasswordLoginVerified.job_name(),
                &serde_json::json!({ "userId": login.user_id }),
                None,
                5,
            )
            .await?;

        Ok(login.user_id)
    }

    /// Consume a reset token and write the new password hash.
    pub async fn reset_password(
        &self,
        conn: &mut PgConnection,
        token: &str,
        new_password: &str,
    ) -> AppResult<Uuid> {
        let reset = self
            .logins
            .find_valid_reset(token, true)
            .await?
            .ok_or_else(|| AppError::validation("authPasswordBased.resetPassword.invalidToken"))?;

        let login = self
            .logins
            .find_by_id(reset.password_login_id)
            .await?
            .ok_or_else(|| AppError::validation("authPasswordBased.resetPassword.invalidToken"))?;

        let hash = self.hasher.hash(new_password)?;
        self.logins.set_password_hash(conn, login.id, &hash).await?;
        self.logins.delete_reset(conn, reset.id).await?;

        self.jobs
            .enqueue(
                conn,
                AuthEvent::PasswordReset.job_name(),
                &serde_json::json!({ "userId": login.user_id }),
                None,
                5,
            )
            .await?;

        Ok(login.user_id)
    }

    /// Issue a reset token for a known email.
    ///
    /// With the reduce-error-info flag on, an unknown email succeeds
    /// observably and enqueues nothing.
    pub async fn forgot_password(
        &self,
        conn: &mut PgConnection,
        tenant: &Tenant,
        email: &str,
        reduce_error_info: bool,
    ) -> AppResult<()> {
        let Some(login) = self.logins.find_by_email_in_tenant(tenant.id, email).await? else {
            if reduce_error_info {
                return Ok(());
            }
            return Err(AppError::validation(
                "authPasswordBased.forgotPassword.unknownEmail",
            ));
        };

        let reset = self.issue_reset(conn, login.id, true).await?;

        self.jobs
            .enqueue(
                conn,
                AuthEvent::PasswordForgot.job_name(),
                &serde_json::json!({
                    "userId": login.user_id,
                    "email": login.email,
                    "resetToken": reset.reset_token,
                }),
                None,
                5,
            )
            .await?;

        Ok(())
    }

    /// Rewrite the login email: clears the verification marker, issues a
    /// verify token, and deletes every session of the user.
    pub async fn update_email(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        new_email: &str,
    ) -> AppResult<()> {
        let login = self
            .logins
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("authPasswordBased.updateEmail.unknownUser"))?;

        self.logins.set_email(conn, login.id, new_email).await?;
        let reset = self.issue_reset(conn, login.id, false).await?;
        self.sessions.delete_all_for_user(conn, user_id, None).await?;

        self.jobs
            .enqueue(
                conn,
                AuthEvent::PasswordEmailUpdated.job_name(),
                &serde_json::json!({
                    "userId": user_id,
                    "email": new_email,
                    "resetToken": reset.reset_token,
                }),
                None,
                5,
            )
            .await?;

        Ok(())
    }

    /// Write a new password hash. Depending on policy this removes every
    /// session of the user or every session except the caller's.
    pub async fn update_password(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        new_password: &str,
        current_session_id: Uuid,
    ) -> AppResult<()> {
        let login = self
            .logins
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("authPasswordBased.updatePassword.unknownUser"))?;

        let hash = self.hasher.hash(new_password)?;
        self.logins.set_password_hash(conn, login.id, &hash).await?;

        let keep = if self.config.remove_current_session_on_password_update {
            None
        } else {
            Some(current_session_id)
        };
        self.sessions.delete_all_for_user(conn, user_id, keep).await?;

        self.jobs
            .enqueue(
                conn,
                AuthEvent::PasswordUpdated.job_name(),
                &serde_json::json!({ "userId": user_id }),
                None,
                5,
            )
            .await?;

        Ok(())
    }

    /// Check the email OTP of a `checkTwoStep` session within the wide
    /// password-OTP window.
    pub async fn verify_otp(&self, user_id: Uuid, otp: &str) -> AppResult<()> {
        let login = self
            .logins
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::validation("authPasswordBased.verifyOtp.invalidOtp"))?;

        let secret = login
            .otp_secret
            .as_deref()
            .ok_or_else(|| AppError::validation("authPasswordBased.verifyOtp.invalidOtp"))?;

        if !totp::verify_token(secret, otp, totp::PASSWORD_OTP_WINDOW)? {
            return Err(AppError::validation("authPasswordBased.verifyOtp.invalidOtp"));
        }

        Ok(())
    }

    async fn issue_reset(
        &self,
        conn: &mut PgConnection,
        password_login_id: Uuid,
        should_set_password: bool,
    ) -> AppResult<PasswordLoginReset> {
        let token = format!("auth-reset-{}", Uuid::new_v4());
        self.logins
            .create_reset(
                conn,
                password_login_id,
                &token,
                should_set_password,
                Utc::now() + Duration::hours(RESET_TOKEN_HOURS),
            )
            .await
    }
}
