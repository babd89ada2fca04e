//! TOTP second-factor provider: setup, setup verification, runtime
//! verification, and removal.

use sqlx::PgConnection;
use tracing::info;
use uuid::Uuid;

use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;
use lightbase_database::repositories::totp_settings::TotpSettingsRepository;
use lightbase_entity::login::TotpSettings;

use crate::totp;

/// Result of starting a TOTP setup.
#[derive(Debug, Clone)]
pub struct TotpSetup {
    /// The base32 secret to show once.
    pub secret: String,
    /// The otpauth provisioning URL for authenticator apps.
    pub otpauth_url: String,
}

/// The authenticator-app second-factor provider.
#[derive(Debug, Clone)]
pub struct TotpProvider {
    settings: TotpSettingsRepository,
    issuer: String,
}

impl TotpProvider {
    /// Creates the provider. `issuer` appears in authenticator apps.
    pub fn new(settings: TotpSettingsRepository, issuer: impl Into<String>) -> Self {
        Self {
            settings,
            issuer: issuer.into(),
        }
    }

    /// Current settings for a user, if any.
    pub async fn info(&self, user_id: Uuid) -> AppResult<Option<TotpSettings>> {
        self.settings.find_by_user(user_id).await
    }

    /// Issue a secret and persist it unverified.
    ///
    /// An unverified prior setup is overwritten; a verified one is
    /// protected and must be removed first.
    pub async fn setup(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        account_label: &str,
    ) -> AppResult<TotpSetup> {
        if let Some(existing) = self.settings.find_by_user(user_id).await? {
            if existing.is_verified() {
                return Err(AppError::validation("authTotpProvider.setup.alreadySetUp"));
            }
        }

        let secret = totp::generate_secret();
        self.settings.upsert_unverified(conn, user_id, &secret).await?;

        Ok(TotpSetup {
            otpauth_url: totp::otpauth_url(&secret, account_label, &self.issuer),
            secret,
        })
    }

    /// Verify the first token after setup and mark the settings verified.
    pub async fn setup_verify(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        token: &str,
    ) -> AppResult<()> {
        let settings = self
            .settings
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::validation("authTotpProvider.setupVerify.notSetUp"))?;

        if settings.is_verified() {
            return Err(AppError::validation(
                "authTotpProvider.setupVerify.alreadyVerified",
            ));
        }

        if !totp::verify_token(&settings.secret, token, totp::AUTHENTICATOR_WINDOW)? {
            return Err(AppError::validation("authTotpProvider.setupVerify.invalidTotp"));
        }

        self.settings.set_verified(conn, settings.id).await?;
        info!(user_id = %user_id, "TOTP setup verified");
        Ok(())
    }

    /// Runtime second-factor check against a verified setup.
    pub async fn verify(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let settings = self
            .settings
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::validation("authTotpProvider.verify.notSetUp"))?;

        if !settings.is_verified() {
            return Err(AppError::validation("authTotpProvider.verify.notVerified"));
        }

        if !totp::verify_token(&settings.secret, token, totp::AUTHENTICATOR_WINDOW)? {
            return Err(AppError::validation("authTotpProvider.verify.invalidTotp"));
        }

        Ok(())
    }

    /// Remove the TOTP settings of a user.
    pub async fn remove(&self, conn: &mut PgConnection, user_id: Uuid) -> AppResult<()> {
        let removed = self.settings.delete_for_user(conn, user_id).await?;
        if !removed {
            return Err(AppError::validation("authTotpProvider.remove.notSetUp"));
        }
        info!(user_id = %user_id, "TOTP settings removed");
        Ok(())
    }

    /// Whether a user has a verified TOTP setup, meaning logins must pass
    /// the second factor.
    pub async fn is_active_for_user(&self, user_id: Uuid) -> AppResult<bool> {
        Ok(self
            .settings
            .find_by_user(user_id)
            .await?
            .map(|s| s.is_verified())
            .unwrap_or(false))
    }
}
