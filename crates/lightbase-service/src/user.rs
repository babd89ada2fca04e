//! User directory: creation with provider fan-out, the `requireUser`
//! guard, uniqueness checks, soft deletion, summaries, and user merging.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgConnection;
use tracing::info;
use uuid::Uuid;

use lightbase_core::config::MultitenantConfig;
use lightbase_core::error::AppError;
use lightbase_core::events::AuthEvent;
use lightbase_core::result::AppResult;
use lightbase_database::repositories::digid_login::DigidLoginRepository;
use lightbase_database::repositories::job::JobRepository;
use lightbase_database::repositories::keycloak_login::KeycloakLoginRepository;
use lightbase_database::repositories::password_login::PasswordLoginRepository;
use lightbase_database::repositories::tenant::TenantRepository;
use lightbase_database::repositories::totp_settings::TotpSettingsRepository;
use lightbase_database::repositories::user::{UserListFilter, UserRepository};
use lightbase_auth::providers::anonymous::AnonymousProvider;
use lightbase_auth::providers::keycloak::ImplicitUserProvisioner;
use lightbase_auth::providers::password::PasswordProvider;
use lightbase_auth::totp as totp_util;
use lightbase_entity::login::LoginType;
use lightbase_entity::session::{SessionData, SessionType};
use lightbase_entity::tenant::Tenant;
use lightbase_entity::user::{User, UserWithLogins};

use crate::permission::{PermissionEngine, RoleSelector};

/// Password login requested at user creation.
#[derive(Debug, Clone)]
pub struct NewPasswordLogin {
    /// Login email.
    pub email: String,
    /// Plaintext password; `None` requires `random_password`.
    pub password: Option<String>,
    /// Initialize with a placeholder hash and a set-password reset token.
    pub random_password: bool,
}

/// Everything a user can be created with. Providers are registered in a
/// fixed order: password, anonymous, digid, keycloak, totp.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    /// Optional display name.
    pub name: Option<String>,
    /// Tenants to join; ignored when users sync across all tenants.
    pub tenant_ids: Vec<Uuid>,
    /// Attach a password login.
    pub with_password: Option<NewPasswordLogin>,
    /// Attach an anonymous login with this `is_allowed_to_login` flag.
    pub with_anonymous: Option<bool>,
    /// Attach a DigiD login for this BSN.
    pub with_digid: Option<String>,
    /// Attach a Keycloak login for this email.
    pub with_keycloak: Option<String>,
    /// Seed unverified authenticator TOTP settings.
    pub with_totp: bool,
    /// Initial roles, synced by identifier within the creation tenant.
    pub role_identifiers: Option<Vec<String>>,
}

/// Options of the `requireUser` guard.
#[derive(Debug, Clone)]
pub struct RequireUserOptions {
    /// Error key prefix, e.g. `authPasswordBased.requireUser`.
    pub event_key_prefix: String,
    /// Permissions the caller must hold (superset check).
    pub required_permissions: Vec<String>,
    /// Provider the session must have been established through.
    pub required_login_type: Option<LoginType>,
    /// Accept `checkTwoStep`/`passwordBasedUpdatePassword` sessions too.
    pub skip_session_is_user_check: bool,
}

impl RequireUserOptions {
    /// Options with only the existence and session-type checks.
    pub fn new(event_key_prefix: impl Into<String>) -> Self {
        Self {
            event_key_prefix: event_key_prefix.into(),
            required_permissions: Vec::new(),
            required_login_type: None,
            skip_session_is_user_check: false,
        }
    }

    /// Require the given permissions.
    #[must_use]
    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.required_permissions = permissions.iter().map(|p| (*p).to_string()).collect();
        self
    }

    /// Require a login provider.
    #[must_use]
    pub fn with_login_type(mut self, login_type: LoginType) -> Self {
        self.required_login_type = Some(login_type);
        self
    }

    /// Accept sessions that have not passed the second factor yet.
    #[must_use]
    pub fn skip_session_is_user_check(mut self) -> Self {
        self.skip_session_is_user_check = true;
        self
    }
}

/// Hooks bracketing a user merge.
///
/// `retarget_tables` is the declarative allowlist of (table, column) pairs
/// whose foreign keys are rewritten to the surviving user; identity tables
/// (provider logins, TOTP, roles, memberships) are never listed and
/// cascade-delete with the old user instead.
#[async_trait]
pub trait UserMergeHooks: Send + Sync {
    /// Whether these two users may be combined.
    async fn should_combine(&self, old_user: &User, new_user: &User) -> AppResult<bool> {
        let _ = (old_user, new_user);
        Ok(true)
    }

    /// Runs before re-targeting, on the merge transaction.
    async fn before_combine(
        &self,
        conn: &mut PgConnection,
        old_user: &User,
        new_user: &User,
    ) -> AppResult<()> {
        let _ = (conn, old_user, new_user);
        Ok(())
    }

    /// Runs after the old user is deleted, on the merge transaction.
    async fn after_combine(
        &self,
        conn: &mut PgConnection,
        old_user_id: Uuid,
        new_user: &User,
    ) -> AppResult<()> {
        let _ = (conn, old_user_id, new_user);
        Ok(())
    }

    /// (table, column) pairs to re-target from the old to the new user id.
    fn retarget_tables(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// The user directory.
pub struct UserDirectory {
    users: UserRepository,
    tenants: TenantRepository,
    password_logins: PasswordLoginRepository,
    keycloak_logins: KeycloakLoginRepository,
    digid_logins: DigidLoginRepository,
    totp_settings: TotpSettingsRepository,
    jobs: JobRepository,
    password_provider: PasswordProvider,
    anonymous_provider: AnonymousProvider,
    permissions: Arc<PermissionEngine>,
    multitenant: MultitenantConfig,
    merge_hooks: Option<Arc<dyn UserMergeHooks>>,
}

impl std::fmt::Debug for UserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectory").finish_non_exhaustive()
    }
}

impl UserDirectory {
    /// Creates the directory.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: UserRepository,
        tenants: TenantRepository,
        password_logins: PasswordLoginRepository,
        keycloak_logins: KeycloakLoginRepository,
        digid_logins: DigidLoginRepository,
        totp_settings: TotpSettingsRepository,
        jobs: JobRepository,
        password_provider: PasswordProvider,
        anonymous_provider: AnonymousProvider,
        permissions: Arc<PermissionEngine>,
        multitenant: MultitenantConfig,
    ) -> Self {
        Self {
            users,
            tenants,
            password_logins,
            keycloak_logins,
            digid_logins,
            totp_settings,
            jobs,
            password_provider,
            anonymous_provider,
            permissions,
            multitenant,
            merge_hooks: None,
        }
    }

    /// Register merge hooks.
    #[must_use]
    pub fn with_merge_hooks(mut self, hooks: Arc<dyn UserMergeHooks>) -> Self {
        self.merge_hooks = Some(hooks);
        self
    }

    // ── Creation ─────────────────────────────────────────────────

    /// Create a user with the requested provider attachments.
    ///
    /// Must run on an open transaction; membership fan-out, provider
    /// registration, role sync, and the uniqueness check all ride it.
    pub async fn create_user(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        new: NewUser,
    ) -> AppResult<User> {
        let user = self.users.create(conn, new.name.as_deref()).await?;

        if self.multitenant.sync_users_across_all_tenants {
            for tenant in self.tenants.find_all().await? {
                self.users.add_tenant(conn, user.id, tenant.id).await?;
            }
        } else {
            let mut tenant_ids = new.tenant_ids.clone();
            if !tenant_ids.contains(&tenant_id) {
                tenant_ids.push(tenant_id);
            }
            for id in tenant_ids {
                self.users.add_tenant(conn, user.id, id).await?;
            }
        }

        if let Some(password) = &new.with_password {
            self.password_provider
                .register(
                    conn,
                    user.id,
                    &password.email,
                    password.password.as_deref(),
                    password.random_password,
                )
                .await?;
        }
        if let Some(is_allowed_to_login) = new.with_anonymous {
            self.anonymous_provider
                .register(conn, user.id, is_allowed_to_login)
                .await?;
        }
        if let Some(bsn) = &new.with_digid {
            self.digid_logins.create(conn, user.id, bsn).await?;
        }
        if let Some(email) = &new.with_keycloak {
            self.keycloak_logins.create(conn, user.id, email).await?;
        }
        if new.with_totp {
            let secret = totp_util::generate_secret();
            self.totp_settings
                .upsert_unverified(conn, user.id, &secret)
                .await?;
        }

        if let Some(identifiers) = new.role_identifiers {
            self.permissions
                .user_sync_roles(
                    conn,
                    user.id,
                    tenant_id,
                    RoleSelector {
                        id_in: None,
                        identifier_in: Some(identifiers),
                    },
                )
                .await?;
        }

        self.check_unique(conn, user.id).await?;

        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    /// Add a tenant membership and re-run the uniqueness check.
    pub async fn add_tenant(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> AppResult<()> {
        self.users.add_tenant(conn, user_id, tenant_id).await?;
        self.check_unique(conn, user_id).await
    }

    // ── Uniqueness ───────────────────────────────────────────────

    /// For every tenant the user belongs to there must be no other
    /// non-deleted user holding the same password or Keycloak email.
    ///
    /// Runs on the transaction so memberships and logins inserted moments
    /// earlier take part in the check.
    pub async fn check_unique(&self, conn: &mut PgConnection, user_id: Uuid) -> AppResult<()> {
        let tenant_ids = self.users.tenant_ids_tx(conn, user_id).await?;
        let password_login = self.password_logins.find_by_user_tx(conn, user_id).await?;
        let keycloak_login = self.keycloak_logins.find_by_user_tx(conn, user_id).await?;

        for tenant_id in &tenant_ids {
            if let Some(login) = &password_login {
                let duplicates = self
                    .password_logins
                    .count_duplicates_in_tenant(conn, *tenant_id, &login.email, user_id)
                    .await?;
                if duplicates > 0 {
                    return Err(AppError::validation(
                        "authPasswordBased.checkUnique.duplicateEmail",
                    ));
                }
            }
            if let Some(login) = &keycloak_login {
                let duplicates = self
                    .keycloak_logins
                    .count_duplicates_in_tenant(conn, *tenant_id, &login.email, user_id)
                    .await?;
                if duplicates > 0 {
                    return Err(AppError::validation(
                        "authKeycloakBased.checkUnique.duplicateEmail",
                    ));
                }
            }
        }
        Ok(())
    }

    // ── requireUser ──────────────────────────────────────────────

    /// Load the session's user with all joins and verify, in order: the
    /// user exists and is tenant-bound, the session type, the login type,
    /// and the permission superset.
    pub async fn require_user(
        &self,
        session: &SessionData,
        tenant_id: Uuid,
        options: &RequireUserOptions,
    ) -> AppResult<UserWithLogins> {
        let prefix = &options.event_key_prefix;

        let user = self
            .users
            .find_with_logins(session.user_id)
            .await?
            .filter(|u| u.user.can_authenticate() && u.is_member_of(tenant_id))
            .ok_or_else(|| AppError::not_found(format!("{prefix}.invalidUser")))?;

        if !options.skip_session_is_user_check && session.session_type != SessionType::User {
            return Err(AppError::unauthorized(format!("{prefix}.incorrectSessionType")));
        }

        if let Some(required) = options.required_login_type {
            if session.login_type != required {
                return Err(AppError::unauthorized(format!("{prefix}.incorrectLoginType")));
            }
        }

        if !options.required_permissions.is_empty() {
            let (_, held) = self.permissions.user_summary(user.user.id, tenant_id).await?;
            let missing: Vec<&String> = options
                .required_permissions
                .iter()
                .filter(|p| !held.contains(p))
                .collect();
            if !missing.is_empty() {
                return Err(
                    AppError::forbidden(format!("{prefix}.missingPermissions")).with_info(
                        serde_json::json!({ "missingPermissions": missing }),
                    ),
                );
            }
        }

        Ok(user)
    }

    // ── Reads & updates ──────────────────────────────────────────

    /// Load a user with all joins.
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<UserWithLogins> {
        self.users
            .find_with_logins(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("auth.user.unknownUser"))
    }

    /// List users for the admin surface.
    pub async fn list_users(&self, filter: &UserListFilter) -> AppResult<Vec<User>> {
        self.users.list(filter).await
    }

    /// Update the display name.
    pub async fn update_user(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        name: Option<&str>,
    ) -> AppResult<()> {
        self.get_user(user_id).await?;
        self.users.update_name(conn, user_id, name).await
    }

    /// Toggle the soft-delete marker. The softDeleted event fires once,
    /// on the active→deleted transition.
    pub async fn set_active(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        active: bool,
    ) -> AppResult<()> {
        self.get_user(user_id).await?;
        let changed = self.users.set_deleted(conn, user_id, !active).await?;

        if changed && !active {
            self.jobs
                .enqueue(
                    conn,
                    AuthEvent::UserSoftDeleted.job_name(),
                    &serde_json::json!({ "userId": user_id }),
                    None,
                    5,
                )
                .await?;
            info!(user_id = %user_id, "User soft-deleted");
        }
        Ok(())
    }

    /// The `UserSummary` wire view.
    pub async fn user_summary(
        &self,
        user: &UserWithLogins,
        tenant_id: Uuid,
    ) -> AppResult<serde_json::Value> {
        let (roles, permissions) = self.permissions.user_summary(user.user.id, tenant_id).await?;

        let mut summary = serde_json::json!({
            "id": user.user.id,
            "name": user.user.name,
            "lastLogin": user.user.last_login,
            "createdAt": user.user.created_at,
            "deletedAt": user.user.deleted_at,
            "tenants": user.tenant_ids,
            "roles": roles,
            "permissions": permissions,
        });

        if let Some(login) = &user.password_login {
            summary["passwordLogin"] = serde_json::json!({
                "email": login.email,
                "verifiedAt": login.verified_at,
                "otpEnabledAt": login.otp_enabled_at,
            });
        }
        if let Some(login) = &user.anonymous_login {
            summary["anonymousLogin"] = serde_json::json!({
                "isAllowedToLogin": login.is_allowed_to_login,
            });
        }
        if user.digid_login.is_some() {
            summary["digidLogin"] = serde_json::json!({});
        }
        if let Some(login) = &user.keycloak_login {
            summary["keycloakLogin"] = serde_json::json!({ "email": login.email });
        }
        if let Some(totp) = &user.totp_settings {
            summary["totpSettings"] = serde_json::json!({ "verifiedAt": totp.verified_at });
        }

        Ok(summary)
    }

    /// Rewrite a user's Keycloak login email and re-check uniqueness.
    pub async fn update_keycloak_email(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        email: &str,
    ) -> AppResult<()> {
        self.keycloak_logins.set_email(conn, user_id, email).await?;
        self.check_unique(conn, user_id).await
    }

    // ── Merge ────────────────────────────────────────────────────

    /// Combine an old (typically implicitly-created) user into the one the
    /// login resolved to: re-target allowlisted foreign keys, then delete
    /// the old user.
    ///
    /// Without registered hooks this is a no-op: merging is opt-in for the
    /// embedding application.
    pub async fn combine_users(
        &self,
        conn: &mut PgConnection,
        old_user_id: Uuid,
        new_user_id: Uuid,
    ) -> AppResult<()> {
        if self.merge_hooks.is_none() || old_user_id == new_user_id {
            return Ok(());
        }

        let old_user = self
            .users
            .find_by_id(old_user_id)
            .await?
            .ok_or_else(|| AppError::not_found("auth.combineUsers.unknownUser"))?;
        let new_user = self
            .users
            .find_by_id(new_user_id)
            .await?
            .ok_or_else(|| AppError::not_found("auth.combineUsers.unknownUser"))?;

        if let Some(hooks) = &self.merge_hooks {
            if !hooks.should_combine(&old_user, &new_user).await? {
                return Err(AppError::validation("auth.combineUsers.notAllowed"));
            }
            hooks.before_combine(conn, &old_user, &new_user).await?;

            for (table, column) in hooks.retarget_tables() {
                let rows = self
                    .users
                    .retarget_column(conn, &table, &column, old_user_id, new_user_id)
                    .await?;
                info!(table = %table, column = %column, rows, "Re-targeted foreign keys");
            }
        }

        self.users.delete(conn, old_user_id).await?;

        if let Some(hooks) = &self.merge_hooks {
            hooks.after_combine(conn, old_user_id, &new_user).await?;
        }

        info!(old_user_id = %old_user_id, new_user_id = %new_user_id, "Users combined");
        Ok(())
    }
}

#[async_trait]
impl ImplicitUserProvisioner for UserDirectory {
    async fn provision_keycloak_user(
        &self,
        conn: &mut PgConnection,
        tenant: &Tenant,
        email: &str,
        name: Option<&str>,
        single_tenant: bool,
    ) -> AppResult<Uuid> {
        let user = self.users.create(conn, name).await?;

        if single_tenant || !self.multitenant.sync_users_across_all_tenants {
            self.users.add_tenant(conn, user.id, tenant.id).await?;
        } else {
            for tenant in self.tenants.find_all().await? {
                self.users.add_tenant(conn, user.id, tenant.id).await?;
            }
        }

        self.keycloak_logins.create(conn, user.id, email).await?;
        self.check_unique(conn, user.id).await?;

        Ok(user.id)
    }
}
