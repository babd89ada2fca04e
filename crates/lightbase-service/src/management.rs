//! Operator management interface: self-provisioned short-lived elevated
//! sessions delivered as magic links through an external messaging
//! platform.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgConnection;
use tracing::info;

use lightbase_core::config::{DeployEnvironment, ManagementConfig};
use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;
use lightbase_auth::providers::anonymous::AnonymousProvider;
use lightbase_database::repositories::user::UserRepository;

use crate::permission::{PermissionEngine, RoleSelector};
use crate::tenant::ResolvedTenant;

/// Seam to the external messaging workspace.
#[async_trait]
pub trait ChatDirectory: Send + Sync {
    /// Whether the chat user id belongs to the operator workspace.
    async fn is_known_operator(&self, chat_user_id: &str) -> AppResult<bool>;

    /// Deliver the magic link to the operator as a direct message.
    async fn deliver_magic_link(&self, chat_user_id: &str, link: &str) -> AppResult<()>;
}

/// Slack-backed [`ChatDirectory`].
pub struct SlackDirectory {
    http: reqwest::Client,
    token: String,
}

impl SlackDirectory {
    /// Creates the directory client.
    pub fn new(config: &ManagementConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::server("server.internal.httpClient").with_source(e))?;

        Ok(Self {
            http,
            token: config.chat_token.clone(),
        })
    }
}

#[async_trait]
impl ChatDirectory for SlackDirectory {
    async fn is_known_operator(&self, chat_user_id: &str) -> AppResult<bool> {
        let response: serde_json::Value = self
            .http
            .get("https://slack.com/api/users.info")
            .bearer_auth(&self.token)
            .query(&[("user", chat_user_id)])
            .send()
            .await
            .map_err(|e| AppError::server("management.requestMagicLink.chatUnavailable").with_source(e))?
            .json()
            .await
            .map_err(|e| AppError::server("management.requestMagicLink.chatUnavailable").with_source(e))?;

        Ok(response["ok"].as_bool().unwrap_or(false)
            && !response["user"]["deleted"].as_bool().unwrap_or(false)
            && !response["user"]["is_bot"].as_bool().unwrap_or(false))
    }

    async fn deliver_magic_link(&self, chat_user_id: &str, link: &str) -> AppResult<()> {
        let response: serde_json::Value = self
            .http
            .post("https://slack.com/api/chat.postMessage")
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "channel": chat_user_id,
                "text": format!("Your Lightbase management link: {link}"),
            }))
            .send()
            .await
            .map_err(|e| AppError::server("management.requestMagicLink.chatUnavailable").with_source(e))?
            .json()
            .await
            .map_err(|e| AppError::server("management.requestMagicLink.chatUnavailable").with_source(e))?;

        if !response["ok"].as_bool().unwrap_or(false) {
            return Err(AppError::server("management.requestMagicLink.chatUnavailable"));
        }
        Ok(())
    }
}

/// Outcome of a magic link request.
#[derive(Debug, Clone)]
pub enum MagicLinkDelivery {
    /// Delivered through the messaging platform.
    Sent,
    /// Returned inline; development only.
    Inline(String),
}

/// The management interface service.
pub struct ManagementService {
    users: UserRepository,
    anonymous_provider: AnonymousProvider,
    permissions: Arc<PermissionEngine>,
    directory: Arc<dyn ChatDirectory>,
    config: ManagementConfig,
    environment: DeployEnvironment,
}

impl std::fmt::Debug for ManagementService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagementService").finish_non_exhaustive()
    }
}

impl ManagementService {
    /// Creates the service.
    pub fn new(
        users: UserRepository,
        anonymous_provider: AnonymousProvider,
        permissions: Arc<PermissionEngine>,
        directory: Arc<dyn ChatDirectory>,
        config: ManagementConfig,
        environment: DeployEnvironment,
    ) -> Self {
        Self {
            users,
            anonymous_provider,
            permissions,
            directory,
            config,
            environment,
        }
    }

    /// Verify the operator against the workspace directory, create a
    /// transient user carrying the management role, and deliver a magic
    /// link. In development the link is returned inline instead.
    pub async fn request_magic_link(
        &self,
        conn: &mut PgConnection,
        tenant: &ResolvedTenant,
        chat_user_id: &str,
    ) -> AppResult<MagicLinkDelivery> {
        if !self.directory.is_known_operator(chat_user_id).await? {
            return Err(AppError::forbidden(
                "management.requestMagicLink.unknownOperator",
            ));
        }

        let name = format!("management-{chat_user_id}");
        let user = self.users.create(conn, Some(&name)).await?;
        self.users.add_tenant(conn, user.id, tenant.tenant.id).await?;

        let login = self.anonymous_provider.register(conn, user.id, true).await?;

        self.permissions
            .user_sync_roles(
                conn,
                user.id,
                tenant.tenant.id,
                RoleSelector {
                    id_in: None,
                    identifier_in: Some(vec![self.config.role_identifier.clone()]),
                },
            )
            .await?;

        let link = format!(
            "https://{}/_lightbase/magic-link?token={}",
            tenant.public_url, login.login_token
        );

        info!(user_id = %user.id, operator = %chat_user_id, "Management magic link issued");

        if self.environment.is_development() {
            return Ok(MagicLinkDelivery::Inline(link));
        }

        self.directory.deliver_magic_link(chat_user_id, &link).await?;
        Ok(MagicLinkDelivery::Sent)
    }

    /// Hours a transient management user may live; consumed by the daily
    /// cleanup job.
    pub fn transient_user_ttl_hours(&self) -> i64 {
        self.config.transient_user_ttl_hours
    }
}

/// A [`ChatDirectory`] that recognizes nobody; used when management is not
/// configured.
#[derive(Debug, Default)]
pub struct DisabledChatDirectory;

#[async_trait]
impl ChatDirectory for DisabledChatDirectory {
    async fn is_known_operator(&self, _chat_user_id: &str) -> AppResult<bool> {
        Ok(false)
    }

    async fn deliver_magic_link(&self, _chat_user_id: &str, _link: &str) -> AppResult<()> {
        Err(AppError::server("management.requestMagicLink.chatUnavailable"))
    }
}
