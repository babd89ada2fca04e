//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. The merged document is read once at startup, validated, and
//! treated as immutable for the process lifetime.

pub mod auth;
pub mod database;
pub mod digid;
pub mod feature_flag;
pub mod keycloak;
pub mod logging;
pub mod management;
pub mod multitenant;
pub mod permission;
pub mod rate_limit;
pub mod server;
pub mod worker;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use self::auth::{AuthConfig, PasswordConfig, SessionConfig};
pub use self::database::DatabaseConfig;
pub use self::digid::DigidConfig;
pub use self::feature_flag::FeatureFlagConfig;
pub use self::keycloak::KeycloakConfig;
pub use self::logging::LoggingConfig;
pub use self::management::ManagementConfig;
pub use self::multitenant::MultitenantConfig;
pub use self::permission::PermissionConfig;
pub use self::rate_limit::RateLimitConfig;
pub use self::server::ServerConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// The deployment environment the process runs in.
///
/// Controls tenant url-config filtering, the tenant-origin override header,
/// the development signing key, and which SAML back-channel is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployEnvironment {
    /// Production deployment.
    Production,
    /// Acceptance/staging deployment.
    Acceptance,
    /// Local development.
    Development,
}

impl DeployEnvironment {
    /// Whether the `x-lpc-tenant-origin` override header is honored.
    pub fn allows_tenant_origin_override(self) -> bool {
        matches!(self, Self::Development | Self::Acceptance)
    }

    /// Whether this is a production deployment.
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Whether this is a development deployment.
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// The string form used in tenant url-config entries.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Acceptance => "acceptance",
            Self::Development => "development",
        }
    }
}

impl fmt::Display for DeployEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeployEnvironment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" => Ok(Self::Production),
            "acceptance" => Ok(Self::Acceptance),
            "development" => Ok(Self::Development),
            other => Err(AppError::configuration(format!(
                "invalid LIGHTBASE_ENV '{other}', expected production, acceptance or development"
            ))),
        }
    }
}

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged TOML
/// configuration files (default.toml + environment overlay + `LIGHTBASE__`
/// environment variables).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Token signing and password policy settings.
    pub auth: AuthConfig,
    /// Session and device settings.
    pub session: SessionConfig,
    /// Tenant declarations and multi-tenant behavior.
    pub multitenant: MultitenantConfig,
    /// Permission catalog and mandatory roles.
    pub permission: PermissionConfig,
    /// Declared feature flags.
    #[serde(default)]
    pub feature_flag: FeatureFlagConfig,
    /// Password-route rate limiting.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Federated OIDC provider settings (optional).
    #[serde(default)]
    pub keycloak: Option<KeycloakConfig>,
    /// DigiD SAML provider settings (optional).
    #[serde(default)]
    pub digid: Option<DigidConfig>,
    /// Operator management interface settings (optional).
    #[serde(default)]
    pub management: Option<ManagementConfig>,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `LIGHTBASE`.
    pub fn load(env: DeployEnvironment) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("LIGHTBASE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(AppError::from)
    }

    /// Resolve the token signing key for this deployment.
    ///
    /// Production requires `APP_KEYS` to be set; other environments fall
    /// back to a fixed development key so local tokens survive restarts.
    pub fn signing_key(&self, env: DeployEnvironment) -> Result<String, AppError> {
        match std::env::var("APP_KEYS") {
            Ok(keys) if !keys.is_empty() => Ok(keys),
            _ if env.is_production() => Err(AppError::configuration(
                "APP_KEYS is required in production",
            )),
            _ => Ok("lightbase-insecure-development-key".to_string()),
        }
    }
}

/// Read and validate the deployment environment from `LIGHTBASE_ENV`.
///
/// Absent defaults to development; an unrecognized value aborts startup.
pub fn deploy_environment() -> Result<DeployEnvironment, AppError> {
    match std::env::var("LIGHTBASE_ENV") {
        Ok(value) => value.parse(),
        Err(_) => Ok(DeployEnvironment::Development),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parsing() {
        assert_eq!(
            "production".parse::<DeployEnvironment>().unwrap(),
            DeployEnvironment::Production
        );
        assert!("staging".parse::<DeployEnvironment>().is_err());
    }

    #[test]
    fn override_header_only_outside_production() {
        assert!(!DeployEnvironment::Production.allows_tenant_origin_override());
        assert!(DeployEnvironment::Acceptance.allows_tenant_origin_override());
        assert!(DeployEnvironment::Development.allows_tenant_origin_override());
    }
}
