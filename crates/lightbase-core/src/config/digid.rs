//! DigiD SAML provider configuration.

use serde::{Deserialize, Serialize};

/// Settings for the BSN/SAML artifact-binding provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigidConfig {
    /// Our entity id (SAML issuer).
    pub issuer: String,
    /// IdP single-sign-on URL the redirect binding points at.
    pub sso_url: String,
    /// IdP back-channel artifact resolution URL for production.
    pub artifact_resolve_url_production: String,
    /// IdP back-channel artifact resolution URL for staging/acceptance.
    pub artifact_resolve_url_staging: String,
    /// PEM-encoded RSA private key used for request signing and mTLS.
    pub private_key_pem: String,
    /// PEM-encoded certificate matching the private key.
    pub certificate_pem: String,
    /// PEM-encoded IdP RSA public key used to verify response signatures.
    pub idp_public_key_pem: String,
    /// PEM-encoded CA chain bundle for the mutual-TLS back channel.
    #[serde(default)]
    pub ca_chain_pem: Option<String>,
    /// Outbound request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    15
}
