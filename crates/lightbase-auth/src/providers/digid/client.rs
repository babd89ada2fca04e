//! Mutual-TLS SOAP client for the DigiD back channel.

use std::time::Duration;

use lightbase_core::config::{DeployEnvironment, DigidConfig};
use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;

/// Posts signed `ArtifactResolve` envelopes to the IdP back channel over
/// mutual TLS. Staging vs production is chosen from the deployment
/// environment.
#[derive(Clone)]
pub struct ArtifactClient {
    http: reqwest::Client,
    resolve_url: String,
}

impl std::fmt::Debug for ArtifactClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactClient")
            .field("resolve_url", &self.resolve_url)
            .finish_non_exhaustive()
    }
}

impl ArtifactClient {
    /// Build the client from the configured key pair and CA bundle.
    pub fn new(config: &DigidConfig, environment: DeployEnvironment) -> AppResult<Self> {
        let identity_pem = format!("{}\n{}", config.private_key_pem, config.certificate_pem);
        let identity = reqwest::Identity::from_pem(identity_pem.as_bytes())
            .map_err(|e| AppError::configuration(format!("invalid DigiD mTLS identity: {e}")))?;

        let mut builder = reqwest::Client::builder()
            .identity(identity)
            .timeout(Duration::from_secs(config.request_timeout_seconds));

        if let Some(ca_pem) = &config.ca_chain_pem {
            let certificates = reqwest::Certificate::from_pem_bundle(ca_pem.as_bytes())
                .map_err(|e| AppError::configuration(format!("invalid DigiD CA chain: {e}")))?;
            for certificate in certificates {
                builder = builder.add_root_certificate(certificate);
            }
        }

        let http = builder
            .build()
            .map_err(|e| AppError::server("server.internal.httpClient").with_source(e))?;

        let resolve_url = if environment.is_production() {
            config.artifact_resolve_url_production.clone()
        } else {
            config.artifact_resolve_url_staging.clone()
        };

        Ok(Self { http, resolve_url })
    }

    /// POST the SOAP envelope and return the raw response body.
    pub async fn resolve(&self, envelope: &str) -> AppResult<String> {
        let response = self
            .http
            .post(&self.resolve_url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", "")
            .body(envelope.to_string())
            .send()
            .await
            .map_err(|e| {
                AppError::server("authDigidBased.resolveArtifact.requestFailed").with_source(e)
            })?;

        if !response.status().is_success() {
            return Err(
                AppError::server("authDigidBased.resolveArtifact.requestFailed").with_info(
                    serde_json::json!({ "status": response.status().as_u16() }),
                ),
            );
        }

        response.text().await.map_err(|e| {
            AppError::server("authDigidBased.resolveArtifact.requestFailed").with_source(e)
        })
    }
}
