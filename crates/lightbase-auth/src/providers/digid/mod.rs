//! DigiD provider: the BSN/SAML artifact-binding state machine.
//!
//! 1. `metadata` — signed SAML metadata for out-of-band federation
//!    onboarding.
//! 2. `redirect_url` — signed `AuthnRequest` behind the redirect binding.
//! 3. `resolve_artifact` — signed SOAP `ArtifactResolve` over mutual TLS,
//!    response verification, status mapping, BSN extraction.
//! 4. `login` — resolve the BSN to a user within the tenant.

mod client;
pub mod saml;

pub use client::ArtifactClient;

use chrono::Utc;
use sqlx::PgConnection;
use tracing::info;
use uuid::Uuid;

use lightbase_core::config::{DeployEnvironment, DigidConfig};
use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;
use lightbase_database::repositories::digid_login::DigidLoginRepository;
use lightbase_database::repositories::user::UserRepository;
use lightbase_entity::tenant::Tenant;

use self::saml::{RequestSigner, ResponseVerifier};

/// NameID prefix carried by DigiD subjects; the remainder is the BSN.
const BSN_PREFIX: &str = "s00000000:";

/// The BSN/SAML artifact-binding authentication provider.
#[derive(Debug, Clone)]
pub struct DigidProvider {
    logins: DigidLoginRepository,
    users: UserRepository,
    config: DigidConfig,
    client: ArtifactClient,
    signer: RequestSigner,
    verifier: ResponseVerifier,
}

impl DigidProvider {
    /// Creates the provider, parsing the configured key material.
    pub fn new(
        logins: DigidLoginRepository,
        users: UserRepository,
        config: DigidConfig,
        environment: DeployEnvironment,
    ) -> AppResult<Self> {
        let signer = RequestSigner::from_pem(&config.private_key_pem)?;
        let verifier = ResponseVerifier::from_pem(&config.idp_public_key_pem)?;
        let client = ArtifactClient::new(&config, environment)?;

        Ok(Self {
            logins,
            users,
            config,
            client,
            signer,
            verifier,
        })
    }

    /// Signed SAML metadata document for the configured key pair and issuer.
    pub fn metadata(&self) -> AppResult<String> {
        let certificate = pem_body(&self.config.certificate_pem);
        let entity_id = &self.config.issuer;
        let descriptor_id = format!("lightbase-md-{}", Uuid::new_v4().simple());

        let unsigned = format!(
            r#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="{descriptor_id}" entityID="{entity_id}"><saml:Issuer>{entity_id}</saml:Issuer><md:SPSSODescriptor AuthnRequestsSigned="true" WantAssertionsSigned="true" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol"><md:KeyDescriptor use="signing"><ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:X509Data><ds:X509Certificate>{certificate}</ds:X509Certificate></ds:X509Data></ds:KeyInfo></md:KeyDescriptor><md:AssertionConsumerService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Artifact" Location="{entity_id}/auth/digid-based/login" index="0"/></md:SPSSODescriptor></md:EntityDescriptor>"#,
        );

        saml::insert_enveloped_signature(&unsigned, &descriptor_id, &self.signer)
    }

    /// The signed redirect URL carrying the `AuthnRequest`.
    pub fn redirect_url(&self) -> AppResult<String> {
        let request_id = format!("lightbase-ar-{}", Uuid::new_v4().simple());
        let request = saml::build_authn_request(
            &request_id,
            Utc::now(),
            &self.config.issuer,
            &self.config.sso_url,
        );
        saml::build_redirect_url(&self.config.sso_url, &request, &self.signer)
    }

    /// Resolve an artifact through the back channel and extract the BSN.
    pub async fn resolve_artifact(&self, artifact: &str) -> AppResult<String> {
        let request_id = format!("lightbase-rs-{}", Uuid::new_v4().simple());
        let envelope = saml::build_artifact_resolve(
            &request_id,
            Utc::now(),
            &self.config.issuer,
            artifact,
            &self.signer,
        )?;

        let response = self.client.resolve(&envelope).await?;

        let verified = saml::parse_artifact_response(
            &response,
            &self.verifier,
            &self.config.issuer,
            Utc::now(),
        )?;

        extract_bsn(&verified.name_id)
    }

    /// Resolve the BSN to a user in the tenant and record the login.
    pub async fn login(
        &self,
        conn: &mut PgConnection,
        tenant: &Tenant,
        bsn: &str,
    ) -> AppResult<Uuid> {
        let login = self
            .logins
            .find_by_bsn_in_tenant(tenant.id, bsn)
            .await?
            .ok_or_else(|| AppError::validation("authDigidBased.login.unknownBsn"))?;

        self.users.set_last_login(conn, login.user_id).await?;
        info!(user_id = %login.user_id, tenant = %tenant.name, "DigiD login");
        Ok(login.user_id)
    }
}

/// Strip the `s00000000:` prefix and left-pad the remainder to 9 digits.
fn extract_bsn(name_id: &str) -> AppResult<String> {
    let digits = name_id
        .strip_prefix(BSN_PREFIX)
        .ok_or_else(|| AppError::unauthorized("authDigidBased.resolveArtifact.missingNameId"))?;

    if digits.is_empty() || digits.len() > 9 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::unauthorized(
            "authDigidBased.resolveArtifact.missingNameId",
        ));
    }

    Ok(format!("{digits:0>9}"))
}

/// The base64 body of a PEM block, headers and whitespace removed.
fn pem_body(pem: &str) -> String {
    pem.lines()
        .filter(|line| !line.starts_with("-----"))
        .collect::<Vec<_>>()
        .join("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bsn_is_zero_padded() {
        assert_eq!(extract_bsn("s00000000:123456789").unwrap(), "123456789");
        assert_eq!(extract_bsn("s00000000:1234567").unwrap(), "001234567");
    }

    #[test]
    fn foreign_name_ids_are_rejected() {
        assert!(extract_bsn("123456789").is_err());
        assert!(extract_bsn("s00000000:12345678901").is_err());
        assert!(extract_bsn("s00000000:12a4567").is_err());
    }

    #[test]
    fn pem_body_strips_armor() {
        let pem = "-----BEGIN CERTIFICATE-----\nAAAA\nBBBB\n-----END CERTIFICATE-----\n";
        assert_eq!(pem_body(pem), "AAAABBBB");
    }
}
