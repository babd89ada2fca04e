//! SAML primitives for the DigiD artifact binding: AuthnRequest and
//! ArtifactResolve construction, redirect-binding encoding, RSA-SHA256
//! signatures, and ArtifactResponse verification.
//!
//! XML we emit is written in canonical form in a single pass (fixed
//! namespaces, fixed attribute order), so signatures are computed over the
//! rendered bytes. Verification of inbound documents checks every
//! `Signature`: the RSA signature over the raw `SignedInfo` octets and the
//! digest over the referenced element with its `Signature` block removed.

use std::io::Write as _;
use std::ops::Range;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, SecondsFormat, Utc};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::sha2::{Digest, Sha256};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};

use lightbase_core::error::AppError;
use lightbase_core::result::AppResult;

/// RSA-SHA256 signature algorithm URI used in the redirect binding.
pub const SIG_ALG_RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

const C14N_EXCLUSIVE: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
const TRANSFORM_ENVELOPED: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
const DIGEST_SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

const STATUS_SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";
const STATUS_AUTHN_FAILED: &str = "urn:oasis:names:tc:SAML:2.0:status:AuthnFailed";
const STATUS_NO_AUTHN_CONTEXT: &str = "urn:oasis:names:tc:SAML:2.0:status:NoAuthnContext";
const STATUS_REQUEST_DENIED: &str = "urn:oasis:names:tc:SAML:2.0:status:RequestDenied";

/// Signs outbound SAML documents and redirect queries.
#[derive(Clone)]
pub struct RequestSigner {
    key: SigningKey<Sha256>,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner").finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Parse a PEM private key (PKCS#8 or PKCS#1).
    pub fn from_pem(pem: &str) -> AppResult<Self> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| AppError::configuration(format!("invalid DigiD private key: {e}")))?;
        Ok(Self {
            key: SigningKey::new(key),
        })
    }

    /// RSA-SHA256 over the given bytes, base64-encoded.
    pub fn sign_base64(&self, data: &[u8]) -> String {
        BASE64.encode(self.key.sign(data).to_bytes())
    }
}

/// Verifies inbound SAML signatures against the IdP public key.
#[derive(Clone)]
pub struct ResponseVerifier {
    key: VerifyingKey<Sha256>,
}

impl std::fmt::Debug for ResponseVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseVerifier").finish_non_exhaustive()
    }
}

impl ResponseVerifier {
    /// Parse a PEM RSA public key.
    pub fn from_pem(pem: &str) -> AppResult<Self> {
        let key = RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| AppError::configuration(format!("invalid DigiD IdP public key: {e}")))?;
        Ok(Self {
            key: VerifyingKey::new(key),
        })
    }

    fn verify(&self, data: &[u8], signature_base64: &str) -> AppResult<()> {
        let raw = BASE64
            .decode(signature_base64.trim())
            .map_err(|_| AppError::unauthorized("authDigidBased.resolveArtifact.invalidSignature"))?;
        let signature = Signature::try_from(raw.as_slice())
            .map_err(|_| AppError::unauthorized("authDigidBased.resolveArtifact.invalidSignature"))?;
        self.key
            .verify(data, &signature)
            .map_err(|_| AppError::unauthorized("authDigidBased.resolveArtifact.invalidSignature"))
    }
}

/// Render a timestamp the way SAML expects it.
fn saml_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build the `AuthnRequest` document for the redirect binding.
pub fn build_authn_request(
    request_id: &str,
    issue_instant: DateTime<Utc>,
    issuer: &str,
    destination: &str,
) -> String {
    format!(
        r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="{request_id}" Version="2.0" IssueInstant="{instant}" Destination="{destination}" ProtocolBinding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Artifact"><saml:Issuer>{issuer}</saml:Issuer><samlp:RequestedAuthnContext Comparison="minimum"><saml:AuthnContextClassRef>urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport</saml:AuthnContextClassRef></samlp:RequestedAuthnContext></samlp:AuthnRequest>"#,
        request_id = request_id,
        instant = saml_instant(issue_instant),
        destination = destination,
        issuer = issuer,
    )
}

/// DEFLATE (raw) + base64, the redirect-binding encoding.
pub fn deflate_base64(xml: &str) -> AppResult<String> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(xml.as_bytes())
        .and_then(|()| encoder.finish())
        .map(|compressed| BASE64.encode(compressed))
        .map_err(|e| AppError::server("server.internal.samlEncode").with_source(e))
}

fn urlencode(input: &str) -> String {
    url::form_urlencoded::byte_serialize(input.as_bytes()).collect()
}

/// Build the signed redirect URL: `SAMLRequest` and `SigAlg` are signed as
/// the exact query string, and the signature appended as `Signature`.
pub fn build_redirect_url(
    sso_url: &str,
    authn_request_xml: &str,
    signer: &RequestSigner,
) -> AppResult<String> {
    let encoded = deflate_base64(authn_request_xml)?;
    let query = format!(
        "SAMLRequest={}&SigAlg={}",
        urlencode(&encoded),
        urlencode(SIG_ALG_RSA_SHA256),
    );
    let signature = signer.sign_base64(query.as_bytes());

    let separator = if sso_url.contains('?') { '&' } else { '?' };
    Ok(format!(
        "{sso_url}{separator}{query}&Signature={}",
        urlencode(&signature)
    ))
}

/// Build the signed SOAP `ArtifactResolve` envelope for the back channel.
pub fn build_artifact_resolve(
    request_id: &str,
    issue_instant: DateTime<Utc>,
    issuer: &str,
    artifact: &str,
    signer: &RequestSigner,
) -> AppResult<String> {
    let unsigned = format!(
        r#"<samlp:ArtifactResolve xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="{request_id}" Version="2.0" IssueInstant="{instant}"><saml:Issuer>{issuer}</saml:Issuer><samlp:Artifact>{artifact}</samlp:Artifact></samlp:ArtifactResolve>"#,
        request_id = request_id,
        instant = saml_instant(issue_instant),
        issuer = issuer,
        artifact = artifact,
    );

    let signed = insert_enveloped_signature(&unsigned, request_id, signer)?;

    Ok(format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body>{signed}</soapenv:Body></soapenv:Envelope>"#,
    ))
}

/// Compute the enveloped signature over an element rendered without one and
/// insert the `ds:Signature` block after its `Issuer` child.
pub fn insert_enveloped_signature(
    element: &str,
    reference_id: &str,
    signer: &RequestSigner,
) -> AppResult<String> {
    let digest = BASE64.encode(Sha256::digest(element.as_bytes()));

    let signed_info = format!(
        r##"<ds:SignedInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:CanonicalizationMethod Algorithm="{C14N_EXCLUSIVE}"/><ds:SignatureMethod Algorithm="{SIG_ALG_RSA_SHA256}"/><ds:Reference URI="#{reference_id}"><ds:Transforms><ds:Transform Algorithm="{TRANSFORM_ENVELOPED}"/><ds:Transform Algorithm="{C14N_EXCLUSIVE}"/></ds:Transforms><ds:DigestMethod Algorithm="{DIGEST_SHA256}"/><ds:DigestValue>{digest}</ds:DigestValue></ds:Reference></ds:SignedInfo>"##,
    );
    let signature_value = signer.sign_base64(signed_info.as_bytes());

    let signature = format!(
        r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">{signed_info}<ds:SignatureValue>{signature_value}</ds:SignatureValue></ds:Signature>"#,
    );

    let insert_at = element
        .find("</saml:Issuer>")
        .map(|pos| pos + "</saml:Issuer>".len())
        .ok_or_else(|| AppError::server("server.internal.samlEncode"))?;

    let mut out = String::with_capacity(element.len() + signature.len());
    out.push_str(&element[..insert_at]);
    out.push_str(&signature);
    out.push_str(&element[insert_at..]);
    Ok(out)
}

/// Everything extracted from a verified `ArtifactResponse`.
#[derive(Debug, Clone)]
pub struct VerifiedArtifactResponse {
    /// The subject NameID text.
    pub name_id: String,
}

/// Parse an `ArtifactResponse`, verify every signature, map the status
/// codes, and enforce the assertion conditions.
pub fn parse_artifact_response(
    xml: &str,
    verifier: &ResponseVerifier,
    expected_audience: &str,
    now: DateTime<Utc>,
) -> AppResult<VerifiedArtifactResponse> {
    verify_all_signatures(xml, verifier)?;
    check_status(xml)?;
    check_conditions(xml, expected_audience, now)?;

    let name_id = element_text(xml, "NameID")
        .ok_or_else(|| AppError::server("authDigidBased.resolveArtifact.missingNameId"))?;

    Ok(VerifiedArtifactResponse { name_id })
}

/// Map the response status codes per the DigiD contract.
fn check_status(xml: &str) -> AppResult<()> {
    let codes = status_code_values(xml);

    if codes.iter().any(|c| c == STATUS_SUCCESS) {
        return Ok(());
    }
    if codes.iter().any(|c| c == STATUS_AUTHN_FAILED) {
        return Err(AppError::unauthorized("authDigidBased.resolveArtifact.aborted"));
    }
    if codes.iter().any(|c| c == STATUS_NO_AUTHN_CONTEXT) {
        return Err(AppError::unauthorized(
            "authDigidBased.resolveArtifact.insufficientSecurityLevel",
        ));
    }
    if codes.iter().any(|c| c == STATUS_REQUEST_DENIED) {
        return Err(AppError::unauthorized(
            "authDigidBased.resolveArtifact.invalidSAMLArt",
        ));
    }

    Err(AppError::server("authDigidBased.resolveArtifact.unexpectedStatus")
        .with_info(serde_json::json!({ "statusCodes": codes })))
}

/// Enforce `AudienceRestriction` and the NotBefore/NotOnOrAfter window.
fn check_conditions(xml: &str, expected_audience: &str, now: DateTime<Utc>) -> AppResult<()> {
    let conditions = element_range(xml, "Conditions", 0)
        .ok_or_else(|| AppError::server("authDigidBased.resolveArtifact.missingConditions"))?;
    let conditions_xml = &xml[conditions];

    let open_end = conditions_xml
        .find('>')
        .ok_or_else(|| AppError::server("authDigidBased.resolveArtifact.missingConditions"))?;
    let open_tag = &conditions_xml[..open_end];

    let not_before = attribute_value(open_tag, "NotBefore")
        .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
        .map(|v| v.with_timezone(&chrono::Utc))
        .ok_or_else(|| AppError::server("authDigidBased.resolveArtifact.missingConditions"))?;
    let not_on_or_after = attribute_value(open_tag, "NotOnOrAfter")
        .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
        .map(|v| v.with_timezone(&chrono::Utc))
        .ok_or_else(|| AppError::server("authDigidBased.resolveArtifact.missingConditions"))?;

    if now < not_before || now >= not_on_or_after {
        return Err(AppError::unauthorized(
            "authDigidBased.resolveArtifact.expiredAssertion",
        ));
    }

    let audience = element_text(conditions_xml, "Audience")
        .ok_or_else(|| AppError::server("authDigidBased.resolveArtifact.missingConditions"))?;
    if audience != expected_audience {
        return Err(AppError::unauthorized(
            "authDigidBased.resolveArtifact.invalidAudience",
        ));
    }

    Ok(())
}

/// Verify every `Signature` element in the document.
fn verify_all_signatures(xml: &str, verifier: &ResponseVerifier) -> AppResult<()> {
    let mut cursor = 0;
    let mut seen = 0;

    while let Some(range) = element_range(xml, "Signature", cursor) {
        cursor = range.end;
        let signature_xml = &xml[range.clone()];

        let signed_info = element_range(signature_xml, "SignedInfo", 0)
            .ok_or_else(|| AppError::unauthorized("authDigidBased.resolveArtifact.invalidSignature"))?;
        let signature_value = element_text(signature_xml, "SignatureValue").ok_or_else(|| {
            AppError::unauthorized("authDigidBased.resolveArtifact.invalidSignature")
        })?;

        verifier.verify(signature_xml[signed_info.clone()].as_bytes(), &signature_value)?;

        // Digest check over the referenced element, signature removed.
        let reference_uri = element_range(signature_xml, "Reference", 0)
            .and_then(|r| {
                let open_end = signature_xml[r.clone()].find('>')?;
                attribute_value(&signature_xml[r.start..r.start + open_end], "URI")
            })
            .ok_or_else(|| AppError::unauthorized("authDigidBased.resolveArtifact.invalidSignature"))?;
        let digest_value = element_text(signature_xml, "DigestValue").ok_or_else(|| {
            AppError::unauthorized("authDigidBased.resolveArtifact.invalidSignature")
        })?;

        let referenced_id = reference_uri.trim_start_matches('#');
        let referenced = element_range_by_id(xml, referenced_id).ok_or_else(|| {
            AppError::unauthorized("authDigidBased.resolveArtifact.invalidSignature")
        })?;

        let mut referenced_xml = xml[referenced].to_string();
        if let Some(sig_in_ref) = element_range(&referenced_xml, "Signature", 0) {
            referenced_xml.replace_range(sig_in_ref, "");
        }

        let computed = BASE64.encode(Sha256::digest(referenced_xml.as_bytes()));
        if computed != digest_value.trim() {
            return Err(AppError::unauthorized(
                "authDigidBased.resolveArtifact.invalidSignature",
            ));
        }

        seen += 1;
    }

    if seen == 0 {
        return Err(AppError::unauthorized(
            "authDigidBased.resolveArtifact.missingSignature",
        ));
    }
    Ok(())
}

/// All `StatusCode/@Value` attributes in document order.
fn status_code_values(xml: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut cursor = 0;

    while let Some(range) = open_tag_range(xml, "StatusCode", cursor) {
        if let Some(value) = attribute_value(&xml[range.clone()], "Value") {
            values.push(value);
        }
        cursor = range.end;
    }
    values
}

// ── Prefix-agnostic XML scanning helpers ─────────────────────────
//
// The artifact response arrives as delivered; these helpers locate raw
// byte ranges so digests and signatures are computed over exact octets.

fn is_name_boundary(byte: Option<u8>) -> bool {
    matches!(byte, Some(b' ') | Some(b'>') | Some(b'/') | Some(b'\t') | Some(b'\n') | None)
}

/// Range of the opening tag `<[prefix:]local ...>` starting at or after `from`.
fn open_tag_range(xml: &str, local: &str, from: usize) -> Option<Range<usize>> {
    let bytes = xml.as_bytes();
    let mut search = from;

    while let Some(rel) = xml[search..].find('<') {
        let start = search + rel;
        let name_start = start + 1;
        if bytes.get(name_start) == Some(&b'/') {
            search = start + 1;
            continue;
        }

        // Skip an optional namespace prefix.
        let rest = &xml[name_start..];
        let local_start = match rest.find(|c: char| c == ':' || c == ' ' || c == '>' || c == '/') {
            Some(pos) if rest.as_bytes()[pos] == b':' => name_start + pos + 1,
            _ => name_start,
        };

        if xml[local_start..].starts_with(local)
            && is_name_boundary(bytes.get(local_start + local.len()).copied())
        {
            let end = xml[start..].find('>').map(|p| start + p + 1)?;
            return Some(start..end);
        }
        search = start + 1;
    }
    None
}

/// Byte range of a whole element (opening tag through closing tag),
/// ignoring the namespace prefix. Assumes no same-name nesting, which
/// holds for the SAML documents handled here.
fn element_range(xml: &str, local: &str, from: usize) -> Option<Range<usize>> {
    let open = open_tag_range(xml, local, from)?;

    if xml[open.clone()].ends_with("/>") {
        return Some(open);
    }

    let mut cursor = open.end;
    while let Some(rel) = xml[cursor..].find("</") {
        let close_start = cursor + rel;
        let name_start = close_start + 2;
        let close_end = xml[close_start..].find('>').map(|p| close_start + p + 1)?;
        let close_name = &xml[name_start..close_end - 1];
        if close_name == local || close_name.ends_with(&format!(":{local}")) {
            return Some(open.start..close_end);
        }
        cursor = close_start + 2;
    }
    None
}

/// Byte range of the element carrying `ID="<id>"`.
fn element_range_by_id(xml: &str, id: &str) -> Option<Range<usize>> {
    let marker_double = format!("ID=\"{id}\"");
    let pos = xml.find(&marker_double)?;
    let start = xml[..pos].rfind('<')?;

    // Local name of the element owning the attribute.
    let name_end = xml[start + 1..]
        .find(|c: char| c == ' ' || c == '>' || c == '/')
        .map(|p| start + 1 + p)?;
    let full_name = &xml[start + 1..name_end];
    let local = full_name.rsplit(':').next().unwrap_or(full_name);

    element_range(xml, local, start)
}

/// Text content of the first matching element.
fn element_text(xml: &str, local: &str) -> Option<String> {
    let range = element_range(xml, local, 0)?;
    let inner = &xml[range];
    let open_end = inner.find('>')? + 1;
    let close_start = inner.rfind("</")?;
    if open_end > close_start {
        return None;
    }
    Some(inner[open_end..close_start].trim().to_string())
}

/// Value of an attribute inside an opening-tag slice.
fn attribute_value(tag: &str, name: &str) -> Option<String> {
    let marker = format!("{name}=\"");
    let start = tag.find(&marker)? + marker.len();
    let end = tag[start..].find('"')? + start;
    Some(tag[start..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey};

    fn test_keys() -> (RequestSigner, ResponseVerifier) {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
        let public = RsaPublicKey::from(&private);

        let private_pem = private
            .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
            .unwrap()
            .to_string();
        let public_pem = public.to_public_key_pem(rsa::pkcs8::LineEnding::LF).unwrap();

        (
            RequestSigner::from_pem(&private_pem).unwrap(),
            ResponseVerifier::from_pem(&public_pem).unwrap(),
        )
    }

    fn signed_response(signer: &RequestSigner, status: &str, conditions: &str, name_id: &str) -> String {
        let assertion = format!(
            r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="assertion-1" Version="2.0"><saml:Issuer>idp</saml:Issuer><saml:Subject><saml:NameID>{name_id}</saml:NameID></saml:Subject>{conditions}</saml:Assertion>"#,
        );
        let signed_assertion =
            insert_enveloped_signature(&assertion, "assertion-1", signer).unwrap();
        format!(
            r#"<samlp:ArtifactResponse xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol"><samlp:Status><samlp:StatusCode Value="{status}"/></samlp:Status>{signed_assertion}</samlp:ArtifactResponse>"#,
        )
    }

    fn valid_conditions(audience: &str) -> String {
        let not_before = saml_instant(Utc::now() - chrono::Duration::minutes(1));
        let not_after = saml_instant(Utc::now() + chrono::Duration::minutes(5));
        format!(
            r#"<saml:Conditions NotBefore="{not_before}" NotOnOrAfter="{not_after}"><saml:AudienceRestriction><saml:Audience>{audience}</saml:Audience></saml:AudienceRestriction></saml:Conditions>"#,
        )
    }

    #[test]
    fn authn_request_shape() {
        let xml = build_authn_request("req-1", Utc::now(), "https://sp.example", "https://idp.example/sso");
        assert!(xml.starts_with("<samlp:AuthnRequest"));
        assert!(xml.contains(r#"ID="req-1""#));
        assert!(xml.contains("<saml:Issuer>https://sp.example</saml:Issuer>"));
    }

    #[test]
    fn redirect_url_carries_signature() {
        let (signer, _) = test_keys();
        let xml = build_authn_request("req-1", Utc::now(), "sp", "https://idp/sso");
        let url = build_redirect_url("https://idp/sso", &xml, &signer).unwrap();

        assert!(url.starts_with("https://idp/sso?SAMLRequest="));
        assert!(url.contains("&SigAlg="));
        assert!(url.contains("&Signature="));
    }

    #[test]
    fn verified_response_yields_name_id() {
        let (signer, verifier) = test_keys();
        let xml = signed_response(
            &signer,
            STATUS_SUCCESS,
            &valid_conditions("https://sp.example"),
            "s00000000:123456789",
        );

        let parsed =
            parse_artifact_response(&xml, &verifier, "https://sp.example", Utc::now()).unwrap();
        assert_eq!(parsed.name_id, "s00000000:123456789");
    }

    #[test]
    fn tampered_response_is_rejected() {
        let (signer, verifier) = test_keys();
        let xml = signed_response(
            &signer,
            STATUS_SUCCESS,
            &valid_conditions("https://sp.example"),
            "s00000000:123456789",
        );
        let tampered = xml.replace("123456789", "987654321");

        let err = parse_artifact_response(&tampered, &verifier, "https://sp.example", Utc::now())
            .unwrap_err();
        assert_eq!(err.key, "authDigidBased.resolveArtifact.invalidSignature");
    }

    #[test]
    fn status_codes_map_to_error_keys() {
        let (signer, verifier) = test_keys();
        for (status, key) in [
            (STATUS_AUTHN_FAILED, "authDigidBased.resolveArtifact.aborted"),
            (
                STATUS_NO_AUTHN_CONTEXT,
                "authDigidBased.resolveArtifact.insufficientSecurityLevel",
            ),
            (
                STATUS_REQUEST_DENIED,
                "authDigidBased.resolveArtifact.invalidSAMLArt",
            ),
        ] {
            let xml = signed_response(
                &signer,
                status,
                &valid_conditions("https://sp.example"),
                "s00000000:123456789",
            );
            let err = parse_artifact_response(&xml, &verifier, "https://sp.example", Utc::now())
                .unwrap_err();
            assert_eq!(err.key, key);
            assert_eq!(err.status.as_u16(), 401);
        }
    }

    #[test]
    fn unknown_status_is_server_error() {
        let (signer, verifier) = test_keys();
        let xml = signed_response(
            &signer,
            "urn:oasis:names:tc:SAML:2.0:status:Responder",
            &valid_conditions("https://sp.example"),
            "s00000000:123456789",
        );
        let err = parse_artifact_response(&xml, &verifier, "https://sp.example", Utc::now())
            .unwrap_err();
        assert!(err.is_server_error());
    }

    #[test]
    fn expired_conditions_are_rejected() {
        let (signer, verifier) = test_keys();
        let stale = format!(
            r#"<saml:Conditions NotBefore="{}" NotOnOrAfter="{}"><saml:AudienceRestriction><saml:Audience>https://sp.example</saml:Audience></saml:AudienceRestriction></saml:Conditions>"#,
            saml_instant(Utc::now() - chrono::Duration::minutes(10)),
            saml_instant(Utc::now() - chrono::Duration::minutes(5)),
        );
        let xml = signed_response(&signer, STATUS_SUCCESS, &stale, "s00000000:123456789");

        let err = parse_artifact_response(&xml, &verifier, "https://sp.example", Utc::now())
            .unwrap_err();
        assert_eq!(err.key, "authDigidBased.resolveArtifact.expiredAssertion");
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let (signer, verifier) = test_keys();
        let xml = signed_response(
            &signer,
            STATUS_SUCCESS,
            &valid_conditions("https://other.example"),
            "s00000000:123456789",
        );
        let err = parse_artifact_response(&xml, &verifier, "https://sp.example", Utc::now())
            .unwrap_err();
        assert_eq!(err.key, "authDigidBased.resolveArtifact.invalidAudience");
    }
}
