//! Signed bearer token handling.
//!
//! Tokens are HS256 JWTs whose payload carries only the expiry and the id
//! of the backing session-token row; everything else lives server-side.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lightbase_core::error::AppError;

/// Claims of a Lightbase bearer token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    exp: i64,
    lightbase: Payload,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    session_token_id: Uuid,
}

/// Signs and verifies the bearer strings handed to clients.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Creates a signer from the shared HMAC secret.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Signs a bearer string for the given session-token row.
    pub fn sign(
        &self,
        session_token_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = Claims {
            exp: expires_at.timestamp(),
            lightbase: Payload { session_token_id },
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::server("server.internal.tokenSign").with_source(e))
    }

    /// Verifies a bearer string and returns the session-token row id.
    ///
    /// Signature or expiry failures are unauthorized, never distinguished
    /// on the wire.
    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AppError::unauthorized("session.load.invalidToken"))?;

        Ok(data.claims.lightbase.session_token_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let signer = TokenSigner::new("test-secret");
        let id = Uuid::new_v4();
        let token = signer.sign(id, Utc::now() + chrono::Duration::minutes(5)).unwrap();
        assert_eq!(signer.verify(&token).unwrap(), id);
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = TokenSigner::new("test-secret");
        let token = signer
            .sign(Uuid::new_v4(), Utc::now() - chrono::Duration::minutes(5))
            .unwrap();
        let err = signer.verify(&token).unwrap_err();
        assert_eq!(err.key, "session.load.invalidToken");
    }

    #[test]
    fn wrong_key_is_rejected() {
        let signer = TokenSigner::new("test-secret");
        let other = TokenSigner::new("other-secret");
        let token = signer
            .sign(Uuid::new_v4(), Utc::now() + chrono::Duration::minutes(5))
            .unwrap();
        assert!(other.verify(&token).is_err());
    }
}
