//! TOTP primitives shared by the password-OTP and authenticator flows.
//!
//! Both flows use SHA-512, 6 digits, 30-second steps. They differ only in
//! the accepted drift: the email OTP tolerates 11 steps (~5m30s), the
//! authenticator a single step.

use rand::RngCore;
use totp_rs::{Algorithm, TOTP};

use lightbase_core::error::AppError;

/// Accepted drift for the password provider's email OTP.
pub const PASSWORD_OTP_WINDOW: u8 = 11;

/// Accepted drift for authenticator-app TOTP.
pub const AUTHENTICATOR_WINDOW: u8 = 1;

const DIGITS: usize = 6;
const STEP: u64 = 30;

/// Generate a fresh base32-encoded 20-byte secret.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &bytes)
}

fn build(secret_base32: &str, window: u8) -> Result<TOTP, AppError> {
    let secret = base32::decode(base32::Alphabet::Rfc4648 { padding: false }, secret_base32)
        .ok_or_else(|| AppError::server("server.internal.totpSecret"))?;

    TOTP::new(Algorithm::SHA512, DIGITS, window, STEP, secret)
        .map_err(|e| AppError::server("server.internal.totpSecret").with_source(e))
}

/// The current token for a secret. Used when issuing the email OTP.
pub fn current_token(secret_base32: &str) -> Result<String, AppError> {
    let totp = build(secret_base32, 1)?;
    totp.generate_current()
        .map_err(|e| AppError::server("server.internal.totpSecret").with_source(e))
}

/// Check a token against a secret within the given step window.
pub fn verify_token(secret_base32: &str, token: &str, window: u8) -> Result<bool, AppError> {
    let totp = build(secret_base32, window)?;
    totp.check_current(token)
        .map_err(|e| AppError::server("server.internal.totpSecret").with_source(e))
}

/// The otpauth provisioning URL shown during authenticator setup.
pub fn otpauth_url(secret_base32: &str, account: &str, issuer: &str) -> String {
    format!(
        "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA512&digits={}&period={}",
        urlencode(issuer),
        urlencode(account),
        secret_base32,
        urlencode(issuer),
        DIGITS,
        STEP,
    )
}

fn urlencode(input: &str) -> String {
    url::form_urlencoded::byte_serialize(input.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_round_trips() {
        let secret = generate_secret();
        let token = current_token(&secret).unwrap();
        assert_eq!(token.len(), DIGITS);
        assert!(verify_token(&secret, &token, AUTHENTICATOR_WINDOW).unwrap());
    }

    #[test]
    fn drift_tolerance_follows_window() {
        let secret = generate_secret();
        let narrow = build(&secret, AUTHENTICATOR_WINDOW).unwrap();
        let wide = build(&secret, PASSWORD_OTP_WINDOW).unwrap();

        let now = 1_700_000_000u64;
        let stale = narrow.generate(now - 5 * STEP);

        assert!(!narrow.check(&stale, now));
        assert!(wide.check(&stale, now));
    }

    #[test]
    fn otpauth_url_shape() {
        let url = otpauth_url("ABC234", "alice@example.com", "Lightbase");
        assert!(url.starts_with("otpauth://totp/Lightbase:alice%40example.com"));
        assert!(url.contains("algorithm=SHA512"));
    }
}
