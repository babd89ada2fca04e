//! # lightbase-auth
//!
//! Authentication core: the token signer, the revocable session store, the
//! five provider state machines (password, anonymous, DigiD/SAML,
//! Keycloak/OIDC, TOTP), device binding, and the password-route rate
//! limiter.
//!
//! Providers share a tail protocol: invalidate a loaded session, determine
//! the optional two-step state, create a new session with a bound device,
//! and return the signed token pair. See [`providers`].

pub mod device;
pub mod password;
pub mod providers;
pub mod rate_limit;
pub mod session;
pub mod token;
pub mod totp;
