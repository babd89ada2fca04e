//! Response bodies.
//!
//! Composite views (`/auth/me`, summaries, session lists) are assembled as
//! JSON in the handlers; the shapes here are the small fixed ones.

use serde::Serialize;

/// Generic `{success: true}` acknowledgement.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    /// Always true; errors travel through the error body.
    pub success: bool,
}

impl SuccessResponse {
    /// The acknowledgement.
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// A provider redirect URL.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectUrlResponse {
    /// Where the browser should go.
    pub redirect_url: String,
}
