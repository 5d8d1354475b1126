//! Anti-forgery state round-tripped through the HubSpot consent redirect.

use crate::error::{IntegrationError, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

/// Bytes of randomness in a nonce
const NONCE_BYTES: usize = 32;

/// State issued for one org+user at authorization time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    /// Random nonce
    pub state: String,
    pub user_id: String,
    pub org_id: String,
}

impl AuthState {
    /// Issue a fresh state with a new nonce.
    pub fn issue(user_id: &str, org_id: &str) -> Self {
        Self {
            state: generate_nonce(),
            user_id: user_id.to_string(),
            org_id: org_id.to_string(),
        }
    }

    /// JSON form, as embedded in the authorization URL and stored.
    pub fn encode(&self) -> String {
        serde_json::json!({
            "state": self.state,
            "user_id": self.user_id,
            "org_id": self.org_id,
        })
        .to_string()
    }

    /// Parse a state received on the callback.
    ///
    /// `raw` has already been query-decoded once and is normally plain JSON,
    /// which is parsed as-is so ids keep every character. Escaped forms
    /// (HTML entities, backslash quotes, a second layer of percent-encoding)
    /// are only undone when plain parsing fails.
    pub fn decode(raw: &str) -> Result<Self> {
        if let Ok(state) = serde_json::from_str(raw) {
            return Ok(state);
        }

        let unescaped = unescape_quotes(raw);
        if let Ok(state) = serde_json::from_str(&unescaped) {
            return Ok(state);
        }

        let percent_decoded = urlencoding::decode(raw)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| raw.to_string());
        serde_json::from_str(&percent_decoded)
            .map_err(|e| IntegrationError::InvalidRequest(format!("Malformed 'state' parameter: {}", e)))
    }
}

/// 32 random bytes from the OS, base64url without padding.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn unescape_quotes(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&amp;", "&")
        .replace("\\\"", "\"")
}
