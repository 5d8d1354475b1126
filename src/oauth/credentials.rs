//! Token set returned by HubSpot, with expiry held as an absolute timestamp.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// OAuth credentials handed to callers after the callback.
///
/// `expires_in` keeps HubSpot's field name but holds the absolute expiry as
/// Unix seconds. It is rewritten from the provider's relative value as soon as
/// a token response arrives. Any other fields HubSpot returns (`token_type`,
/// ...) ride along untouched in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Absolute expiry (Unix seconds)
    pub expires_in: f64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credentials {
    pub fn is_expired(&self) -> bool {
        is_expired(self.expires_in)
    }
}

/// Current time as fractional Unix seconds.
pub fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// True once `expires_at` has been reached. Equality counts as expired.
pub fn is_expired(expires_at: f64) -> bool {
    is_expired_at(expires_at, unix_now())
}

pub fn is_expired_at(expires_at: f64, now: f64) -> bool {
    now >= expires_at
}
