//! Token endpoint calls: code exchange and refresh.

use super::credentials::{unix_now, Credentials};
use crate::config::HubSpotConfig;
use crate::error::{IntegrationError, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Token endpoint response. `expires_in` is relative (seconds from now).
#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: f64,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TokenResponse {
    fn into_credentials(self, now: f64) -> Credentials {
        Credentials {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_in: now + self.expires_in,
            extra: self.extra,
        }
    }
}

/// Exchange an authorization code for credentials.
///
/// # Returns
/// * `Ok(Credentials)` - Tokens with absolute expiry
/// * `Err(Provider)` - Transport failure, non-2xx status (body passed through),
///   or a body without the expected token fields
pub async fn exchange_code_for_token(
    client: &Client,
    config: &HubSpotConfig,
    code: &str,
) -> Result<Credentials> {
    tracing::debug!("Exchanging authorization code for token");

    let form = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ];

    let response = request_token(client, &config.token_url(), &form).await?;

    tracing::debug!(
        has_refresh_token = response.refresh_token.is_some(),
        expires_in = response.expires_in,
        "Token exchange successful"
    );

    Ok(response.into_credentials(unix_now()))
}

/// Mint a new access token from the refresh token in `credentials`.
///
/// Nothing is persisted. If HubSpot omits `refresh_token` from the response,
/// the previous one is kept.
pub async fn refresh_access_token(
    client: &Client,
    config: &HubSpotConfig,
    credentials: &Credentials,
) -> Result<Credentials> {
    let refresh_token = credentials.refresh_token.as_deref().ok_or_else(|| {
        IntegrationError::InvalidRequest("Credentials carry no refresh_token".to_string())
    })?;

    tracing::debug!("Refreshing access token");

    let form = [
        ("grant_type", "refresh_token"),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("refresh_token", refresh_token),
    ];

    let response = request_token(client, &config.token_url(), &form).await?;
    let mut refreshed = response.into_credentials(unix_now());
    if refreshed.refresh_token.is_none() {
        refreshed.refresh_token = Some(refresh_token.to_string());
    }

    Ok(refreshed)
}

async fn request_token(
    client: &Client,
    token_url: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse> {
    let response = client
        .post(token_url)
        .header("Accept", "application/json")
        .form(form)
        .send()
        .await
        .map_err(|e| IntegrationError::Provider(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| IntegrationError::Provider(e.to_string()))?;

    if !status.is_success() {
        tracing::warn!(status = %status, "Token endpoint returned an error");
        return Err(IntegrationError::Provider(body));
    }

    serde_json::from_str(&body).map_err(|e| {
        IntegrationError::Provider(format!("Unexpected token response: {}", e))
    })
}
