//! HubSpot authorization URL.

use crate::config::HubSpotConfig;

/// Build the consent URL carrying the serialized state.
pub fn build_auth_url(config: &HubSpotConfig, state: &str) -> String {
    let scopes = config.scopes.join(" ");
    format!(
        "{}?client_id={}&redirect_uri={}&scope={}&state={}",
        config.authorization_url,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.redirect_uri),
        urlencoding::encode(&scopes),
        urlencoding::encode(state)
    )
}
