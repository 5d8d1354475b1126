//! Company listing from HubSpot, normalized into integration items.

pub mod api;
pub mod transformer;

use crate::error::{IntegrationError, Result};
use crate::oauth::{Credentials, HubSpotOAuth};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use self::api::HubSpotClient;
use self::transformer::company_to_item;

/// Provider-neutral view of one HubSpot record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationItem {
    pub id: String,
    pub parent_id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub name: Option<String>,
    pub creation_time: String,
    pub last_modified_time: String,
    pub url: Option<String>,
}

/// Loads integration items using credentials handed out by [`HubSpotOAuth`].
pub struct ItemFetcher {
    oauth: Arc<HubSpotOAuth>,
    client: HubSpotClient,
}

impl ItemFetcher {
    pub fn new(oauth: Arc<HubSpotOAuth>) -> Self {
        let client = HubSpotClient::new(
            oauth.http_client().clone(),
            oauth.config().companies_url(),
        );
        Self { oauth, client }
    }

    /// Fetch companies with a serialized credentials blob.
    ///
    /// Expired credentials are refreshed for this call only. The refreshed
    /// tokens are not returned or stored, so the next call with the same blob
    /// refreshes again from the same refresh token.
    pub async fn fetch_items(&self, credentials_blob: &str) -> Result<Vec<IntegrationItem>> {
        let credentials: Credentials = serde_json::from_str(credentials_blob).map_err(|e| {
            IntegrationError::InvalidRequest(format!("Malformed credentials: {}", e))
        })?;

        let credentials = if credentials.is_expired() {
            debug!("Access token expired, refreshing before listing");
            self.oauth.refresh(&credentials).await?
        } else {
            credentials
        };

        let companies = self.client.list_companies(&credentials.access_token).await?;
        let items: Vec<IntegrationItem> = companies.iter().map(company_to_item).collect();

        info!(count = items.len(), "Fetched HubSpot companies");

        Ok(items)
    }
}
