use crate::error::{IntegrationError, Result};
use reqwest::Client;
use serde::Deserialize;

/// Properties requested for every company.
pub const COMPANY_PROPERTIES: &[&str] = &["name", "domain", "city", "industry", "phone", "state"];

/// Properties of a HubSpot company record that are mapped downstream.
///
/// HubSpot sends `null` for unset properties.
#[derive(Debug, Deserialize)]
pub struct CompanyProperties {
    pub hs_object_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

/// HubSpot company record (`0-2` object).
#[derive(Debug, Deserialize)]
pub struct CompanyRecord {
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    pub properties: CompanyProperties,
}

/// One page of the object listing. Paging cursors are ignored.
#[derive(Debug, Deserialize)]
struct CompanyPage {
    results: Vec<CompanyRecord>,
}

/// HTTP client for the HubSpot CRM objects API.
pub struct HubSpotClient {
    http_client: Client,
    companies_url: String,
}

impl HubSpotClient {
    pub fn new(http_client: Client, companies_url: String) -> Self {
        Self {
            http_client,
            companies_url,
        }
    }

    /// Fetch the first page of companies visible to `access_token`.
    pub async fn list_companies(&self, access_token: &str) -> Result<Vec<CompanyRecord>> {
        let response = self
            .http_client
            .get(&self.companies_url)
            .bearer_auth(access_token)
            .query(&[("properties", COMPANY_PROPERTIES.join(","))])
            .send()
            .await
            .map_err(|e| IntegrationError::Provider(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IntegrationError::Provider(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(status = %status, "HubSpot companies listing failed");
            return Err(IntegrationError::Provider(body));
        }

        let page: CompanyPage = serde_json::from_str(&body).map_err(|e| {
            IntegrationError::Provider(format!("Unexpected companies response: {}", e))
        })?;

        Ok(page.results)
    }
}
