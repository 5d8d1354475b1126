use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Complete bridge configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub hubspot: HubSpotConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Origin of the frontend allowed through CORS
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_allowed_origin() -> String {
    "http://localhost:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            allowed_origin: default_allowed_origin(),
        }
    }
}

/// HubSpot OAuth application settings.
///
/// Secrets are normally supplied through the environment, see [`HubSpotConfig::apply_env`].
#[derive(Debug, Clone, Deserialize)]
pub struct HubSpotConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub redirect_uri: String,
    /// Consent page the user is sent to
    #[serde(default = "default_authorization_url")]
    pub authorization_url: String,
    /// Base of the token and CRM endpoints
    #[serde(default = "default_api_domain")]
    pub api_domain: String,
}

fn default_authorization_url() -> String {
    "https://app.hubspot.com/oauth/authorize".to_string()
}

fn default_api_domain() -> String {
    "https://api.hubapi.com".to_string()
}

impl Default for HubSpotConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            scopes: Vec::new(),
            redirect_uri: String::new(),
            authorization_url: default_authorization_url(),
            api_domain: default_api_domain(),
        }
    }
}

impl HubSpotConfig {
    /// Overlay values from environment variables:
    /// - `HUBSPOT_CLIENT_ID`
    /// - `HUBSPOT_CLIENT_SECRET`
    /// - `REQUIRED_SCOPES` (space separated)
    /// - `HUBSPOT_REDIRECT_URI`
    /// - `HUBSPOT_AUTHORIZATION_URL`
    /// - `HUBSPOT_API_DOMAIN`
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HUBSPOT_CLIENT_ID") {
            self.client_id = v;
        }
        if let Some(v) = lookup("HUBSPOT_CLIENT_SECRET") {
            self.client_secret = v;
        }
        if let Some(v) = lookup("REQUIRED_SCOPES") {
            self.scopes = v.split_whitespace().map(str::to_string).collect();
        }
        if let Some(v) = lookup("HUBSPOT_REDIRECT_URI") {
            self.redirect_uri = v;
        }
        if let Some(v) = lookup("HUBSPOT_AUTHORIZATION_URL") {
            self.authorization_url = v;
        }
        if let Some(v) = lookup("HUBSPOT_API_DOMAIN") {
            self.api_domain = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            bail!("HubSpot client_id not set (HUBSPOT_CLIENT_ID)");
        }
        if self.client_secret.is_empty() {
            bail!("HubSpot client_secret not set (HUBSPOT_CLIENT_SECRET)");
        }
        if self.redirect_uri.is_empty() {
            bail!("HubSpot redirect_uri not set (HUBSPOT_REDIRECT_URI)");
        }
        Ok(())
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth/v1/token", self.api_domain.trim_end_matches('/'))
    }

    /// Listing endpoint for company objects (`0-2`).
    pub fn companies_url(&self) -> String {
        format!("{}/crm/v3/objects/0-2", self.api_domain.trim_end_matches('/'))
    }
}

/// Transient store settings
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// How long an issued OAuth state stays valid (seconds)
    #[serde(default = "default_state_ttl")]
    pub state_ttl_seconds: u64,
    /// How long credentials wait for pickup after the callback (seconds)
    #[serde(default = "default_credentials_ttl")]
    pub credentials_ttl_seconds: u64,
    /// How often expired entries are swept from the in-memory store (seconds)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

fn default_state_ttl() -> u64 {
    600
}

fn default_credentials_ttl() -> u64 {
    1800
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            state_ttl_seconds: default_state_ttl(),
            credentials_ttl_seconds: default_credentials_ttl(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval_seconds == 0 {
            bail!("store.sweep_interval_seconds must be at least 1");
        }
        Ok(())
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<AppConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
    let config: AppConfig = toml::from_str(&contents).context("Failed to parse config")?;
    Ok(config)
}
