//! OAuth 2.0 authorization code flow against HubSpot.
//!
//! 1. Caller asks for an authorization URL (`authorize`), which stores a state
//!    nonce for the org+user
//! 2. User consents on HubSpot in a popup
//! 3. HubSpot redirects to the callback (`handle_callback`): state is checked,
//!    the code is exchanged, credentials are parked in the store
//! 4. Caller collects the credentials once (`get_credentials`)
//! 5. Expired credentials are refreshed on demand (`refresh`)

mod credentials;
mod exchange;
mod provider;
mod state;

pub use credentials::{is_expired, is_expired_at, unix_now, Credentials};
pub use provider::build_auth_url;
pub use state::{generate_nonce, AuthState};

use crate::config::{HubSpotConfig, StoreConfig};
use crate::error::{IntegrationError, Result};
use crate::store::{KeyKind, KeyValueStore};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Page returned to the consent popup once the callback succeeds. Closing the
/// window is the completion signal the opener waits for.
pub const CLOSE_WINDOW_HTML: &str = r#"<html>
    <script>
        window.close();
    </script>
</html>
"#;

/// OAuth callback query parameters
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Drives the HubSpot OAuth flow for any number of org+user principals.
pub struct HubSpotOAuth {
    config: Arc<HubSpotConfig>,
    state_ttl_seconds: u64,
    credentials_ttl_seconds: u64,
    store: Arc<dyn KeyValueStore>,
    http_client: Client,
}

impl HubSpotOAuth {
    pub fn new(
        config: Arc<HubSpotConfig>,
        store_config: &StoreConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            config,
            state_ttl_seconds: store_config.state_ttl_seconds,
            credentials_ttl_seconds: store_config.credentials_ttl_seconds,
            store,
            http_client: Client::new(),
        }
    }

    pub fn config(&self) -> &HubSpotConfig {
        &self.config
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    /// Issue a state for the principal and return the consent URL.
    ///
    /// A second call for the same org+user replaces the earlier state.
    pub async fn authorize(&self, user_id: &str, org_id: &str) -> Result<String> {
        let auth_state = AuthState::issue(user_id, org_id);
        let encoded = auth_state.encode();

        self.store
            .set(
                &KeyKind::State.key(org_id, user_id),
                &encoded,
                self.state_ttl_seconds,
            )
            .await
            .map_err(IntegrationError::Store)?;

        info!(org_id = %org_id, user_id = %user_id, "Issued OAuth state");

        Ok(build_auth_url(&self.config, &encoded))
    }

    /// Handle HubSpot's redirect and return the close-window page.
    ///
    /// # Errors
    /// * `Provider` - the redirect carried `error`, or the code exchange failed
    /// * `InvalidRequest` - `code` or `state` missing or undecodable
    /// * `StateMismatch` - no state stored for the principal, or nonce differs
    ///
    /// Credentials are stored only when every step succeeds. The stored state
    /// is deleted alongside the exchange whatever the exchange's outcome.
    pub async fn handle_callback(&self, params: CallbackParams) -> Result<&'static str> {
        if let Some(error) = params.error {
            warn!(
                error = %error,
                description = params.error_description.as_deref().unwrap_or(""),
                "OAuth authorization failed"
            );
            return Err(IntegrationError::Provider(error));
        }

        let code = params.code.ok_or_else(|| {
            IntegrationError::InvalidRequest("Missing 'code' parameter".to_string())
        })?;
        let raw_state = params.state.ok_or_else(|| {
            IntegrationError::InvalidRequest("Missing 'state' parameter".to_string())
        })?;

        let received = AuthState::decode(&raw_state)?;
        let org_id = received.org_id.as_str();
        let user_id = received.user_id.as_str();
        let state_key = KeyKind::State.key(org_id, user_id);

        debug!(org_id = %org_id, user_id = %user_id, "Validating OAuth state");

        let saved = self
            .store
            .get(&state_key)
            .await
            .map_err(IntegrationError::Store)?
            .and_then(|raw| serde_json::from_str::<AuthState>(&raw).ok());

        match saved {
            Some(saved) if saved.state == received.state => {}
            _ => {
                warn!(org_id = %org_id, user_id = %user_id, "OAuth state missing or mismatched");
                return Err(IntegrationError::StateMismatch);
            }
        }

        let (exchanged, deleted) = tokio::join!(
            exchange::exchange_code_for_token(&self.http_client, &self.config, &code),
            self.store.delete(&state_key),
        );

        let credentials = exchanged.map_err(|e| {
            warn!(org_id = %org_id, user_id = %user_id, error = %e, "Token exchange failed");
            e
        })?;
        deleted.map_err(IntegrationError::Store)?;

        let blob = serde_json::to_string(&credentials)
            .map_err(|e| IntegrationError::Store(e.into()))?;
        self.store
            .set(
                &KeyKind::Credentials.key(org_id, user_id),
                &blob,
                self.credentials_ttl_seconds,
            )
            .await
            .map_err(IntegrationError::Store)?;

        info!(
            org_id = %org_id,
            user_id = %user_id,
            has_refresh_token = credentials.refresh_token.is_some(),
            "OAuth flow completed successfully"
        );

        Ok(CLOSE_WINDOW_HTML)
    }

    /// Collect the credentials parked by the callback.
    ///
    /// Single-use: the entry is deleted on a successful read, so a second call
    /// without a new callback fails with `NotFound`. Callers that need the
    /// credentials again must keep their own copy.
    pub async fn get_credentials(&self, user_id: &str, org_id: &str) -> Result<Credentials> {
        let key = KeyKind::Credentials.key(org_id, user_id);

        let raw = self
            .store
            .get(&key)
            .await
            .map_err(IntegrationError::Store)?
            .ok_or(IntegrationError::NotFound)?;

        let credentials: Option<Credentials> = serde_json::from_str(&raw).map_err(|e| {
            IntegrationError::Store(anyhow::anyhow!("Stored credentials are unreadable: {}", e))
        })?;
        let credentials = credentials.ok_or(IntegrationError::NotFound)?;

        self.store
            .delete(&key)
            .await
            .map_err(IntegrationError::Store)?;

        debug!(org_id = %org_id, user_id = %user_id, "Credentials handed out");

        Ok(credentials)
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// The result is returned, not stored.
    pub async fn refresh(&self, credentials: &Credentials) -> Result<Credentials> {
        exchange::refresh_access_token(&self.http_client, &self.config, credentials).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use mockito::Server;
    use serde_json::Map;

    fn test_config(api_domain: String) -> HubSpotConfig {
        HubSpotConfig {
            client_id: "cid".to_string(),
            client_secret: "csecret".to_string(),
            scopes: vec!["oauth".to_string(), "crm.objects.companies.read".to_string()],
            redirect_uri: "http://localhost:8000/integrations/hubspot/oauth2callback".to_string(),
            authorization_url: "https://app.hubspot.com/oauth/authorize".to_string(),
            api_domain,
        }
    }

    fn make_flow(api_domain: String) -> (HubSpotOAuth, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let flow = HubSpotOAuth::new(
            Arc::new(test_config(api_domain)),
            &StoreConfig::default(),
            store.clone(),
        );
        (flow, store)
    }

    fn state_from_url(url: &str) -> String {
        let parsed = reqwest::Url::parse(url).unwrap();
        parsed
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    async fn mock_token_endpoint(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/oauth/v1/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"at","refresh_token":"rt","expires_in":1800,"token_type":"bearer"}"#)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_authorize_stores_state_in_url() {
        let (flow, store) = make_flow("http://unused".to_string());

        let url = flow.authorize("user1", "org1").await.unwrap();
        let state = AuthState::decode(&state_from_url(&url)).unwrap();

        assert_eq!(state.user_id, "user1");
        assert_eq!(state.org_id, "org1");

        let stored = store.get("state:org1:user1").await.unwrap().unwrap();
        let stored: AuthState = serde_json::from_str(&stored).unwrap();
        assert_eq!(stored.state, state.state);

        let parsed = reqwest::Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".to_string(), "cid".to_string())));
        assert!(pairs.contains(&(
            "scope".to_string(),
            "oauth crm.objects.companies.read".to_string()
        )));
    }

    #[tokio::test]
    async fn test_callback_error_param_short_circuits() {
        let (flow, store) = make_flow("http://unused".to_string());
        flow.authorize("user1", "org1").await.unwrap();

        let err = flow
            .handle_callback(CallbackParams {
                error: Some("access_denied".to_string()),
                code: Some("code".to_string()),
                state: Some("garbage".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        match err {
            IntegrationError::Provider(msg) => assert_eq!(msg, "access_denied"),
            other => panic!("expected provider error, got {:?}", other),
        }
        // State untouched
        assert!(store.get("state:org1:user1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_callback_missing_code() {
        let (flow, _store) = make_flow("http://unused".to_string());

        let err = flow
            .handle_callback(CallbackParams {
                state: Some("{}".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IntegrationError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_callback_without_stored_state() {
        let mut server = Server::new_async().await;
        let token = server
            .mock("POST", "/oauth/v1/token")
            .expect(0)
            .create_async()
            .await;
        let (flow, _store) = make_flow(server.url());

        let forged = AuthState::issue("user1", "org1").encode();
        let err = flow
            .handle_callback(CallbackParams {
                code: Some("valid-code".to_string()),
                state: Some(forged),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, IntegrationError::StateMismatch));
        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_callback_with_mismatched_nonce() {
        let mut server = Server::new_async().await;
        let token = server
            .mock("POST", "/oauth/v1/token")
            .expect(0)
            .create_async()
            .await;
        let (flow, store) = make_flow(server.url());
        flow.authorize("user1", "org1").await.unwrap();

        let forged = AuthState::issue("user1", "org1").encode();
        let err = flow
            .handle_callback(CallbackParams {
                code: Some("valid-code".to_string()),
                state: Some(forged),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, IntegrationError::StateMismatch));
        token.assert_async().await;
        assert!(store.get("credentials:org1:user1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_successful_callback_persists_credentials() {
        let mut server = Server::new_async().await;
        let token = mock_token_endpoint(&mut server).await;
        let (flow, store) = make_flow(server.url());

        let url = flow.authorize("user1", "org1").await.unwrap();
        let before = unix_now();
        let html = flow
            .handle_callback(CallbackParams {
                code: Some("the-code".to_string()),
                state: Some(state_from_url(&url)),
                ..Default::default()
            })
            .await
            .unwrap();
        let after = unix_now();

        token.assert_async().await;
        assert!(html.contains("window.close()"));
        assert!(store.get("state:org1:user1").await.unwrap().is_none());

        let raw = store.get("credentials:org1:user1").await.unwrap().unwrap();
        let creds: Credentials = serde_json::from_str(&raw).unwrap();
        assert_eq!(creds.access_token, "at");
        assert!(creds.expires_in >= before + 1800.0);
        assert!(creds.expires_in <= after + 1800.0);
        assert_eq!(creds.extra["token_type"], "bearer");
    }

    #[tokio::test]
    async fn test_failed_exchange_still_deletes_state() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/oauth/v1/token")
            .with_status(400)
            .with_body(r#"{"status":"BAD_AUTH_CODE"}"#)
            .create_async()
            .await;
        let (flow, store) = make_flow(server.url());

        let url = flow.authorize("user1", "org1").await.unwrap();
        let err = flow
            .handle_callback(CallbackParams {
                code: Some("expired-code".to_string()),
                state: Some(state_from_url(&url)),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, IntegrationError::Provider(ref m) if m.contains("BAD_AUTH_CODE")));
        assert!(store.get("state:org1:user1").await.unwrap().is_none());
        assert!(store.get("credentials:org1:user1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replayed_callback_rejected() {
        let mut server = Server::new_async().await;
        let _token = mock_token_endpoint(&mut server).await;
        let (flow, _store) = make_flow(server.url());

        let url = flow.authorize("user1", "org1").await.unwrap();
        let params = || CallbackParams {
            code: Some("the-code".to_string()),
            state: Some(state_from_url(&url)),
            ..Default::default()
        };

        flow.handle_callback(params()).await.unwrap();
        let err = flow.handle_callback(params()).await.unwrap_err();
        assert!(matches!(err, IntegrationError::StateMismatch));
    }

    #[tokio::test]
    async fn test_get_credentials_is_single_use() {
        let (flow, store) = make_flow("http://unused".to_string());
        let creds = Credentials {
            access_token: "at".to_string(),
            refresh_token: Some("rt".to_string()),
            expires_in: unix_now() + 600.0,
            extra: Map::new(),
        };
        store
            .set(
                "credentials:org1:user1",
                &serde_json::to_string(&creds).unwrap(),
                1800,
            )
            .await
            .unwrap();

        let first = flow.get_credentials("user1", "org1").await.unwrap();
        assert_eq!(first, creds);

        let second = flow.get_credentials("user1", "org1").await.unwrap_err();
        assert!(matches!(second, IntegrationError::NotFound));
    }

    #[tokio::test]
    async fn test_get_credentials_null_blob() {
        let (flow, store) = make_flow("http://unused".to_string());
        store.set("credentials:org1:user1", "null", 1800).await.unwrap();

        let err = flow.get_credentials("user1", "org1").await.unwrap_err();
        assert!(matches!(err, IntegrationError::NotFound));
    }

    #[tokio::test]
    async fn test_refresh_does_not_touch_store() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/oauth/v1/token")
            .with_status(200)
            .with_body(r#"{"access_token":"fresh","refresh_token":"rt2","expires_in":1800}"#)
            .create_async()
            .await;
        let (flow, store) = make_flow(server.url());

        let stale = Credentials {
            access_token: "stale".to_string(),
            refresh_token: Some("rt".to_string()),
            expires_in: unix_now() - 10.0,
            extra: Map::new(),
        };

        let fresh = flow.refresh(&stale).await.unwrap();
        assert_eq!(fresh.access_token, "fresh");
        assert_eq!(fresh.refresh_token.as_deref(), Some("rt2"));
        assert!(!fresh.is_expired());
        assert!(store.is_empty());
    }
}
