//! HubSpot integration endpoints.
//!
//! - POST /integrations/hubspot/authorize      → consent URL (JSON string)
//! - GET  /integrations/hubspot/oauth2callback → close-window HTML
//! - POST /integrations/hubspot/credentials    → credentials, single-use
//! - POST /integrations/hubspot/load           → integration items

use crate::error::IntegrationError;
use crate::items::{IntegrationItem, ItemFetcher};
use crate::oauth::{CallbackParams, Credentials, HubSpotOAuth};
use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, Method},
    response::{Html, Json},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::debug;

/// Shared application state for the HubSpot API
#[derive(Clone)]
pub struct HubSpotAppState {
    pub oauth: Arc<HubSpotOAuth>,
    pub fetcher: Arc<ItemFetcher>,
}

/// Identifies whose flow a request belongs to
#[derive(Deserialize)]
pub struct PrincipalForm {
    user_id: String,
    org_id: String,
}

#[derive(Deserialize)]
pub struct LoadForm {
    /// Credentials JSON as returned by the credentials endpoint
    credentials: String,
}

/// Create HubSpot API router
pub fn create_hubspot_router(state: HubSpotAppState) -> Router {
    Router::new()
        .route("/integrations/hubspot/authorize", post(authorize))
        .route("/integrations/hubspot/oauth2callback", get(oauth2callback))
        .route("/integrations/hubspot/credentials", post(credentials))
        .route("/integrations/hubspot/load", post(load_items))
        .with_state(Arc::new(state))
}

/// CORS for the frontend that opens the consent popup.
pub fn cors_layer(allowed_origin: &str) -> anyhow::Result<CorsLayer> {
    let origin: HeaderValue = allowed_origin
        .parse()
        .with_context(|| format!("Invalid CORS origin '{}'", allowed_origin))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}

async fn authorize(
    State(state): State<Arc<HubSpotAppState>>,
    Form(form): Form<PrincipalForm>,
) -> Result<Json<String>, IntegrationError> {
    debug!(org_id = %form.org_id, user_id = %form.user_id, "Authorization URL requested");
    let url = state.oauth.authorize(&form.user_id, &form.org_id).await?;
    Ok(Json(url))
}

async fn oauth2callback(
    State(state): State<Arc<HubSpotAppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<&'static str>, IntegrationError> {
    debug!("OAuth callback received");
    let page = state.oauth.handle_callback(params).await?;
    Ok(Html(page))
}

async fn credentials(
    State(state): State<Arc<HubSpotAppState>>,
    Form(form): Form<PrincipalForm>,
) -> Result<Json<Credentials>, IntegrationError> {
    let credentials = state
        .oauth
        .get_credentials(&form.user_id, &form.org_id)
        .await?;
    Ok(Json(credentials))
}

async fn load_items(
    State(state): State<Arc<HubSpotAppState>>,
    Form(form): Form<LoadForm>,
) -> Result<Json<Vec<IntegrationItem>>, IntegrationError> {
    let items = state.fetcher.fetch_items(&form.credentials).await?;
    Ok(Json(items))
}
