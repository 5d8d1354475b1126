use anyhow::{Context, Result};
use hubspot_bridge::api::{cors_layer, create_hubspot_router, HubSpotAppState};
use hubspot_bridge::config::{load_config, AppConfig};
use hubspot_bridge::store::{run_expiry_sweeper, InMemoryStore};
use hubspot_bridge::{HubSpotOAuth, ItemFetcher};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hubspot_bridge=info".into()),
        )
        .init();

    info!("HubSpot bridge starting...");

    let mut config = match std::env::var("HUBSPOT_BRIDGE_CONFIG") {
        Ok(path) => load_config(&path)?,
        Err(_) => AppConfig::default(),
    };
    config.hubspot.apply_env();
    config
        .hubspot
        .validate()
        .context("HubSpot OAuth is not configured")?;
    config.store.validate()?;

    info!(
        bind_addr = %config.server.bind_addr,
        api_domain = %config.hubspot.api_domain,
        redirect_uri = %config.hubspot.redirect_uri,
        "Configuration loaded"
    );

    let store = Arc::new(InMemoryStore::new());
    tokio::spawn(run_expiry_sweeper(
        Arc::clone(&store),
        config.store.sweep_interval_seconds,
    ));

    let oauth = Arc::new(HubSpotOAuth::new(
        Arc::new(config.hubspot.clone()),
        &config.store,
        store,
    ));
    let fetcher = Arc::new(ItemFetcher::new(Arc::clone(&oauth)));

    let router = create_hubspot_router(HubSpotAppState { oauth, fetcher })
        .layer(cors_layer(&config.server.allowed_origin)?);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .context("Failed to bind HTTP listener")?;
    info!(addr = %config.server.bind_addr, "HubSpot bridge listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}
