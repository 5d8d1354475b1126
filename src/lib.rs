// Configuration
pub mod config;

// Error taxonomy
pub mod error;

// Transient key-value storage
pub mod store;

// OAuth flow controller
pub mod oauth;

// Company listing and normalization
pub mod items;

// HTTP API
pub mod api;

pub use error::IntegrationError;
pub use items::{IntegrationItem, ItemFetcher};
pub use oauth::{Credentials, HubSpotOAuth};
