// HTTP surface for the HubSpot integration

pub mod hubspot;

pub use hubspot::{cors_layer, create_hubspot_router, HubSpotAppState};
