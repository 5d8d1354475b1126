//! Error taxonomy for the HubSpot integration.
//!
//! Every variant is terminal for the request that produced it. Nothing in
//! this crate retries.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the OAuth flow, the item fetcher, and the store.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// HubSpot reported an error or answered with an unexpected status/body.
    ///
    /// The message is the provider's own text, passed through untranslated.
    #[error("{0}")]
    Provider(String),

    /// No state was stored for the principal, or its nonce did not match.
    #[error("State does not match.")]
    StateMismatch,

    /// No credentials stored for the principal (including already consumed).
    #[error("No credentials found.")]
    NotFound,

    /// The inbound request was malformed (missing parameter, bad JSON).
    #[error("{0}")]
    InvalidRequest(String),

    /// The key-value store failed.
    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),
}

impl IntegrationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IntegrationError::Provider(_)
            | IntegrationError::StateMismatch
            | IntegrationError::NotFound
            | IntegrationError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            IntegrationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for IntegrationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, IntegrationError>;
