//! API Module
//!
//! HTTP API layer for the webhook server.

pub mod error;
pub mod status;
pub mod webhook;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status::status).post(webhook::handle_webhook))
        .route("/webhook", post(webhook::handle_webhook))
        .route("/health", get(status::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
