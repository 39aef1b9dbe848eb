//! # Web API
//!
//! Axum router exposing the streaming export endpoint and a health probe.
//! Authorization sits in front of this layer and is not part of this crate.

pub mod errors;
pub mod handlers;
pub mod state;

use axum::routing::get;
use axum::Router;

use state::AppState;

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/export/{type}", get(handlers::export::export_objects))
        .route("/health", get(handlers::health::health))
        .with_state(state)
}
