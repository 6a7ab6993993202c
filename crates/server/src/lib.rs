// crates/server/src/lib.rs
//! Jobwatch server library.
//!
//! Axum HTTP surface over the job runner: observers poll a job by handle,
//! carrying their cursor and expanded flag in each request.

pub mod config;
pub mod demo;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use error::*;
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (health, jobs)
/// - CORS for development (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
