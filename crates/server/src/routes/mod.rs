//! API route handlers for the jobwatch server.

pub mod health;
pub mod jobs;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check
/// - GET  /api/jobs - List retained jobs
/// - GET  /api/jobs/{handle}/poll?cursor=&expanded= - Poll one job
/// - POST /api/jobs/{handle}/close - Observer abandons the job
/// - POST /api/jobs/{handle}/detail?expanded= - Toggle detail / fetch failure detail
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", jobs::router())
        .with_state(state)
}
