// crates/server/src/routes/jobs.rs
//! API routes for observing background jobs.
//!
//! - GET  /jobs - List retained jobs
//! - GET  /jobs/{handle}/poll - One poll of the progress protocol
//! - POST /jobs/{handle}/close - Observer abandons the job
//! - POST /jobs/{handle}/detail - Toggle incremental log / fetch failure detail
//!
//! The observer session (cursor + expanded flag) is carried by the client and
//! sent with every request.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use jobwatch_core::ObserverSession;
use jobwatch_types::{DetailResponse, JobHandle, JobSnapshot, PollResult};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

/// Session state the observer sends back on every request.
#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    #[serde(default)]
    pub cursor: usize,
    #[serde(default)]
    pub expanded: bool,
}

impl SessionQuery {
    fn into_session(self, handle: JobHandle) -> ObserverSession {
        ObserverSession::resume(handle, self.cursor, self.expanded)
    }
}

/// Poll result plus the delivered lines rendered as one text block.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    #[serde(flatten)]
    pub result: PollResult,
    pub log_text: String,
}

/// GET /api/jobs - List all retained jobs.
async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobSnapshot>> {
    Json(state.jobs.jobs())
}

/// GET /api/jobs/{handle}/poll - Poll one job.
async fn poll_job(
    State(state): State<Arc<AppState>>,
    Path(handle): Path<String>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Json<PollResponse>> {
    let handle: JobHandle = handle.parse()?;
    let mut session = query.into_session(handle);
    let outcome = state.monitor.poll(&mut session)?;
    let log_text = state.monitor.render_lines(&outcome.new_lines);
    tracing::trace!(job = %handle, cursor = outcome.cursor, finished = outcome.is_finished(), "Poll");
    Ok(Json(PollResponse {
        result: outcome.into(),
        log_text,
    }))
}

/// POST /api/jobs/{handle}/close - The observer stops polling.
async fn close_job(
    State(state): State<Arc<AppState>>,
    Path(handle): Path<String>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<StatusCode> {
    let handle: JobHandle = handle.parse()?;
    state.monitor.close(query.into_session(handle))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/jobs/{handle}/detail - Flip the expanded flag, or return the full
/// failure detail for a failed job.
async fn toggle_detail(
    State(state): State<Arc<AppState>>,
    Path(handle): Path<String>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Json<DetailResponse>> {
    let handle: JobHandle = handle.parse()?;
    let mut session = query.into_session(handle);
    Ok(Json(state.monitor.toggle_detail(&mut session)?))
}

/// Build the jobs router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/{handle}/poll", get(poll_job))
        .route("/jobs/{handle}/close", post(close_job))
        .route("/jobs/{handle}/detail", post(toggle_detail))
}
