//! Job submission.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use scaleout_pipeline::{PipelineOrchestrator, PipelineResult};

use super::ApiError;
use crate::request::parse_job_request;
use crate::state::AppState;

#[derive(Serialize)]
pub struct JobResponse {
    pub status: &'static str,
    pub data: PipelineResult,
}

/// Run one job to completion and report where its artifacts went.
///
/// Each submission gets its own orchestrator, so concurrent jobs never
/// share a compute session.
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<JobResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let request = parse_job_request(&body, &state.config.compute.default_scales)?;
    info!(job_id = %request.job_id, "job submitted");

    let orchestrator = PipelineOrchestrator::new(
        Arc::clone(&state.storage),
        state.config.compute.clone(),
        &state.config.storage.temp_dir,
    );
    let data = orchestrator.execute(request).await?;

    Ok(Json(JobResponse {
        status: "SUCCESS",
        data,
    }))
}
