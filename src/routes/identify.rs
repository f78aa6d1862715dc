use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::job::SetJob;
use crate::models::request::{ErrorBody, IdentifyRequest, IdentifyResponse};
use crate::services::job_store::JobStoreError;

type ApiError = (StatusCode, Json<ErrorBody>);

/// POST /api/identify - start identifying the tracks of a set.
pub async fn submit_identification(
    State(state): State<AppState>,
    Json(request): Json<IdentifyRequest>,
) -> Result<Json<IdentifyResponse>, ApiError> {
    request.validate().map_err(|report| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorBody::new(report.to_string())),
        )
    })?;

    let job_id = state
        .pipeline
        .submit(&request.url, request.segment_duration);

    Ok(Json(IdentifyResponse { job_id }))
}

/// GET /api/status/{job_id} - current snapshot of a job.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<SetJob>, ApiError> {
    match state.jobs.lookup(&job_id) {
        Ok(job) => Ok(Json(SetJob::clone(&job))),
        Err(JobStoreError::NotFound(_)) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorBody::new("Job not found")),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new(e.to_string())),
        )),
    }
}
