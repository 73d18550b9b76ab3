//! Job posting and bidding handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use gig_models::{CreateJobRequest, Job, JobId, JobView, SubmitBidRequest};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Post a job owned by the caller.
pub async fn create_job(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    let job = state.catalog.create_job(&user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// List every job with client and bidders resolved.
pub async fn list_jobs(State(state): State<AppState>) -> ApiResult<Json<Vec<JobView>>> {
    Ok(Json(state.catalog.list_jobs().await?))
}

/// Get one job with client and bidders resolved.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobView>> {
    Ok(Json(state.catalog.get_job(&JobId::from_string(job_id)).await?))
}

/// Bid on a job as the caller.
pub async fn submit_bid(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<String>,
    ApiJson(request): ApiJson<SubmitBidRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .ledger
        .submit_bid(&JobId::from_string(job_id), &user.user_id, request)
        .await?;

    Ok(Json(MessageResponse {
        message: "Bid submitted successfully".to_string(),
    }))
}
