//! Student Routes
//!
//! - POST /api/students - Store a record
//! - GET /api/students - All records, oldest first
//! - GET /api/top-performers?limit=N - Highest marks first

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{
    CreateStudentRequest, StudentListResponse, StudentResponse, TopPerformersParams,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::record::{validate_submission, MarksPolicy, ValidSubmission};
use crate::store::ApiEnvelope;

pub const STORED_MESSAGE: &str = "Data stored successfully";

pub const DEFAULT_TOP_LIMIT: usize = 5;
pub const MAX_TOP_LIMIT: usize = 100;

/// POST /api/students
pub async fn create_student(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateStudentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<StudentResponse>)> {
    let Json(req) = body?;
    let valid = validate_create_request(&req, state.config.max_name_length)?;

    let created = state.store.create_record(&valid.name, valid.marks).await?;

    tracing::info!(name = %valid.name, marks = valid.marks, "Student record stored");

    let envelope = ApiEnvelope {
        success: true,
        data: created.record,
        message: Some(
            created
                .message
                .unwrap_or_else(|| STORED_MESSAGE.to_string()),
        ),
        error: None,
    };

    Ok((StatusCode::CREATED, Json(envelope)))
}

/// GET /api/students
pub async fn list_students(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<StudentListResponse>> {
    let mut records = state.store.list_records().await?;
    // Stable, so equal timestamps keep store order
    records.sort_by_key(|r| r.created_at);

    Ok(Json(ApiEnvelope::ok(records)))
}

/// GET /api/top-performers
pub async fn top_performers(
    State(state): State<Arc<AppState>>,
    params: Result<Query<TopPerformersParams>, QueryRejection>,
) -> ApiResult<Json<StudentListResponse>> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(DEFAULT_TOP_LIMIT);

    if !(1..=MAX_TOP_LIMIT).contains(&limit) {
        return Err(ApiError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_TOP_LIMIT
        )));
    }

    let records = state.store.top_performers(limit).await?;
    Ok(Json(ApiEnvelope::ok(records)))
}

/// Validate a create request
///
/// Same rules as the form, plus a cap on name length.
fn validate_create_request(
    req: &CreateStudentRequest,
    max_name_length: usize,
) -> ApiResult<ValidSubmission> {
    let name = req.name.as_deref().unwrap_or_default();
    let marks = req.marks_text().unwrap_or_default();

    let valid = validate_submission(name, &marks, MarksPolicy::PERCENT)?;

    if valid.name.chars().count() > max_name_length {
        return Err(ApiError::Validation(format!(
            "Name exceeds maximum length of {} characters",
            max_name_length
        )));
    }

    Ok(valid)
}
