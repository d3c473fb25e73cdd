//! Axum route handlers for the jobs API.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, Request, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::jobs::applications::{applied_jobs, submit_application, submit_cv};
use crate::jobs::form::{is_multipart, multipart_form, CvForm};
use crate::models::{CvRecord, Job, ProfileRecord};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// JSON body for an application without a CV. `jobId` may be a number or a
/// numeric string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub job_id: Option<Value>,
    pub account_label: Option<String>,
}

impl From<ApplyRequest> for CvForm {
    fn from(req: ApplyRequest) -> Self {
        let job_id = match req.job_id {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        CvForm {
            account_label: req.account_label,
            job_id,
            cv: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApplyResponse {
    pub success: bool,
    pub profile: ProfileRecord,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv: Option<CvRecord>,
}

#[derive(Debug, Serialize)]
pub struct UploadCvResponse {
    pub success: bool,
    pub message: String,
    pub cv: CvRecord,
}

#[derive(Debug, Serialize)]
pub struct CvListResponse {
    pub cvs: Vec<CvRecord>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /jobs
pub async fn handle_list_jobs(State(state): State<AppState>) -> Json<Vec<Job>> {
    Json(state.catalog.jobs().to_vec())
}

/// POST /jobs/apply
///
/// Accepts multipart (with an optional `cv` file) or a plain JSON body.
pub async fn handle_apply(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<ApplyResponse>, AppError> {
    let form = if is_multipart(&request) {
        multipart_form(request, &state).await?
    } else {
        match Json::<ApplyRequest>::from_request(request, &state).await {
            Ok(Json(body)) => body.into(),
            // No body at all: fall through to the missing-field check.
            Err(JsonRejection::MissingJsonContentType(_)) => CvForm::default(),
            Err(e) => return Err(AppError::Validation(e.body_text())),
        }
    };

    let outcome = submit_application(state.profiles.clone(), state.cvs.clone(), form).await?;

    let mut message = "Application submitted successfully".to_string();
    if outcome.cv.is_some() {
        message.push_str(" with CV uploaded");
    }

    Ok(Json(ApplyResponse {
        success: true,
        profile: outcome.profile,
        message,
        cv: outcome.cv,
    }))
}

/// GET /jobs/applied/:account_label
pub async fn handle_applied_jobs(
    State(state): State<AppState>,
    Path(account_label): Path<String>,
) -> Result<Json<Vec<Job>>, AppError> {
    let jobs = applied_jobs(state.profiles.as_ref(), &state.catalog, &account_label).await?;
    Ok(Json(jobs))
}

/// POST /jobs/upload-cv
///
/// A non-multipart body is read as an empty form and fails validation.
pub async fn handle_upload_cv(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<UploadCvResponse>, AppError> {
    let form = multipart_form(request, &state).await?;
    let cv = submit_cv(state.profiles.clone(), state.cvs.clone(), form).await?;

    Ok(Json(UploadCvResponse {
        success: true,
        message: "CV uploaded successfully".to_string(),
        cv,
    }))
}

/// GET /jobs/cvs/:account_label
pub async fn handle_list_cvs(
    State(state): State<AppState>,
    Path(account_label): Path<String>,
) -> Result<Json<CvListResponse>, AppError> {
    let cvs = state.profiles.cvs(&account_label).await?;
    Ok(Json(CvListResponse { cvs }))
}

/// GET /jobs/download-cv/:filename
pub async fn handle_download_cv(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let blob = state.cvs.open(&filename).await?;

    Ok((
        [
            (header::CONTENT_TYPE, blob.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", blob.filename),
            ),
        ],
        blob.bytes,
    )
        .into_response())
}
