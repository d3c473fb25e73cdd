//! Multipart form reading for the apply / upload-cv routes.
//!
//! Text fields are collected; the `cv` file field is streamed straight into
//! a pending blob-store upload chunk by chunk, so an oversize upload is cut
//! off without buffering the whole body. The upload stays uncommitted until
//! the application service has validated the rest of the form.

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header;

use crate::cv::{CvBlobStore, CvUpload};
use crate::errors::AppError;
use crate::state::AppState;

pub const CV_FIELD: &str = "cv";

/// Raw submission fields, before validation.
#[derive(Debug, Default)]
pub struct CvForm {
    pub account_label: Option<String>,
    pub job_id: Option<String>,
    pub cv: Option<CvUpload>,
}

/// Reads the whole form. On error the pending upload is dropped, which
/// removes its partial file.
async fn read_cv_form(mut multipart: Multipart, blobs: &CvBlobStore) -> Result<CvForm, AppError> {
    let mut form = CvForm::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            CV_FIELD => {
                // A file input left empty still posts a part with a blank filename.
                let original_name = match field.file_name() {
                    Some(n) if !n.is_empty() => n.to_string(),
                    _ => continue,
                };
                if form.cv.is_some() {
                    return Err(AppError::Validation(
                        "Only one CV file may be uploaded per request".to_string(),
                    ));
                }

                let mut upload = blobs.begin(&original_name, field.content_type()).await?;
                while let Some(chunk) = field.chunk().await? {
                    upload.write_chunk(&chunk).await?;
                }
                form.cv = Some(upload);
            }
            "accountLabel" => form.account_label = Some(field.text().await?),
            "jobId" => form.job_id = Some(field.text().await?),
            _ => {}
        }
    }

    Ok(form)
}

/// Reads a multipart body into a form. Any other body reads as an empty
/// form, which then fails the service's missing-field checks.
pub async fn multipart_form(request: Request, state: &AppState) -> Result<CvForm, AppError> {
    if !is_multipart(&request) {
        return Ok(CvForm::default());
    }
    let multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?;
    read_cv_form(multipart, &state.cvs).await
}

pub fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}
