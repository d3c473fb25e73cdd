//! Application Service — validates submissions and runs them against the
//! CV Blob Store and the Profile Record Store.
//!
//! A submission carrying a CV is validated first, then the blob commit, the
//! profile write and any rollback run together on a spawned task. A caller
//! that goes away mid-request cannot leave a committed blob that no profile
//! references.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::cv::{CvBlobStore, CvUpload, StoredCv};
use crate::errors::AppError;
use crate::jobs::catalog::JobCatalog;
use crate::jobs::form::CvForm;
use crate::models::{CvRecord, Job, ProfileRecord};
use crate::profiles::ProfileRepository;

const MISSING_APPLY_FIELDS: &str = "Missing jobId or accountLabel";

#[derive(Debug)]
pub struct ApplicationOutcome {
    pub profile: ProfileRecord,
    pub cv: Option<CvRecord>,
}

/// Records an application, plus the attached CV if one was uploaded, in a
/// single profile transaction.
pub async fn submit_application(
    profiles: Arc<dyn ProfileRepository>,
    blobs: CvBlobStore,
    form: CvForm,
) -> Result<ApplicationOutcome, AppError> {
    let CvForm {
        account_label,
        job_id,
        cv,
    } = form;

    // An early return drops the pending upload and its partial file with it.
    let (account_label, job_id) = validate_apply_fields(account_label, job_id)?;

    let Some(upload) = cv else {
        let profile = profiles.apply_to_job(&account_label, job_id).await?;
        return Ok(ApplicationOutcome { profile, cv: None });
    };

    run_detached(async move {
        let stored = upload.commit().await?;
        let record = stored.clone().into_record(Some(job_id));
        match profiles
            .apply_with_cv(&account_label, job_id, record.clone())
            .await
        {
            Ok(profile) => {
                info!(
                    "Application of {account_label} to job {job_id} carried CV {}",
                    record.filename
                );
                Ok(ApplicationOutcome {
                    profile,
                    cv: Some(record),
                })
            }
            Err(e) => Err(rollback(&blobs, &stored, e.into()).await),
        }
    })
    .await
}

/// Records a standalone CV upload, optionally tied to a job.
pub async fn submit_cv(
    profiles: Arc<dyn ProfileRepository>,
    blobs: CvBlobStore,
    form: CvForm,
) -> Result<CvRecord, AppError> {
    let CvForm {
        account_label,
        job_id,
        cv,
    } = form;

    let Some(account_label) = non_blank(account_label) else {
        return Err(AppError::Validation("Account label is required".to_string()));
    };
    let Some(upload) = cv else {
        return Err(AppError::Validation("No CV file uploaded".to_string()));
    };
    let job_id = non_blank(job_id).as_deref().map(parse_job_id).transpose()?;

    run_detached(commit_and_record(profiles, blobs, account_label, job_id, upload)).await
}

async fn commit_and_record(
    profiles: Arc<dyn ProfileRepository>,
    blobs: CvBlobStore,
    account_label: String,
    job_id: Option<i64>,
    upload: CvUpload,
) -> Result<CvRecord, AppError> {
    let stored = upload.commit().await?;
    let record = stored.clone().into_record(job_id);
    match profiles.record_cv(&account_label, record.clone()).await {
        Ok(_) => Ok(record),
        Err(e) => Err(rollback(&blobs, &stored, e.into()).await),
    }
}

/// Jobs the account applied to, in catalog order. Empty for unknown accounts.
pub async fn applied_jobs(
    profiles: &dyn ProfileRepository,
    catalog: &JobCatalog,
    account_label: &str,
) -> Result<Vec<Job>, AppError> {
    let profile = profiles.profile(account_label).await?;
    Ok(catalog.applied_by(profile.as_ref()))
}

pub fn parse_job_id(raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::Validation(format!("jobId must be an integer, got '{raw}'")))
}

fn validate_apply_fields(
    account_label: Option<String>,
    job_id: Option<String>,
) -> Result<(String, i64), AppError> {
    let (Some(account_label), Some(job_id)) = (non_blank(account_label), non_blank(job_id)) else {
        return Err(AppError::Validation(MISSING_APPLY_FIELDS.to_string()));
    };
    Ok((account_label, parse_job_id(&job_id)?))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Runs `work` to completion on its own task, whether or not the caller is
/// still waiting for it.
async fn run_detached<T, F>(work: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work)
        .await
        .context("CV transaction task failed")?
}

/// Deletes a committed blob whose profile write failed. A failed delete is
/// logged, not surfaced: the caller is already returning `err`.
async fn rollback(blobs: &CvBlobStore, cv: &StoredCv, err: AppError) -> AppError {
    if let Err(e) = blobs.discard(&cv.filename).await {
        warn!("Failed to discard orphaned CV {}: {e}", cv.filename);
    }
    err
}
