use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::models::{Job, ProfileRecord};

/// Read-only list of job postings, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct JobCatalog {
    jobs: Vec<Job>,
}

impl JobCatalog {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self { jobs }
    }

    /// Loads the catalog document. A missing file yields an empty catalog;
    /// a malformed one is a startup error.
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Job catalog {} not found, serving no jobs", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read job catalog {}", path.display()))
            }
        };

        let jobs: Vec<Job> = serde_json::from_slice(&raw)
            .with_context(|| format!("Job catalog {} is not a valid job list", path.display()))?;

        info!("Loaded {} job(s) from {}", jobs.len(), path.display());
        Ok(Self::new(jobs))
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Jobs the profile applied to, in catalog order. Ids that are not in the
    /// catalog are skipped.
    pub fn applied_by(&self, profile: Option<&ProfileRecord>) -> Vec<Job> {
        let Some(profile) = profile else {
            return Vec::new();
        };
        let applied: HashSet<i64> = profile.applied_job_ids.iter().copied().collect();

        self.jobs
            .iter()
            .filter(|job| applied.contains(&job.id))
            .cloned()
            .collect()
    }
}
