use std::sync::Arc;

use crate::agent::AgentClient;
use crate::cv::CvBlobStore;
use crate::jobs::JobCatalog;
use crate::profiles::ProfileRepository;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Job postings, read once at startup.
    pub catalog: Arc<JobCatalog>,
    /// Pluggable profile storage. Default: JsonFileProfileStore.
    pub profiles: Arc<dyn ProfileRepository>,
    pub cvs: CvBlobStore,
    pub agent: AgentClient,
}
