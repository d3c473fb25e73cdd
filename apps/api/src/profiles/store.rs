//! Profile Record Store — account label → applied jobs + CV records.
//!
//! The whole mapping lives in one JSON document. Every mutation is a full
//! load → mutate → rewrite cycle, serialized by a per-store mutex and run on
//! a spawned task so caller cancellation cannot split it. The rewrite goes
//! through a same-directory temp file + rename so a concurrent reader only
//! ever sees a complete document.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::models::{CvRecord, ProfileRecord, ProfileSnapshot};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read profile document {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("profile document {} is malformed: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode profile document: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to write profile document {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("profile write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// True when the persisted document could not be read back.
    pub fn is_read_failure(&self) -> bool {
        matches!(self, StoreError::Read { .. } | StoreError::Malformed { .. })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Storage seam for profiles. Handlers only see this trait, so the JSON file
/// can be replaced by another engine without touching callers.
///
/// Carried in `AppState` as `Arc<dyn ProfileRepository>`.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Current snapshot of every profile. Empty if nothing was ever written.
    async fn load(&self) -> Result<ProfileSnapshot, StoreError>;

    /// Adds `job_id` to the account's applications unless already present.
    async fn apply_to_job(
        &self,
        account_label: &str,
        job_id: i64,
    ) -> Result<ProfileRecord, StoreError>;

    /// Appends a CV record. Never deduplicates.
    async fn record_cv(&self, account_label: &str, cv: CvRecord)
        -> Result<ProfileRecord, StoreError>;

    /// Application plus CV upload as one load/persist cycle.
    async fn apply_with_cv(
        &self,
        account_label: &str,
        job_id: i64,
        cv: CvRecord,
    ) -> Result<ProfileRecord, StoreError>;

    async fn profile(&self, account_label: &str) -> Result<Option<ProfileRecord>, StoreError> {
        Ok(self.load().await?.profile(account_label).cloned())
    }

    async fn cvs(&self, account_label: &str) -> Result<Vec<CvRecord>, StoreError> {
        Ok(self
            .profile(account_label)
            .await?
            .map(|p| p.cvs)
            .unwrap_or_default())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// JSON file backend
// ────────────────────────────────────────────────────────────────────────────

/// Cheap to clone; clones share the document and its write lock.
#[derive(Clone)]
pub struct JsonFileProfileStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    /// Held across the whole read-modify-write of a mutation.
    write_lock: Mutex<()>,
}

impl JsonFileProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                path: path.into(),
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// Runs `mutation` against the account's record inside one locked
    /// load → mutate → persist cycle and returns the record as persisted.
    ///
    /// The cycle runs on its own task: dropping the returned future does not
    /// stop it, so a cancelled caller can never release the lock between the
    /// load and the rename.
    async fn mutate<F>(
        &self,
        account_label: String,
        mutation: F,
    ) -> Result<ProfileRecord, StoreError>
    where
        F: FnOnce(&mut ProfileRecord) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _guard = inner.write_lock.lock().await;

            let mut snapshot = inner.read_snapshot().await?;
            let profile = snapshot.profile_mut(&account_label);
            mutation(profile);
            let updated = profile.clone();

            inner.persist(&snapshot).await?;
            Ok::<_, StoreError>(updated)
        })
        .await?
    }
}

impl StoreInner {
    async fn read_snapshot(&self) -> Result<ProfileSnapshot, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ProfileSnapshot::default())
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    async fn persist(&self, snapshot: &ProfileSnapshot) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(snapshot).map_err(StoreError::Encode)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || {
            replace_file(&path, &body).map_err(|source| StoreError::Write { path, source })
        })
        .await??;

        debug!(
            "Persisted {} profile(s) to {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for JsonFileProfileStore {
    async fn load(&self) -> Result<ProfileSnapshot, StoreError> {
        self.inner.read_snapshot().await
    }

    async fn apply_to_job(
        &self,
        account_label: &str,
        job_id: i64,
    ) -> Result<ProfileRecord, StoreError> {
        let label = account_label.to_string();
        let profile = self
            .mutate(account_label.to_string(), move |profile| {
                if !profile.apply(job_id) {
                    debug!("Account {label} already applied to job {job_id}");
                }
            })
            .await?;

        info!("Recorded application of {account_label} to job {job_id}");
        Ok(profile)
    }

    async fn record_cv(
        &self,
        account_label: &str,
        cv: CvRecord,
    ) -> Result<ProfileRecord, StoreError> {
        let filename = cv.filename.clone();
        let profile = self
            .mutate(account_label.to_string(), move |profile| profile.push_cv(cv))
            .await?;

        info!("Recorded CV {filename} for {account_label}");
        Ok(profile)
    }

    async fn apply_with_cv(
        &self,
        account_label: &str,
        job_id: i64,
        cv: CvRecord,
    ) -> Result<ProfileRecord, StoreError> {
        let filename = cv.filename.clone();
        let profile = self
            .mutate(account_label.to_string(), move |profile| {
                profile.apply(job_id);
                profile.push_cv(cv);
            })
            .await?;

        info!("Recorded application of {account_label} to job {job_id} with CV {filename}");
        Ok(profile)
    }
}

/// Writes `body` to a temp file next to `path`, syncs it, then renames it
/// over `path`.
fn replace_file(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(body)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{SubsecRound, Utc};

    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> JsonFileProfileStore {
        JsonFileProfileStore::new(dir.path().join("profiles.json"))
    }

    fn make_cv(filename: &str, job_id: Option<i64>) -> CvRecord {
        CvRecord {
            filename: filename.to_string(),
            original_name: "resume.pdf".to_string(),
            storage_path: format!("uploads/cvs/{filename}"),
            upload_date: Utc::now().trunc_subsecs(3),
            job_id,
            size_bytes: 1024,
        }
    }

    #[tokio::test]
    async fn test_load_without_document_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.len(), 0);
        assert!(!dir.path().join("profiles.json").exists());
    }

    #[tokio::test]
    async fn test_apply_twice_keeps_single_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let first = store.apply_to_job("alice", 1).await.unwrap();
        let second = store.apply_to_job("alice", 1).await.unwrap();
        assert_eq!(first.applied_job_ids, vec![1]);
        assert_eq!(second.applied_job_ids, vec![1]);

        let third = store.apply_to_job("alice", 2).await.unwrap();
        assert_eq!(third.applied_job_ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_accounts_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.apply_to_job("alice", 1).await.unwrap();
        store.apply_to_job("bob", 2).await.unwrap();

        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.profile("alice").unwrap().applied_job_ids, vec![1]);
        assert_eq!(snapshot.profile("bob").unwrap().applied_job_ids, vec![2]);
    }

    #[tokio::test]
    async fn test_recorded_cvs_come_back_in_append_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let first = make_cv("cv-1-a.pdf", None);
        let second = make_cv("cv-2-b.pdf", Some(4));
        let third = make_cv("cv-3-c.pdf", Some(4));
        for cv in [&first, &second, &third] {
            store.record_cv("bob", cv.clone()).await.unwrap();
        }

        let cvs = store.cvs("bob").await.unwrap();
        assert_eq!(cvs, vec![first, second, third]);

        // Uploading a CV does not count as applying.
        let profile = store.profile("bob").await.unwrap().unwrap();
        assert!(profile.applied_job_ids.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_account_has_no_cvs() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.apply_to_job("alice", 1).await.unwrap();

        assert!(store.cvs("nobody").await.unwrap().is_empty());
        assert!(store.profile("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_with_cv_writes_both_parts() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let cv = make_cv("cv-9-z.docx", Some(5));

        let profile = store.apply_with_cv("carol", 5, cv.clone()).await.unwrap();
        assert_eq!(profile.applied_job_ids, vec![5]);
        assert_eq!(profile.cvs, vec![cv.clone()]);

        // Re-applying with another CV keeps the job once but appends the CV.
        let again = make_cv("cv-10-y.pdf", Some(5));
        let profile = store.apply_with_cv("carol", 5, again.clone()).await.unwrap();
        assert_eq!(profile.applied_job_ids, vec![5]);
        assert_eq!(profile.cvs, vec![cv, again]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_applies_lose_no_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));

        let handles: Vec<_> = (1..=32)
            .map(|job_id| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.apply_to_job("alice", job_id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut applied = store
            .profile("alice")
            .await
            .unwrap()
            .unwrap()
            .applied_job_ids;
        applied.sort_unstable();
        assert_eq!(applied, (1..=32).collect::<Vec<i64>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_see_partial_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));
        store.apply_to_job("alice", 0).await.unwrap();

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for job_id in 1..=40 {
                    store.apply_to_job("alice", job_id).await.unwrap();
                }
            })
        };
        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..200 {
                    store.load().await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        writer.await.unwrap();
        reader.await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_document_fails_and_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::write(&path, "{\"alice\": {\"appliedJobs\": [1,").unwrap();
        let store = JsonFileProfileStore::new(&path);

        let err = store.apply_to_job("alice", 2).await.unwrap_err();
        assert!(err.is_read_failure());
        assert!(matches!(err, StoreError::Malformed { .. }));

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk, "{\"alice\": {\"appliedJobs\": [1,");
    }

    #[tokio::test]
    async fn test_persist_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.apply_to_job("alice", 1).await.unwrap();
        store.record_cv("alice", make_cv("cv-1-a.pdf", None)).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_document_is_pretty_printed_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.apply_to_job("alice", 3).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("profiles.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["alice"]["appliedJobs"], serde_json::json!([3]));
        assert!(raw.contains("\n  \"alice\""));
    }

    #[tokio::test]
    async fn test_missing_parent_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileProfileStore::new(dir.path().join("data/nested/profiles.json"));

        store.apply_to_job("alice", 1).await.unwrap();
        assert!(dir.path().join("data/nested/profiles.json").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancelled_callers_do_not_lose_later_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        for round in 0..200i64 {
            let budget = Duration::from_micros((round as u64 % 7) * 50);
            let _ = tokio::time::timeout(budget, store.apply_to_job("victim", round)).await;
            store.apply_to_job("survivor", round).await.unwrap();
        }

        // Abandoned cycles finish on their own; wait for the lock to drain.
        store.apply_to_job("survivor", 200).await.unwrap();

        let snapshot = store.load().await.unwrap();
        let survivor = snapshot.profile("survivor").unwrap();
        assert_eq!(survivor.applied_job_ids, (0..=200).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_non_object_document_is_malformed() {
        for body in ["[]", "\"x\"", "42"] {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("profiles.json");
            std::fs::write(&path, body).unwrap();
            let store = JsonFileProfileStore::new(&path);

            let err = store.load().await.unwrap_err();
            assert!(err.is_read_failure(), "{body} should fail to load");
            assert!(matches!(err, StoreError::Malformed { .. }));

            assert!(store.apply_to_job("alice", 1).await.is_err());
            assert_eq!(std::fs::read_to_string(&path).unwrap(), body);
        }
    }

    #[tokio::test]
    async fn test_rewrite_keeps_account_order_and_drops_duplicate_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::write(
            &path,
            r#"{"zoe": {"appliedJobs": [3, 1, 3]}, "adam": {"appliedJobs": [2, 2]}}"#,
        )
        .unwrap();
        let store = JsonFileProfileStore::new(&path);

        let zoe = store.apply_to_job("zoe", 1).await.unwrap();
        assert_eq!(zoe.applied_job_ids, vec![3, 1]);
        store.apply_to_job("mia", 9).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let zoe_at = raw.find("\"zoe\"").unwrap();
        let adam_at = raw.find("\"adam\"").unwrap();
        let mia_at = raw.find("\"mia\"").unwrap();
        assert!(zoe_at < adam_at && adam_at < mia_at, "{raw}");

        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.profile("adam").unwrap().applied_job_ids, vec![2]);
    }
}
