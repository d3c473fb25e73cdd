//! CV Blob Store — uploaded CV documents on local disk, addressed by a
//! generated locator (`cv-<unix-millis>-<random><ext>`).
//!
//! Uploads stream into a hidden `.part` file and are renamed to the locator on
//! commit. A dropped or rejected upload removes its partial file, so the
//! directory only ever holds complete documents.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{SubsecRound, Utc};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::CvRecord;

/// Upper bound for a single CV document.
pub const MAX_CV_BYTES: u64 = 5 * 1024 * 1024;

const ALLOWED_CV_TYPES: [&str; 3] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

#[derive(Debug, Error)]
pub enum CvStoreError {
    #[error("Invalid file type '{0}'. Only PDF and DOC/DOCX files are allowed.")]
    UnsupportedType(String),

    #[error("CV exceeds the maximum size of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("CV file not found: {0}")]
    NotFound(String),

    #[error("CV storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A committed upload. Turned into a `CvRecord` once the owning account is known.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCv {
    pub filename: String,
    pub original_name: String,
    pub storage_path: PathBuf,
    pub size_bytes: u64,
}

impl StoredCv {
    pub fn into_record(self, job_id: Option<i64>) -> CvRecord {
        CvRecord {
            filename: self.filename,
            original_name: self.original_name,
            storage_path: self.storage_path.display().to_string(),
            upload_date: Utc::now().trunc_subsecs(3),
            job_id,
            size_bytes: self.size_bytes,
        }
    }
}

/// A stored document read back for download.
#[derive(Debug)]
pub struct CvBlob {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct CvBlobStore {
    dir: PathBuf,
    max_bytes: u64,
}

impl CvBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_bytes: MAX_CV_BYTES,
        }
    }

    #[cfg(test)]
    pub fn with_limit(dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Starts an upload. The declared MIME type is checked before anything
    /// touches the disk.
    pub async fn begin(
        &self,
        original_name: &str,
        content_type: Option<&str>,
    ) -> Result<CvUpload, CvStoreError> {
        let content_type = content_type.unwrap_or_default();
        if !ALLOWED_CV_TYPES.contains(&content_type) {
            warn!("Rejected CV upload '{original_name}' with type '{content_type}'");
            return Err(CvStoreError::UnsupportedType(content_type.to_string()));
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let filename = generate_locator(original_name);
        let partial_path = self.dir.join(format!(".{filename}.part"));
        let file = tokio::fs::File::create(&partial_path).await?;

        debug!("Receiving CV '{original_name}' as {filename}");

        Ok(CvUpload {
            file: Some(file),
            partial_path,
            final_path: self.dir.join(&filename),
            filename,
            original_name: original_name.to_string(),
            written: 0,
            max_bytes: self.max_bytes,
            committed: false,
        })
    }

    pub async fn open(&self, filename: &str) -> Result<CvBlob, CvStoreError> {
        let path = self.locate(filename)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CvStoreError::NotFound(filename.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(CvBlob {
            filename: filename.to_string(),
            content_type: content_type_for(filename),
            bytes: Bytes::from(bytes),
        })
    }

    /// Removes a committed blob whose profile write never happened.
    pub async fn discard(&self, filename: &str) -> Result<(), CvStoreError> {
        let path = self.locate(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Discarded CV {filename}");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolves a locator inside the CV directory. Anything that is not a
    /// single visible path component is treated as absent.
    fn locate(&self, filename: &str) -> Result<PathBuf, CvStoreError> {
        let is_plain = !filename.is_empty()
            && !filename.starts_with('.')
            && !filename.contains(['/', '\\', '\0']);
        if !is_plain {
            return Err(CvStoreError::NotFound(filename.to_string()));
        }
        Ok(self.dir.join(filename))
    }
}

/// An in-flight upload. Bytes go to a hidden partial file until `commit`;
/// dropping it uncommitted removes that file.
#[derive(Debug)]
pub struct CvUpload {
    file: Option<tokio::fs::File>,
    partial_path: PathBuf,
    final_path: PathBuf,
    filename: String,
    original_name: String,
    written: u64,
    max_bytes: u64,
    committed: bool,
}

impl CvUpload {
    /// Appends a chunk. Fails as soon as the running total passes the limit.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), CvStoreError> {
        let total = self.written + chunk.len() as u64;
        if total > self.max_bytes {
            warn!(
                "CV '{}' exceeded {} bytes, aborting upload",
                self.original_name, self.max_bytes
            );
            return Err(CvStoreError::TooLarge {
                limit: self.max_bytes,
            });
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| std::io::Error::other("upload already closed"))?;
        file.write_all(chunk).await?;
        self.written = total;
        Ok(())
    }

    pub async fn commit(mut self) -> Result<StoredCv, CvStoreError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        tokio::fs::rename(&self.partial_path, &self.final_path).await?;
        self.committed = true;

        info!(
            "Stored CV {} ({} bytes, original '{}')",
            self.filename, self.written, self.original_name
        );

        Ok(StoredCv {
            filename: std::mem::take(&mut self.filename),
            original_name: std::mem::take(&mut self.original_name),
            storage_path: self.final_path.clone(),
            size_bytes: self.written,
        })
    }
}

impl Drop for CvUpload {
    fn drop(&mut self) {
        if !self.committed {
            drop(self.file.take());
            let _ = std::fs::remove_file(&self.partial_path);
        }
    }
}

/// `cv-<unix-millis>-<12 hex chars><.ext>`. The extension is kept only when it
/// is a short alphanumeric suffix.
fn generate_locator(original_name: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    format!(
        "cv-{}-{}{}",
        Utc::now().timestamp_millis(),
        &suffix[..12],
        ext
    )
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => ALLOWED_CV_TYPES[0],
        Some("doc") => ALLOWED_CV_TYPES[1],
        Some("docx") => ALLOWED_CV_TYPES[2],
        _ => "application/octet-stream",
    }
}
