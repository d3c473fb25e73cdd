pub mod blob_store;

pub use blob_store::{CvBlobStore, CvStoreError, CvUpload, StoredCv, MAX_CV_BYTES};
