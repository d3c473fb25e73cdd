pub mod job;
pub mod profile;

pub use job::Job;
pub use profile::{CvRecord, ProfileRecord, ProfileSnapshot};
