// Jobs API: catalog serving, applications, CV upload/download.
// Profile writes go through crate::profiles, blob writes through crate::cv.

pub mod applications;
pub mod catalog;
pub mod form;
pub mod handlers;

pub use catalog::JobCatalog;
