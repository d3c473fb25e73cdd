// Profile Record Store: per-account applications and CV metadata.
// All mutations go through ProfileRepository — handlers never touch the file.

pub mod store;

pub use store::{JsonFileProfileStore, ProfileRepository, StoreError};
