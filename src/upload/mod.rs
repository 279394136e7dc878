//! Document uploads
//!
//! Validation policy, per-identifier progress and storage. The HTTP side
//! lives in `handlers::upload`; the client side in `client`.

mod policy;
mod progress;
mod store;

pub use policy::{normalize_mime, UploadPolicy, UploadRejection};
pub use progress::{ProgressState, ProgressTracker, UploadProgress};
pub use store::{content_hash, is_safe_filename, stored_name_for, FileStore, LocalFileStore};
