pub mod handlers;
pub mod upload;

pub use upload::{DocumentKind, UploadRejection, MAX_UPLOAD_BYTES};
