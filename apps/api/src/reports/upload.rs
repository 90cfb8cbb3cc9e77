//! Upload validation and storage.
//!
//! Accepted: one multipart field named `file`, PDF/JPEG/PNG, at most
//! `MAX_UPLOAD_BYTES`. Accepted files are written under the upload directory
//! with a generated `<unix-millis>-<random>.<ext>` name.

use std::path::{Path, PathBuf};

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use rand::Rng;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Largest accepted document.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
/// Request body allowance on top of the file for multipart framing and headers.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

const FILE_FIELD: &str = "file";

#[derive(Debug, Error)]
pub enum UploadRejection {
    #[error("No file uploaded")]
    MissingFile,

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("Invalid file type '{0}'. Only PDF, JPEG, and PNG are allowed.")]
    UnsupportedType(String),

    #[error("File exceeds the maximum upload size of {} MiB", .limit_bytes / (1024 * 1024))]
    TooLarge { limit_bytes: usize },

    #[error("Malformed multipart request: {0}")]
    InvalidMultipart(String),
}

impl UploadRejection {
    /// Stable machine-readable code naming the violated constraint.
    pub fn code(&self) -> &'static str {
        match self {
            UploadRejection::MissingFile => "MISSING_FILE",
            UploadRejection::EmptyFile => "EMPTY_FILE",
            UploadRejection::UnsupportedType(_) => "UNSUPPORTED_FILE_TYPE",
            UploadRejection::TooLarge { .. } => "FILE_TOO_LARGE",
            UploadRejection::InvalidMultipart(_) => "INVALID_MULTIPART",
        }
    }

    fn from_multipart(err: MultipartError, limit_bytes: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadRejection::TooLarge { limit_bytes }
        } else {
            UploadRejection::InvalidMultipart(err.body_text())
        }
    }
}

/// The document types the analysis model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Jpeg,
    Png,
}

impl DocumentKind {
    /// Matches a MIME type, ignoring case and parameters. `image/jpg` is treated as JPEG.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/pdf" => Some(DocumentKind::Pdf),
            "image/jpeg" | "image/jpg" => Some(DocumentKind::Jpeg),
            "image/png" => Some(DocumentKind::Png),
            _ => None,
        }
    }

    /// Detects the type from magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        infer::get(bytes).and_then(|t| Self::from_mime(t.mime_type()))
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "jpg" | "jpeg" => Some(DocumentKind::Jpeg),
            "png" => Some(DocumentKind::Png),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Jpeg => "image/jpeg",
            DocumentKind::Png => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Jpeg => "jpg",
            DocumentKind::Png => "png",
        }
    }
}

/// A file part read from the request, not yet validated.
#[derive(Debug)]
pub struct ReceivedFile {
    pub file_name: String,
    pub declared_type: Option<String>,
    pub bytes: Bytes,
}

/// A validated upload ready to be stored.
#[derive(Debug)]
pub struct AcceptedUpload {
    pub file_name: String,
    pub kind: DocumentKind,
    pub bytes: Bytes,
}

/// Reads the `file` field, enforcing `max_bytes` while streaming.
pub async fn read_file_field(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<ReceivedFile, UploadRejection> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadRejection::from_multipart(e, max_bytes))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("upload")
            .to_string();
        let declared_type = field.content_type().map(str::to_string);

        let mut buf = BytesMut::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| UploadRejection::from_multipart(e, max_bytes))?
        {
            if buf.len() + chunk.len() > max_bytes {
                return Err(UploadRejection::TooLarge {
                    limit_bytes: max_bytes,
                });
            }
            buf.extend_from_slice(&chunk);
        }

        return Ok(ReceivedFile {
            file_name,
            declared_type,
            bytes: buf.freeze(),
        });
    }

    Err(UploadRejection::MissingFile)
}

/// Checks emptiness and type. Missing or generic declared types are sniffed.
pub fn validate(file: ReceivedFile) -> Result<AcceptedUpload, UploadRejection> {
    if file.bytes.is_empty() {
        return Err(UploadRejection::EmptyFile);
    }

    let declared = file
        .declared_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("application/octet-stream"));

    let kind = match declared {
        Some(mime) => DocumentKind::from_mime(mime)
            .ok_or_else(|| UploadRejection::UnsupportedType(mime.to_string()))?,
        None => DocumentKind::sniff(&file.bytes).ok_or_else(|| {
            UploadRejection::UnsupportedType(
                file.declared_type
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            )
        })?,
    };

    Ok(AcceptedUpload {
        file_name: file.file_name,
        kind,
        bytes: file.bytes,
    })
}

/// `<unix-millis>-<random>.<ext>`, keeping the original extension when it is plain alphanumeric.
pub fn stored_file_name(original: &str, kind: DocumentKind) -> String {
    let extension = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| kind.extension().to_string());
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{}-{}.{}", Utc::now().timestamp_millis(), suffix, extension)
}

/// Writes the upload into `dir`, never overwriting an existing file.
pub async fn save_upload(dir: &Path, upload: &AcceptedUpload) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(stored_file_name(&upload.file_name, upload.kind));

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await?;
    file.write_all(&upload.bytes).await?;
    file.flush().await?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDF_MAGIC: &[u8] = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n1 0 obj";
    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn received(declared: Option<&str>, bytes: &'static [u8]) -> ReceivedFile {
        ReceivedFile {
            file_name: "labs.pdf".to_string(),
            declared_type: declared.map(String::from),
            bytes: Bytes::from_static(bytes),
        }
    }

    #[test]
    fn test_from_mime_accepts_allowed_types() {
        assert_eq!(DocumentKind::from_mime("application/pdf"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_mime("IMAGE/PNG"), Some(DocumentKind::Png));
        assert_eq!(DocumentKind::from_mime("image/jpg"), Some(DocumentKind::Jpeg));
        assert_eq!(
            DocumentKind::from_mime("image/jpeg; charset=binary"),
            Some(DocumentKind::Jpeg)
        );
        assert_eq!(DocumentKind::from_mime("text/plain"), None);
        assert_eq!(DocumentKind::from_mime("image/gif"), None);
    }

    #[test]
    fn test_sniff_detects_magic_bytes() {
        assert_eq!(DocumentKind::sniff(PDF_MAGIC), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::sniff(PNG_MAGIC), Some(DocumentKind::Png));
        assert_eq!(DocumentKind::sniff(b"hello world"), None);
    }

    #[test]
    fn test_from_extension_is_case_insensitive() {
        assert_eq!(DocumentKind::from_extension("JPEG"), Some(DocumentKind::Jpeg));
        assert_eq!(DocumentKind::from_extension("pdf"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_extension("txt"), None);
    }

    #[test]
    fn test_validate_rejects_text_plain() {
        let err = validate(received(Some("text/plain"), b"hello")).unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_FILE_TYPE");
    }

    #[test]
    fn test_validate_rejects_empty_file() {
        let err = validate(received(Some("application/pdf"), b"")).unwrap_err();
        assert_eq!(err.code(), "EMPTY_FILE");
    }

    #[test]
    fn test_validate_sniffs_octet_stream() {
        let accepted = validate(received(Some("application/octet-stream"), PNG_MAGIC)).unwrap();
        assert_eq!(accepted.kind, DocumentKind::Png);

        let accepted = validate(received(None, PDF_MAGIC)).unwrap();
        assert_eq!(accepted.kind, DocumentKind::Pdf);
    }

    #[test]
    fn test_validate_rejects_unrecognized_octet_stream() {
        let err = validate(received(Some("application/octet-stream"), b"plain text")).unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_FILE_TYPE");
    }

    #[test]
    fn test_stored_file_name_keeps_original_extension() {
        let name = stored_file_name("Blood Test.JPEG", DocumentKind::Jpeg);
        assert!(name.ends_with(".jpeg"), "{name}");
        let (millis, rest) = name.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        let suffix = rest.trim_end_matches(".jpeg");
        assert!(suffix.parse::<u32>().unwrap() < 1_000_000_000);
    }

    #[test]
    fn test_stored_file_name_falls_back_to_kind_extension() {
        assert!(stored_file_name("scan", DocumentKind::Png).ends_with(".png"));
        assert!(stored_file_name("../../etc/passwd.p$f", DocumentKind::Pdf).ends_with(".pdf"));
    }

    #[test]
    fn test_stored_file_names_differ() {
        let a = stored_file_name("a.pdf", DocumentKind::Pdf);
        let b = stored_file_name("a.pdf", DocumentKind::Pdf);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_save_upload_writes_bytes_into_dir() {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().join("uploads");
        let upload = AcceptedUpload {
            file_name: "labs.pdf".to_string(),
            kind: DocumentKind::Pdf,
            bytes: Bytes::from_static(PDF_MAGIC),
        };

        let path = save_upload(&upload_dir, &upload).await.unwrap();

        assert!(path.starts_with(&upload_dir));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), PDF_MAGIC);
    }
}
