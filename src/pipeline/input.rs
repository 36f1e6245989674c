//! Input resolution: turn a user-supplied path or URL into image bytes.
//!
//! The whole photograph is held in memory; nothing is written to disk.
//! Files and downloads are checked for JPEG/PNG magic bytes so a wrong file
//! fails here with a clear message instead of as a confusing model reply.
//! In-memory uploads ([`ImagePayload::from_bytes`]) are not checked: the
//! upload collaborator already filtered them.

use crate::error::AttendanceError;
use image::ImageFormat;
use std::path::PathBuf;
use tracing::{debug, info};

/// Media type declared to the inference service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Jpeg,
    Png,
}

impl MediaType {
    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
        }
    }

    /// Sniff the media type from magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes) {
            Ok(ImageFormat::Jpeg) => Some(MediaType::Jpeg),
            Ok(ImageFormat::Png) => Some(MediaType::Png),
            _ => None,
        }
    }
}

/// Raw image bytes tagged with their media type.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
    /// File name or URL, for log lines and error messages.
    pub source_name: String,
}

impl ImagePayload {
    /// Wrap bytes from an upload. Unknown formats are declared as JPEG.
    pub fn from_bytes(bytes: Vec<u8>, source_name: impl Into<String>) -> Self {
        let media_type = MediaType::sniff(&bytes).unwrap_or(MediaType::Jpeg);
        Self {
            bytes,
            media_type,
            source_name: source_name.into(),
        }
    }

    /// Wrap bytes, rejecting anything that is not a JPEG or PNG.
    pub fn checked(bytes: Vec<u8>, source_name: impl Into<String>) -> Result<Self, AttendanceError> {
        let source_name = source_name.into();
        match MediaType::sniff(&bytes) {
            Some(media_type) => Ok(Self {
                bytes,
                media_type,
                source_name,
            }),
            None => Err(AttendanceError::UnsupportedImage {
                magic: bytes.iter().take(4).copied().collect(),
                source_name,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to image bytes.
///
/// If the input is a URL, download it into memory.
/// If the input is a local file, read it.
pub async fn resolve_image(input: &str, timeout_secs: u64) -> Result<ImagePayload, AttendanceError> {
    if input.trim().is_empty() {
        return Err(AttendanceError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<ImagePayload, AttendanceError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(AttendanceError::PermissionDenied { path });
        }
        Err(_) => return Err(AttendanceError::FileNotFound { path }),
    };

    let payload = ImagePayload::checked(bytes, path.display().to_string())?;
    debug!(
        "Resolved local image: {} ({} bytes, {})",
        path.display(),
        payload.len(),
        payload.media_type.mime()
    );
    Ok(payload)
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ImagePayload, AttendanceError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AttendanceError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            AttendanceError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            AttendanceError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(AttendanceError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AttendanceError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    ImagePayload::checked(bytes.to_vec(), url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/sheet.jpg"));
        assert!(is_url("http://example.com/sheet.png"));
        assert!(!is_url("/tmp/sheet.jpg"));
        assert!(!is_url("sheet.jpg"));
        assert!(!is_url(""));
    }

    #[test]
    fn sniffs_png_and_jpeg() {
        assert_eq!(MediaType::sniff(PNG_MAGIC), Some(MediaType::Png));
        assert_eq!(MediaType::sniff(JPEG_MAGIC), Some(MediaType::Jpeg));
        assert_eq!(MediaType::sniff(b"%PDF-1.7"), None);
    }

    #[test]
    fn from_bytes_defaults_to_jpeg() {
        let p = ImagePayload::from_bytes(b"not an image".to_vec(), "upload");
        assert_eq!(p.media_type, MediaType::Jpeg);
        assert_eq!(p.media_type.mime(), "image/jpeg");
    }

    #[test]
    fn checked_rejects_unknown_bytes() {
        let err = ImagePayload::checked(b"GIF89a....".to_vec(), "scan.gif").unwrap_err();
        match err {
            AttendanceError::UnsupportedImage { source_name, magic } => {
                assert_eq!(source_name, "scan.gif");
                assert_eq!(magic, b"GIF8".to_vec());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = resolve_image("/definitely/not/here.jpg", 5).await.unwrap_err();
        assert!(matches!(err, AttendanceError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn reads_local_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.png");
        std::fs::write(&path, PNG_MAGIC).unwrap();
        let payload = resolve_image(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(payload.media_type, MediaType::Png);
        assert_eq!(payload.len(), PNG_MAGIC.len());
    }
}
