//! Error types for the edgequake-attendance library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`AttendanceError`] — the run cannot produce a spreadsheet (bad input
//!   file, no credential, provider not configured, export I/O failure).
//!   Returned as `Err(AttendanceError)` from the top-level `extract*`
//!   functions.
//!
//! * [`MalformedExtraction`] — the model answered, but its answer is not a
//!   JSON array of row objects. This is the expected failure mode of an
//!   unreliable generator, so it carries the raw response text for display
//!   and can be matched on its own (`AttendanceError::Malformed`).
//!
//! Inference faults (network, auth, quota) are *not* a variant here: the
//! inference client turns them into sentinel text, which then fails parsing
//! and surfaces as [`MalformedExtraction`] with the fault text as `raw`.

use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::infer::FAULT_PREFIX;

/// All fatal errors returned by the edgequake-attendance library.
#[derive(Debug, Error)]
pub enum AttendanceError {
    // ── Credential errors ─────────────────────────────────────────────────
    /// No API key from the environment, the command line, or the prompt.
    #[error("No API key available for provider '{provider}'.\n{hint}")]
    MissingCredential { provider: String, hint: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes are neither a JPEG nor a PNG image.
    #[error("'{source_name}' is not a JPEG or PNG image\nFirst bytes: {magic:?}")]
    UnsupportedImage { source_name: String, magic: Vec<u8> },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The model response could not be parsed into rows.
    #[error(transparent)]
    Malformed(#[from] MalformedExtraction),

    // ── Export errors ─────────────────────────────────────────────────────
    /// Building the XLSX container failed.
    #[error("Failed to build spreadsheet: {0}")]
    ExportFailed(String),

    /// Could not create or write the output spreadsheet file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<zip::result::ZipError> for AttendanceError {
    fn from(e: zip::result::ZipError) -> Self {
        AttendanceError::ExportFailed(e.to_string())
    }
}

/// The model's response is not a JSON array of flat row objects.
///
/// `raw` is the response exactly as the inference client returned it
/// (before fence stripping), so the user sees what the model really said.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("Could not read the attendance table from this image: {detail}")]
pub struct MalformedExtraction {
    /// Why parsing failed (serde_json message or shape violation).
    pub detail: String,
    /// The untouched inference response.
    pub raw: String,
}

impl MalformedExtraction {
    pub fn new(detail: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            raw: raw.into(),
        }
    }

    /// True when `raw` is the inference client's fault sentinel rather than
    /// model output.
    pub fn is_inference_fault(&self) -> bool {
        self.raw.starts_with(FAULT_PREFIX)
    }
}
