//! # edgequake-attendance
//!
//! Turn a photograph of a handwritten attendance sheet (bảng chấm công) into
//! an Excel workbook using Vision Language Models (VLMs).
//!
//! ## Pipeline Overview
//!
//! ```text
//! JPEG/PNG
//!  │
//!  ├─ 1. Input      read local file or download from URL
//!  ├─ 2. Request    base64 image + extraction instruction
//!  ├─ 3. VLM        one call to gemini / gpt-4.1 / claude / …
//!  ├─ 4. Normalise  strip ```json fences, trim the wrapper
//!  ├─ 5. Parse      JSON array → records, or MalformedExtraction
//!  └─ 6. Export     union-of-keys table → XLSX + dated file name
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_attendance::{extract, Credential, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let key = Credential::from_env("gemini").ok_or("set GOOGLE_API_KEY")?;
//!     let config = ExtractionConfig::builder().credential(key).build()?;
//!     let output = extract("sheet.jpg", &config).await?;
//!     std::fs::write(&output.artifact.file_name, &output.artifact.bytes)?;
//!     eprintln!("{} rows", output.result.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `att2xlsx` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod credential;
pub mod display;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod schema;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{default_model_for, ExtractionConfig, ExtractionConfigBuilder};
pub use credential::{resolve_credential, Credential, CredentialPrompt, CredentialSource};
pub use error::{AttendanceError, MalformedExtraction};
pub use extract::{
    extract, extract_from_bytes, extract_sync, extract_to_file, process_response, write_artifact,
    ExtractionOutput,
};
pub use pipeline::export::{build_table, export_file_name, ExportArtifact, Table, XLSX_CONTENT_TYPE};
pub use pipeline::infer::RawResponse;
pub use pipeline::input::{ImagePayload, MediaType};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{ExtractionResult, Record};
pub use schema::ColumnOrder;
