//! Extraction entry points: one photograph in, one spreadsheet out.
//!
//! The run is strictly sequential: load → request → infer → normalise →
//! parse → export. The inference call is the only await point that waits on
//! the network; nothing runs in the background and nothing is cached
//! between runs.

use crate::config::ExtractionConfig;
use crate::credential::{missing_credential, requires_credential};
use crate::error::{AttendanceError, MalformedExtraction};
use crate::pipeline::export::{self, ExportArtifact};
use crate::pipeline::infer::{self, RawResponse};
use crate::pipeline::input::{self, ImagePayload};
use crate::pipeline::{normalize, parse, request};
use crate::record::ExtractionResult;
use crate::schema;
use chrono::{Local, NaiveDate};
use edgequake_llm::{
    AnthropicProvider, GeminiProvider, LLMProvider, OpenAIProvider, OpenRouterProvider,
    ProviderFactory,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct ExtractionOutput {
    pub result: ExtractionResult,
    pub artifact: ExportArtifact,
    pub response: RawResponse,
    pub total_duration_ms: u64,
}

/// Read the attendance sheet at `input` (local path or HTTP/HTTPS URL).
///
/// # Errors
/// - input errors (not found, not JPEG/PNG, download failed)
/// - [`AttendanceError::MissingCredential`] before any network call
/// - [`AttendanceError::Malformed`] when the response is not a row array,
///   including when the inference call itself failed
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, AttendanceError> {
    let input_str = input_str.as_ref();
    info!("Starting extraction: {}", input_str);

    // Fail on a missing key before touching the input.
    let prepared = async {
        let provider = resolve_provider(config)?;
        let image = input::resolve_image(input_str, config.download_timeout_secs).await?;
        Ok::<_, AttendanceError>((provider, image))
    }
    .await;
    let (provider, image) = notify_on_error(config, prepared)?;
    run(&provider, &image, config, Local::now().date_naive()).await
}

/// Read an attendance sheet from bytes already in memory (an upload).
pub async fn extract_from_bytes(
    bytes: Vec<u8>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, AttendanceError> {
    let provider = notify_on_error(config, resolve_provider(config))?;
    let image = ImagePayload::from_bytes(bytes, "upload");
    run(&provider, &image, config, Local::now().date_naive()).await
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally and blocks until done.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, AttendanceError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AttendanceError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_str, config))
}

/// Extract and write the workbook into `output_dir` under its dated name.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
/// Returns the written path along with the output.
pub async fn extract_to_file(
    input_str: impl AsRef<str>,
    output_dir: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<(PathBuf, ExtractionOutput), AttendanceError> {
    let output = extract(input_str, config).await?;
    let path = write_artifact(&output.artifact, output_dir.as_ref()).await?;
    Ok((path, output))
}

/// Write `artifact` into `dir`, creating the directory if needed.
pub async fn write_artifact(artifact: &ExportArtifact, dir: &Path) -> Result<PathBuf, AttendanceError> {
    let path = dir.join(&artifact.file_name);
    let write_err = |e: std::io::Error| AttendanceError::OutputWriteFailed {
        path: path.clone(),
        source: e,
    };

    tokio::fs::create_dir_all(dir).await.map_err(write_err)?;

    let tmp_path = path.with_extension("xlsx.tmp");
    tokio::fs::write(&tmp_path, &artifact.bytes)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, &path).await.map_err(write_err)?;

    info!("Wrote {} ({} bytes)", path.display(), artifact.bytes.len());
    Ok(path)
}

/// Normalise and parse a raw response in one step.
///
/// Pure: no network, no clock. Useful for replaying a saved response.
pub fn process_response(raw: &str) -> Result<ExtractionResult, MalformedExtraction> {
    let candidate = normalize::normalize_response(raw);
    parse::parse_records(&candidate, raw)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Stages 2–6 for an already loaded image.
async fn run(
    provider: &Arc<dyn LLMProvider>,
    image: &ImagePayload,
    config: &ExtractionConfig,
    today: NaiveDate,
) -> Result<ExtractionOutput, AttendanceError> {
    let start = Instant::now();
    let cb = config.progress_callback.as_ref();

    if let Some(cb) = cb {
        cb.on_extraction_start(image.len());
    }

    // ── Step 1: Build request ────────────────────────────────────────────
    let req = request::build_request(image, config.instruction.as_deref());

    // ── Step 2: Inference ────────────────────────────────────────────────
    if let Some(cb) = cb {
        cb.on_inference_start(image.len());
    }
    let response = infer::infer(provider, &req, config).await;
    if let Some(cb) = cb {
        cb.on_inference_complete(response.text.len());
    }

    // ── Step 3: Normalise + parse ────────────────────────────────────────
    let result = match process_response(&response.text) {
        Ok(r) => r,
        Err(e) => {
            warn!("Malformed extraction: {}", e.detail);
            if let Some(cb) = cb {
                cb.on_extraction_error(&e.to_string());
            }
            return Err(e.into());
        }
    };
    info!("Extracted {} rows", result.len());
    log_schema_deviations(&result);

    // ── Step 4: Export ───────────────────────────────────────────────────
    let artifact = match export::export(&result, config, today) {
        Ok(a) => a,
        Err(e) => {
            if let Some(cb) = cb {
                cb.on_extraction_error(&e.to_string());
            }
            return Err(e);
        }
    };

    if let Some(cb) = cb {
        cb.on_extraction_complete(result.len());
    }

    Ok(ExtractionOutput {
        result,
        artifact,
        response,
        total_duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Report a failure that happened before [`run`] to the progress callback.
fn notify_on_error<T>(
    config: &ExtractionConfig,
    result: Result<T, AttendanceError>,
) -> Result<T, AttendanceError> {
    if let (Err(e), Some(cb)) = (&result, config.progress_callback.as_ref()) {
        cb.on_extraction_error(&e.to_string());
    }
    result
}

/// Summarise rows that do not match the canonical schema. Never rejects.
fn log_schema_deviations(result: &ExtractionResult) {
    let mut missing_rows = 0;
    let mut unexpected: Vec<String> = Vec::new();
    for record in result {
        let c = schema::conformance(record);
        if !c.missing.is_empty() {
            missing_rows += 1;
        }
        for key in c.unexpected {
            if !unexpected.contains(&key) {
                unexpected.push(key);
            }
        }
    }
    if missing_rows > 0 {
        warn!("{} of {} rows lack some schema fields", missing_rows, result.len());
    }
    if !unexpected.is_empty() {
        warn!("Unexpected columns kept: {}", unexpected.join(", "));
    }
}

/// Resolve the LLM provider for this run.
///
/// 1. **Pre-built provider** (`config.provider`) is used as-is.
/// 2. **Keyed providers** (Gemini, OpenAI, Anthropic, OpenRouter) are built
///    directly from `config.credential`; none is a
///    [`AttendanceError::MissingCredential`]. The environment is not touched.
/// 3. Everything else goes through `ProviderFactory`, which uses the
///    provider's own configuration (local Ollama / LM Studio need none).
fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, AttendanceError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let name = config.provider_name.as_str();
    let model = config.model_or_default();
    debug!("Creating provider {} / {}", name, model);

    if requires_credential(name) {
        let key = config
            .credential
            .as_ref()
            .ok_or_else(|| missing_credential(name))?
            .expose();
        return Ok(keyed_provider(name, key, model));
    }

    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        AttendanceError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn keyed_provider(name: &str, key: &str, model: &str) -> Arc<dyn LLMProvider> {
    match name.to_ascii_lowercase().as_str() {
        "openai" => Arc::new(OpenAIProvider::new(key).with_model(model)),
        "anthropic" | "claude" => Arc::new(AnthropicProvider::new(key).with_model(model)),
        "openrouter" => Arc::new(OpenRouterProvider::new(key).with_model(model)),
        _ => Arc::new(GeminiProvider::new(key).with_model(model)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_response_strips_fences() {
        let raw = "```json\n[{\"stt\":\"1\",\"ma_nv\":\"NV01\",\"ten_nv\":\"Nguyen A\",\"ngay_1\":\"X\",\"tong\":\"26\"}]\n```";
        let r = process_response(raw).unwrap();
        assert_eq!(r.len(), 1);
        assert_eq!(r.records()[0].value("ma_nv"), Some("NV01"));
    }

    #[test]
    fn process_response_fault_is_malformed() {
        let err = process_response("Error: timeout").unwrap_err();
        assert_eq!(err.raw, "Error: timeout");
        assert!(err.is_inference_fault());
    }

    #[test]
    fn keyed_provider_leaves_environment_alone() {
        std::env::set_var("OPENAI_API_KEY", "sk-user-openai");
        let config = ExtractionConfig::builder()
            .provider_name("openai")
            .credential(crate::Credential::new("sk-from-config").unwrap())
            .build()
            .unwrap();
        let provider = resolve_provider(&config).unwrap();
        assert_eq!(provider.model(), "gpt-4.1-nano");
        assert_eq!(std::env::var("OPENAI_API_KEY").unwrap(), "sk-user-openai");
    }

    #[test]
    fn gemini_provider_is_built_from_the_credential() {
        std::env::remove_var("GEMINI_API_KEY");
        let config = ExtractionConfig::builder()
            .credential(crate::Credential::new("AIza-from-config").unwrap())
            .build()
            .unwrap();
        let provider = resolve_provider(&config).unwrap();
        assert_eq!(provider.model(), "gemini-2.0-flash");
        assert!(std::env::var("GEMINI_API_KEY").is_err());
    }

    #[test]
    fn missing_credential_is_reported_before_provider() {
        let config = ExtractionConfig::builder().provider_name("gemini").build().unwrap();
        let err = resolve_provider(&config).err().expect("must fail");
        assert!(matches!(err, AttendanceError::MissingCredential { .. }));
    }

    #[tokio::test]
    async fn extract_from_bytes_without_key_fails_fast() {
        let config = ExtractionConfig::default();
        let err = extract_from_bytes(b"\xFF\xD8\xFF".to_vec(), &config)
            .await
            .err()
            .expect("must fail");
        assert!(matches!(err, AttendanceError::MissingCredential { .. }));
    }

    #[tokio::test]
    async fn write_artifact_creates_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ExportArtifact {
            file_name: "VKT_BangChamCong_20240101.xlsx".into(),
            content_type: export::XLSX_CONTENT_TYPE,
            bytes: b"PK\x03\x04".to_vec(),
        };
        let path = write_artifact(&artifact, &dir.path().join("out")).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "VKT_BangChamCong_20240101.xlsx");
        assert_eq!(std::fs::read(&path).unwrap(), b"PK\x03\x04");
        assert!(!path.with_extension("xlsx.tmp").exists());
    }
}
