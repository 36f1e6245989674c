//! Configuration types for attendance-sheet extraction.
//!
//! All behaviour is controlled through [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. The credential lives here too: it is resolved
//! once at the boundary (see [`crate::credential`]) and handed to the
//! pipeline explicitly instead of being read from process-wide state.

use crate::credential::Credential;
use crate::error::AttendanceError;
use crate::progress::ProgressCallback;
use crate::schema::ColumnOrder;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Default provider name passed to `ProviderFactory`.
pub const DEFAULT_PROVIDER: &str = "gemini";
/// Default vision model for the default provider.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
/// Default worksheet name.
pub const DEFAULT_SHEET_NAME: &str = "ChamCong";
/// Default export file-name prefix.
pub const DEFAULT_FILE_PREFIX: &str = "VKT_BangChamCong";

/// Configuration for one image-to-spreadsheet run.
///
/// # Example
/// ```rust
/// use edgequake_attendance::{ColumnOrder, ExtractionConfig};
///
/// let config = ExtractionConfig::builder()
///     .model("gemini-2.0-flash")
///     .sheet_name("ChamCong")
///     .column_order(ColumnOrder::Canonical)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// LLM provider name (e.g. "gemini", "openai", "ollama"). Default: "gemini".
    pub provider_name: String,

    /// LLM model identifier. If None, uses [`default_model_for`] the provider.
    pub model: Option<String>,

    /// API key resolved at the boundary. Required unless `provider` is set
    /// or the provider needs no key.
    pub credential: Option<Credential>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Transcription wants the model to copy marks, not to be creative.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 8192.
    ///
    /// A full month sheet is 35 keys per row; thirty rows of JSON easily
    /// exceed 4 000 tokens, and a truncated array fails to parse.
    pub max_tokens: usize,

    /// Custom extraction instruction. If None, uses the built-in default.
    pub instruction: Option<String>,

    /// Worksheet name in the exported workbook. Default: "ChamCong".
    pub sheet_name: String,

    /// Export file-name prefix; the date is appended. Default: "VKT_BangChamCong".
    pub file_prefix: String,

    /// Header ordering of the exported table. Default: [`ColumnOrder::Observed`].
    pub column_order: ColumnOrder,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Busy-state notifications. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            provider: None,
            provider_name: DEFAULT_PROVIDER.to_string(),
            model: None,
            credential: None,
            temperature: 0.1,
            max_tokens: 8192,
            instruction: None,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            column_order: ColumnOrder::default(),
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("credential", &self.credential)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("sheet_name", &self.sheet_name)
            .field("file_prefix", &self.file_prefix)
            .field("column_order", &self.column_order)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model to request, falling back to the provider's default.
    pub fn model_or_default(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| default_model_for(&self.provider_name))
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl fmt::Debug for ExtractionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractionConfigBuilder {
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.config.credential = Some(credential);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn instruction(mut self, text: impl Into<String>) -> Self {
        self.config.instruction = Some(text.into());
        self
    }

    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.config.sheet_name = name.into();
        self
    }

    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    pub fn column_order(mut self, order: ColumnOrder) -> Self {
        self.config.column_order = order;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, AttendanceError> {
        let c = &self.config;
        validate_sheet_name(&c.sheet_name)?;
        if c.file_prefix.trim().is_empty() {
            return Err(AttendanceError::InvalidConfig(
                "File prefix must not be empty".into(),
            ));
        }
        if c.file_prefix.contains(['/', '\\']) {
            return Err(AttendanceError::InvalidConfig(format!(
                "File prefix must not contain path separators, got '{}'",
                c.file_prefix
            )));
        }
        if c.max_tokens == 0 {
            return Err(AttendanceError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Default vision model for a provider name.
pub fn default_model_for(provider: &str) -> &'static str {
    match provider.to_ascii_lowercase().as_str() {
        "gemini" | "google" => DEFAULT_MODEL,
        "openai" => "gpt-4.1-nano",
        "anthropic" | "claude" => "claude-sonnet-4-20250514",
        "openrouter" => "google/gemini-2.0-flash-001",
        "mistral" => "pixtral-12b-latest",
        "ollama" => "llava",
        _ => DEFAULT_MODEL,
    }
}

/// Excel rejects sheet names that are empty, longer than 31 characters, or
/// contain any of `[ ] : * ? / \`.
fn validate_sheet_name(name: &str) -> Result<(), AttendanceError> {
    if name.is_empty() || name.chars().count() > 31 {
        return Err(AttendanceError::InvalidConfig(format!(
            "Sheet name must be 1–31 characters, got '{name}'"
        )));
    }
    if let Some(bad) = name.chars().find(|c| "[]:*?/\\".contains(*c)) {
        return Err(AttendanceError::InvalidConfig(format!(
            "Sheet name '{name}' contains forbidden character '{bad}'"
        )));
    }
    Ok(())
}
