//! API-key resolution at the application boundary.
//!
//! The key is resolved exactly once per run, before the pipeline starts:
//!
//! 1. **Trusted source** — a value the caller already holds (command-line
//!    flag, the provider's own key variable, a secrets file read by the
//!    host application).
//! 2. **Interactive fallback** — a [`CredentialPrompt`] asks the user.
//!
//! The resolved [`Credential`] is then stored in
//! [`crate::config::ExtractionConfig`]; nothing inside the pipeline reads
//! the environment for it. No key is ever written to disk.

use crate::error::AttendanceError;
use std::fmt;
use tracing::debug;

/// Key variables for the default (Gemini) provider, in lookup order.
pub const CREDENTIAL_ENV_VARS: &[&str] = &["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// An API key for the inference service. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a key. Surrounding whitespace is trimmed; blank keys are `None`.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// First non-blank value among the key variables of `provider`.
    ///
    /// Only reads; the environment is never written. `None` for providers
    /// that take no key.
    pub fn from_env(provider: &str) -> Option<Self> {
        provider_key_vars(provider)
            .iter()
            .find_map(|var| std::env::var(var).ok().and_then(Self::new))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Where the credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Trusted,
    Interactive,
}

/// Interactive collaborator that can ask the user for a key.
pub trait CredentialPrompt {
    /// Ask for the key. `Ok(None)` means the user gave nothing.
    fn prompt(&self, message: &str) -> std::io::Result<Option<String>>;
}

/// Resolve the credential: trusted source first, then the prompt.
///
/// Returns [`AttendanceError::MissingCredential`] when both branches come up
/// empty, so the caller can report it without invoking the pipeline.
pub fn resolve_credential(
    provider: &str,
    trusted: Option<Credential>,
    prompt: Option<&dyn CredentialPrompt>,
) -> Result<(Credential, CredentialSource), AttendanceError> {
    if let Some(c) = trusted {
        debug!("Using API key from trusted source");
        return Ok((c, CredentialSource::Trusted));
    }

    if let Some(p) = prompt {
        let answer = p
            .prompt(&format!("Enter {provider} API key: "))
            .map_err(|e| AttendanceError::Internal(format!("credential prompt: {e}")))?;
        if let Some(c) = answer.and_then(Credential::new) {
            debug!("Using API key from interactive prompt");
            return Ok((c, CredentialSource::Interactive));
        }
    }

    Err(missing_credential(provider))
}

/// The error for a keyed provider with no key.
pub(crate) fn missing_credential(provider: &str) -> AttendanceError {
    let vars = provider_key_vars(provider);
    let hint = if vars.is_empty() {
        "Pass --api-key <KEY>.".to_string()
    } else {
        format!("Set {} or pass --api-key <KEY>.", vars.join(" / "))
    };
    AttendanceError::MissingCredential {
        provider: provider.to_string(),
        hint,
    }
}

/// Key variables the caller may read for `provider`, in lookup order.
///
/// Non-empty exactly for the providers built from an explicit
/// [`Credential`]. Everything else (Ollama, LM Studio, Mistral, Azure, …)
/// is created by edgequake-llm's factory from its own configuration.
pub fn provider_key_vars(provider: &str) -> &'static [&'static str] {
    match provider.to_ascii_lowercase().as_str() {
        "gemini" | "google" => CREDENTIAL_ENV_VARS,
        "openai" => &["OPENAI_API_KEY"],
        "anthropic" | "claude" => &["ANTHROPIC_API_KEY"],
        "openrouter" => &["OPENROUTER_API_KEY"],
        _ => &[],
    }
}

/// Whether `provider` is built from an explicit [`Credential`].
pub fn requires_credential(provider: &str) -> bool {
    !provider_key_vars(provider).is_empty()
}
