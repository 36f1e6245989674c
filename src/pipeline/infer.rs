//! Inference: send the request to the VLM and return its text.
//!
//! One request, one response. There is no retry and no timeout override;
//! rate limits, auth rejections and network errors are not interpreted here.
//! Any fault is folded into a string starting with [`FAULT_PREFIX`] so the
//! next stages always receive text. That text then fails to parse and the
//! user sees it as the raw diagnostic.

use crate::config::ExtractionConfig;
use crate::pipeline::request::ExtractionRequest;
use edgequake_llm::{CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Prefix of the sentinel text returned when the call itself failed.
pub const FAULT_PREFIX: &str = "Error: ";

/// What came back from the inference service.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct RawResponse {
    /// Model text, or `"Error: <fault>"` when the call failed.
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    /// True when `text` is the fault sentinel.
    pub faulted: bool,
}

impl RawResponse {
    /// Build the sentinel response for a failed call.
    pub fn fault(detail: impl std::fmt::Display, duration_ms: u64) -> Self {
        Self {
            text: format!("{FAULT_PREFIX}{detail}"),
            duration_ms,
            faulted: true,
            ..Default::default()
        }
    }
}

/// Run the single chat completion for `request`.
///
/// Never returns an error: see the module docs.
pub async fn infer(
    provider: &Arc<dyn LLMProvider>,
    request: &ExtractionRequest,
    config: &ExtractionConfig,
) -> RawResponse {
    let start = Instant::now();
    let messages = request.messages();
    let options = build_options(config);

    match provider.chat(&messages, Some(&options)).await {
        Ok(response) => {
            let duration = start.elapsed();
            debug!(
                "{} input tokens, {} output tokens, {:?}",
                response.prompt_tokens, response.completion_tokens, duration
            );
            RawResponse {
                text: response.content,
                input_tokens: response.prompt_tokens,
                output_tokens: response.completion_tokens,
                duration_ms: duration.as_millis() as u64,
                faulted: false,
            }
        }
        Err(e) => {
            warn!("Inference call failed — {}", e);
            RawResponse::fault(e, start.elapsed().as_millis() as u64)
        }
    }
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = ExtractionConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(8192));
    }

    #[test]
    fn fault_sentinel_format() {
        let r = RawResponse::fault("timeout", 12);
        assert_eq!(r.text, "Error: timeout");
        assert!(r.faulted);
        assert_eq!(r.output_tokens, 0);
    }
}
