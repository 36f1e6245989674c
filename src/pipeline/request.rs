//! Request building: image bytes + instruction → `ExtractionRequest`.
//!
//! VLM APIs accept images as base64 payloads embedded in the JSON request
//! body. The photograph is forwarded as-is, without re-encoding: a JPEG
//! stays a JPEG, so no additional compression artefacts are added to faint
//! pencil marks.

use crate::pipeline::input::ImagePayload;
use crate::prompts::DEFAULT_INSTRUCTION;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, ImageData};
use tracing::debug;

/// Everything the inference service needs for one extraction.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// The photograph, base64-encoded and tagged with its media type.
    pub image: ImageData,
    /// The natural-language extraction contract.
    pub instruction: String,
}

impl ExtractionRequest {
    /// Chat layout: the instruction as system message, then a user turn
    /// carrying the image.
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(&self.instruction),
            ChatMessage::user_with_images(
                "Transcribe this attendance sheet.",
                vec![self.image.clone()],
            ),
        ]
    }
}

/// Bind the image to the instruction.
///
/// `instruction` overrides [`DEFAULT_INSTRUCTION`] when given. The image is
/// not validated here; unreadable photographs are the model's problem.
///
/// ## Why `detail: "high"`?
/// Models that tile images (OpenAI) otherwise downscale the sheet to a
/// single 512 px tile, where a 31-column grid of pencil marks is illegible.
pub fn build_request(image: &ImagePayload, instruction: Option<&str>) -> ExtractionRequest {
    let b64 = STANDARD.encode(&image.bytes);
    debug!(
        "Encoded {} ({} bytes → {} bytes base64)",
        image.media_type.mime(),
        image.len(),
        b64.len()
    );

    ExtractionRequest {
        image: ImageData::new(b64, image.media_type.mime()).with_detail("high"),
        instruction: instruction.unwrap_or(DEFAULT_INSTRUCTION).to_string(),
    }
}
