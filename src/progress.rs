//! Progress-callback trait exposing the pipeline's busy state.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to learn
//! when the single blocking inference call starts and ends, e.g. to show a
//! spinner while the model reads the handwriting.
//!
//! # Example
//!
//! ```rust
//! use edgequake_attendance::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
//!
//! struct Busy(AtomicBool);
//!
//! impl ExtractionProgressCallback for Busy {
//!     fn on_inference_start(&self, _image_bytes: usize) {
//!         self.0.store(true, Ordering::SeqCst);
//!     }
//!     fn on_inference_complete(&self, _response_chars: usize) {
//!         self.0.store(false, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(Busy(AtomicBool::new(false))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extraction pipeline as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The pipeline is sequential, so calls never overlap
/// within one run.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once the image is loaded, before the request is built.
    fn on_extraction_start(&self, image_bytes: usize) {
        let _ = image_bytes;
    }

    /// Called just before the inference request is sent. The pipeline is
    /// busy until [`Self::on_inference_complete`].
    fn on_inference_start(&self, image_bytes: usize) {
        let _ = image_bytes;
    }

    /// Called when the inference call returned, successfully or with a
    /// fault sentinel.
    fn on_inference_complete(&self, response_chars: usize) {
        let _ = response_chars;
    }

    /// Called when records were parsed and the spreadsheet was built.
    fn on_extraction_complete(&self, rows: usize) {
        let _ = rows;
    }

    /// Called when the run ends without a spreadsheet.
    fn on_extraction_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
