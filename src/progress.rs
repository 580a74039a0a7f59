//! Progress-callback trait for per-unit pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! real-time events as chunks are translated and page images recognized.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a status record, or a terminal progress bar
//! without the library knowing how the host application communicates. The
//! trait is `Send + Sync` because units are processed concurrently.

use std::sync::Arc;

/// Called by the pipeline as it processes each unit of work.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. When `concurrency > 1` the per-unit methods may be
/// called from different tasks simultaneously; implementations must guard
/// shared mutable state (`Mutex`, atomics).
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once after chunking, before any translation call.
    fn on_translation_start(&self, total_chunks: usize) {
        let _ = total_chunks;
    }

    /// Called when one chunk finishes translating (successfully or not).
    ///
    /// `degraded` is true when the chunk exhausted its retries and its
    /// original text was passed through untranslated.
    fn on_chunk_done(&self, index: usize, total_chunks: usize, degraded: bool) {
        let _ = (index, total_chunks, degraded);
    }

    /// Called once before any recognition call, with the image count.
    fn on_recognition_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called when one page image finishes recognition.
    ///
    /// `degraded` is true when the backend call failed and the recognition
    /// was recorded as empty.
    fn on_image_done(&self, page: usize, total_images: usize, degraded: bool) {
        let _ = (page, total_images, degraded);
    }

    /// Called once when the run finishes, with the degraded-unit count.
    fn on_run_complete(&self, degraded_units: usize) {
        let _ = degraded_units;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
