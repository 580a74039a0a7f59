//! Error types for the pdftrans library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PipelineError`] — **Fatal**: the run cannot proceed at all (document
//!   cannot be opened, provider not configured, artifact directory not
//!   writable). Returned as `Err(PipelineError)` from [`crate::run::run_pipeline`].
//!
//! * [`UnitError`] — **Non-fatal**: a single unit of work failed (one text
//!   chunk, one page image) but the rest of the run is fine. Stored inside
//!   the per-unit results so callers can inspect partial success instead of
//!   losing the whole document to one bad backend call.
//!
//! Merge-bounds exhaustion is deliberately *not* an error: once the supply of
//! recognized formulas runs out, remaining formula candidates pass through the
//! merged text unmodified.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdftrans library.
///
/// Unit-level failures use [`UnitError`] and are stored alongside results
/// rather than propagated here.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The document could not be opened or parsed by pdfium.
    ///
    /// Fatal: the pipeline aborts before any artifact is written.
    #[error("Failed to open PDF '{path}': {detail}")]
    DocumentOpen { path: PathBuf, detail: String },

    /// pdfium returned an error while rasterising a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Backend errors ────────────────────────────────────────────────────
    /// The configured LLM provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every chunk failed translation after all retries; output would be empty.
    #[error("All {total} chunks failed after {retries} retries each.\nFirst error: {first_error}")]
    AllChunksFailed {
        total: usize,
        retries: u32,
        first_error: String,
    },

    /// One chunk failed and the config demands strict completion
    /// (`continue_on_chunk_failure = false`).
    #[error("Chunk {index} failed after {retries} retries: {detail}")]
    ChunkFailed {
        index: usize,
        retries: u32,
        detail: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output artifact.
    ///
    /// Artifact-write failures are fatal and never retried; files already
    /// written by the run remain on disk.
    #[error("Failed to write artifact '{path}': {source}")]
    ArtifactWrite {
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

/// A non-fatal error for a single unit of work (one chunk, one page image).
///
/// The overall run continues; the affected chunk is passed through
/// untranslated, the affected image is recorded as an empty recognition.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum UnitError {
    /// Translation of one text chunk failed after retries.
    #[error("Chunk {index}: translation failed after {retries} retries: {detail}")]
    ChunkTranslation {
        index: usize,
        retries: u8,
        detail: String,
    },

    /// Formula recognition for one page image failed.
    #[error("Page image {page}: recognition failed: {detail}")]
    ImageRecognition { page: usize, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_chunks_failed_display() {
        let e = PipelineError::AllChunksFailed {
            total: 4,
            retries: 3,
            first_error: "429".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 4 chunks"), "got: {msg}");
        assert!(msg.contains("429"));
    }

    #[test]
    fn document_open_display() {
        let e = PipelineError::DocumentOpen {
            path: PathBuf::from("a.pdf"),
            detail: "corrupt xref".into(),
        };
        assert!(e.to_string().contains("a.pdf"));
        assert!(e.to_string().contains("corrupt xref"));
    }

    #[test]
    fn chunk_translation_display() {
        let e = UnitError::ChunkTranslation {
            index: 2,
            retries: 3,
            detail: "timeout".into(),
        };
        assert!(e.to_string().contains("Chunk 2"));
        assert!(e.to_string().contains("timeout"));
    }
}
