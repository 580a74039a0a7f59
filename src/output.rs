//! Run-level output types: artifacts, statistics, completion status.

use crate::error::UnitError;
use crate::pipeline::extract::ImageRef;
use crate::pipeline::merge::FormulaCandidate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Artifact filename for the translated text. Contract with the service layer.
pub const TRANSLATED_ARTIFACT: &str = "translated_result.md";
/// Artifact filename for the recognized-formula list.
pub const FORMULA_ARTIFACT: &str = "formula_result.md";
/// Artifact filename for the combined table data.
pub const TABLE_ARTIFACT: &str = "table_result.xlsx";
/// Artifact filename for the original text with formulas spliced in.
pub const MERGED_ARTIFACT: &str = "merged_original.md";
/// Subdirectory receiving extracted embedded images.
pub const IMAGE_DIR: &str = "img_result";

/// How a completed run ended.
///
/// A run that returns `Err` from [`crate::run::run_pipeline`] produced no
/// status at all; `Failed` never appears in a returned [`RunOutput`] and
/// exists for callers that persist a status value for aborted runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Every chunk translated and every image recognized without error.
    Full,
    /// At least one chunk passed through untranslated or one image degraded
    /// to an empty recognition.
    Partial,
    /// The run aborted before producing its artifacts.
    Failed,
}

/// Counters describing one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    /// Pages in the source document.
    pub page_count: usize,
    /// Extracted embedded images written to the image directory.
    pub image_count: usize,
    /// Text chunks submitted for translation.
    pub chunk_count: usize,
    /// Chunks that exhausted retries and were passed through untranslated.
    pub degraded_chunks: usize,
    /// Page images submitted for formula recognition.
    pub recognized_images: usize,
    /// Images whose recognition degraded to empty after a backend error.
    pub degraded_images: usize,
    /// Formula candidate spans found in the original text, counting those
    /// past the end of the recognized-formula supply.
    pub candidate_count: usize,
    /// Candidates actually replaced by a recognized formula.
    pub merged_count: usize,
    /// Wall-clock duration of the whole run in milliseconds.
    pub total_duration_ms: u64,
    /// Wall-clock duration of the translation stage in milliseconds.
    pub translate_duration_ms: u64,
    /// Wall-clock duration of the recognition stage in milliseconds.
    pub recognize_duration_ms: u64,
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Full translated text (chunk translations concatenated in order).
    pub translated_text: String,
    /// Original text with recognized formulas spliced over candidate spans.
    ///
    /// Span detection only makes sense against the original text, and no
    /// reliable original-to-translated position mapping exists, so the splice
    /// is performed on the original text and emitted as its own artifact.
    pub merged_original_text: String,
    /// Recognized formulas, one entry per page image in page order.
    /// May contain empty strings (pages without formulas).
    pub formulas: Vec<String>,
    /// Formula candidates matched in the original text (audit artifact).
    pub candidates: Vec<FormulaCandidate>,
    /// Extracted embedded images, in page order.
    pub images: Vec<ImageRef>,
    /// Per-unit errors collected during the run.
    pub unit_errors: Vec<UnitError>,
    /// Directory the artifacts were written to.
    pub result_dir: PathBuf,
    /// Run counters.
    pub stats: RunStats,
    /// Completion status: [`RunStatus::Full`] or [`RunStatus::Partial`].
    pub status: RunStatus,
}

impl RunOutput {
    /// True when any unit degraded during the run.
    pub fn is_partial(&self) -> bool {
        self.status == RunStatus::Partial
    }
}
