//! The orchestrator: sequence the pipeline stages over one document and write
//! the output artifacts.
//!
//! A run is a linear pipeline, no state machine:
//! extract → tables → rasterise (unless images were rendered externally) →
//! recognize → chunk → translate → merge → write artifacts. It either
//! completes writing all artifacts or aborts; files already written remain on
//! disk, and the next run overwrites them unconditionally.
//!
//! ## Why merge against the original text
//!
//! Formula spans are detected by a "non-CJK run containing `=`" heuristic,
//! which is only meaningful against the pre-translation text. There is no
//! reliable position mapping from original to translated text, so the splice
//! is performed on the original text and written as its own artifact next to
//! the pure translation — the pipeline never guesses positions inside
//! translated prose.

use crate::backend::{
    resolve_provider, FormulaRecognitionBackend, LlmFormulaBackend, LlmTranslationBackend,
    TranslationBackend,
};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::output::{
    RunOutput, RunStats, RunStatus, FORMULA_ARTIFACT, MERGED_ARTIFACT, TABLE_ARTIFACT,
    TRANSLATED_ARTIFACT,
};
use crate::pipeline::{chunk, extract, merge, recognize, render, tables, translate};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// The two backend capabilities a run needs.
///
/// Production code builds this from the config via
/// [`PipelineBackends::from_config`]; tests construct it directly from fakes.
pub struct PipelineBackends {
    pub translation: Arc<dyn TranslationBackend>,
    pub recognition: Arc<dyn FormulaRecognitionBackend>,
}

impl PipelineBackends {
    /// Resolve both backends from the config's provider settings.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let translation_provider =
            resolve_provider(config, config.translation_model.as_deref())?;
        let recognition_provider =
            resolve_provider(config, config.recognition_model.as_deref())?;

        Ok(Self {
            translation: Arc::new(LlmTranslationBackend::new(
                translation_provider,
                config.temperature,
                config.max_tokens,
            )),
            recognition: Arc::new(LlmFormulaBackend::new(
                recognition_provider,
                config.temperature,
                config.max_tokens,
            )),
        })
    }
}

/// Translate one PDF document end to end, resolving backends from the config.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Returns `Err(PipelineError)` only for fatal errors (document cannot be
/// opened, no provider configured, every chunk failed, artifact write
/// failure). Per-unit degradation surfaces as [`RunStatus::Partial`] in the
/// returned output instead.
pub async fn run_pipeline(
    pdf_path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<RunOutput, PipelineError> {
    let backends = PipelineBackends::from_config(config)?;
    run_pipeline_with_backends(pdf_path, config, &backends).await
}

/// Like [`run_pipeline`], but with caller-supplied backends.
pub async fn run_pipeline_with_backends(
    pdf_path: impl AsRef<Path>,
    config: &PipelineConfig,
    backends: &PipelineBackends,
) -> Result<RunOutput, PipelineError> {
    let total_start = Instant::now();
    let pdf_path = pdf_path.as_ref();
    info!("Starting translation run: {}", pdf_path.display());

    // ── Step 1: Extract text and embedded images ─────────────────────────
    // Fatal on open failure; aborts before any artifact is written.
    let document = extract::extract_document(pdf_path, &config.result_dir).await?;
    info!(
        "Extracted {} chars of text, {} embedded images, {} pages",
        document.full_text.len(),
        document.images.len(),
        document.page_count
    );

    // ── Step 2: Tables ───────────────────────────────────────────────────
    let detected = tables::detect_tables(&document.full_text);
    tables::write_xlsx(&detected, &config.result_dir.join(TABLE_ARTIFACT))?;

    // ── Step 3: Page images for recognition ──────────────────────────────
    // Externally rendered images win; otherwise rasterise into a temp dir
    // that lives until the end of the run.
    let mut _rendered_dir_guard: Option<tempfile::TempDir> = None;
    let image_dir: PathBuf = match config.page_image_dir {
        Some(ref dir) => dir.clone(),
        None => {
            let tmp = tempfile::tempdir()
                .map_err(|e| PipelineError::Internal(format!("tempdir: {e}")))?;
            render::render_page_images(pdf_path, tmp.path(), config).await?;
            let path = tmp.path().to_path_buf();
            _rendered_dir_guard = Some(tmp);
            path
        }
    };

    // ── Step 4: Recognize formulas ───────────────────────────────────────
    let recognize_start = Instant::now();
    let (formulas, mut unit_errors) =
        recognize::recognize_folder(&backends.recognition, &image_dir, config).await?;
    let recognize_duration_ms = recognize_start.elapsed().as_millis() as u64;

    // ── Step 5: Chunk and translate ──────────────────────────────────────
    let chunks = chunk::split_chunks(&document.full_text, config.max_chunk_chars);
    debug!("Split text into {} chunks", chunks.len());

    let translate_start = Instant::now();
    let translated =
        translate::translate_chunks(&backends.translation, &chunks, config).await?;
    let translate_duration_ms = translate_start.elapsed().as_millis() as u64;
    let translated_text = translate::concat_translations(&translated);

    let degraded_chunks = translated.iter().filter(|c| c.error.is_some()).count();
    unit_errors.extend(translated.iter().filter_map(|c| c.error.clone()));

    // ── Step 6: Merge formulas into the original text ────────────────────
    // Pages without formulas contribute empty entries; those are dropped
    // before merging so each candidate span receives real formula text.
    let usable: Vec<String> = formulas.iter().filter(|f| !f.is_empty()).cloned().collect();
    let (candidates, merged_original_text) =
        merge::merge_formulas(&document.full_text, &usable);
    let candidate_count = merge::count_candidates(&document.full_text);
    info!(
        "Merged {}/{} formula candidates",
        candidates.len(),
        candidate_count
    );

    // ── Step 7: Write artifacts ──────────────────────────────────────────
    write_artifact(
        &config.result_dir.join(TRANSLATED_ARTIFACT),
        &translated_text,
    )
    .await?;
    write_artifact(
        &config.result_dir.join(MERGED_ARTIFACT),
        &merged_original_text,
    )
    .await?;
    write_artifact(&config.result_dir.join(FORMULA_ARTIFACT), &usable.join("\n")).await?;

    // ── Step 8: Status and stats ─────────────────────────────────────────
    let degraded_images = unit_errors
        .iter()
        .filter(|e| matches!(e, crate::error::UnitError::ImageRecognition { .. }))
        .count();

    let status = if unit_errors.is_empty() {
        RunStatus::Full
    } else {
        RunStatus::Partial
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(unit_errors.len());
    }

    let stats = RunStats {
        page_count: document.page_count,
        image_count: document.images.len(),
        chunk_count: chunks.len(),
        degraded_chunks,
        recognized_images: formulas.len(),
        degraded_images,
        candidate_count,
        merged_count: candidates.len(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        translate_duration_ms,
        recognize_duration_ms,
    };

    info!(
        "Run complete: {:?}, {} chunks ({} degraded), {} images ({} degraded), {}ms",
        status,
        stats.chunk_count,
        stats.degraded_chunks,
        stats.recognized_images,
        stats.degraded_images,
        stats.total_duration_ms
    );

    Ok(RunOutput {
        translated_text,
        merged_original_text,
        formulas,
        candidates,
        images: document.images,
        unit_errors,
        result_dir: config.result_dir.clone(),
        stats,
        status,
    })
}

/// Write one text artifact. Failures are fatal and never retried.
async fn write_artifact(path: &Path, content: &str) -> Result<(), PipelineError> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| PipelineError::ArtifactWrite {
            path: path.to_path_buf(),
            source: e,
        })
}
