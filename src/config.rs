//! Configuration types for a PDF translation run.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. The config is immutable once built and is
//! passed by reference into every stage and backend — nothing in the pipeline
//! reads or mutates process-wide state (proxy settings, API keys) at runtime;
//! credentials resolve once, at backend construction.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::PipelineError;
use crate::progress::PipelineProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for one PDF translation run.
///
/// Built via [`PipelineConfig::builder()`] or [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use pdftrans::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .target_language("en")
///     .max_chunk_chars(1500)
///     .concurrency(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Target-language code passed to the translation backend, e.g. "zh",
    /// "en", "fr". Default: "zh".
    pub target_language: String,

    /// Maximum characters per translation chunk. Default: 2000.
    ///
    /// Chat backends bound request length; 2000 characters keeps each call
    /// comfortably under typical limits while leaving enough context for
    /// coherent translation. Chunking is fixed-width and makes no attempt to
    /// avoid splitting mid-sentence — a known trade-off, not a bug to fix
    /// silently: chunks are translated independently with no cross-chunk
    /// context, so boundary quality is limited either way.
    pub max_chunk_chars: usize,

    /// Number of concurrent backend calls (chunks or images). Default: 8.
    ///
    /// Backend calls are network-bound; chunk translations and per-image
    /// recognitions are independent, so a bounded pool cuts wall-clock time
    /// substantially. Lower this if the API rate-limits (`429`).
    pub concurrency: usize,

    /// Model for the translation backend. If None, the provider default.
    pub translation_model: Option<String>,

    /// Model for the vision recognition backend. If None, the provider default.
    pub recognition_model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic"). If None along with
    /// `provider`, auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for backend completions. Default: 0.1.
    ///
    /// Low temperature keeps the model faithful to the source text and to
    /// what it sees on the page — exactly what translation and formula
    /// transcription want.
    pub temperature: f32,

    /// Maximum tokens the backend may generate per call. Default: 4096.
    pub max_tokens: usize,

    /// Maximum retry attempts for a failed chunk translation. Default: 3.
    ///
    /// Recognition calls are not retried — a failed image degrades to an
    /// empty recognition instead.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s, so N concurrent
    /// workers don't hammer a recovering endpoint in lockstep.
    pub retry_backoff_ms: u64,

    /// Rendering DPI used when rasterising pages for recognition. Default: 150.
    pub dpi: u32,

    /// Maximum rendered page dimension (width or height) in pixels. Default: 2000.
    ///
    /// A safety cap independent of DPI so an oversized page can never exhaust
    /// memory or blow the vision API upload limit.
    pub max_rendered_pixels: u32,

    /// Directory receiving all artifacts. Default: `result/`.
    ///
    /// Artifact names under this directory are a compatibility contract with
    /// the surrounding service layer: `translated_result.md`,
    /// `formula_result.md`, `table_result.xlsx`, `img_result/Image_{p}-{i}.{ext}`.
    pub result_dir: PathBuf,

    /// Directory of externally rendered page images (`page_{n}.png`).
    ///
    /// When None, the pipeline rasterises pages itself into a temporary
    /// directory before recognition.
    pub page_image_dir: Option<PathBuf>,

    /// On chunk-translation failure after retries: pass the original text
    /// through untranslated and continue (true, default), or abort the run
    /// (false).
    pub continue_on_chunk_failure: bool,

    /// Optional per-unit progress events. Default: None.
    pub progress_callback: Option<Arc<dyn PipelineProgressCallback>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_language: "zh".to_string(),
            max_chunk_chars: 2000,
            concurrency: 8,
            translation_model: None,
            recognition_model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            dpi: 150,
            max_rendered_pixels: 2000,
            result_dir: PathBuf::from("result"),
            page_image_dir: None,
            continue_on_chunk_failure: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("target_language", &self.target_language)
            .field("max_chunk_chars", &self.max_chunk_chars)
            .field("concurrency", &self.concurrency)
            .field("translation_model", &self.translation_model)
            .field("recognition_model", &self.recognition_model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("dpi", &self.dpi)
            .field("result_dir", &self.result_dir)
            .field("page_image_dir", &self.page_image_dir)
            .field("continue_on_chunk_failure", &self.continue_on_chunk_failure)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn target_language(mut self, lang: impl Into<String>) -> Self {
        self.config.target_language = lang.into();
        self
    }

    pub fn max_chunk_chars(mut self, n: usize) -> Self {
        self.config.max_chunk_chars = n.max(1);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn translation_model(mut self, model: impl Into<String>) -> Self {
        self.config.translation_model = Some(model.into());
        self
    }

    pub fn recognition_model(mut self, model: impl Into<String>) -> Self {
        self.config.recognition_model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
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

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn result_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.result_dir = dir.into();
        self
    }

    pub fn page_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.page_image_dir = Some(dir.into());
        self
    }

    pub fn continue_on_chunk_failure(mut self, v: bool) -> Self {
        self.config.continue_on_chunk_failure = v;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn PipelineProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.max_chunk_chars == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_chunk_chars must be ≥ 1".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(PipelineError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        if c.target_language.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "target_language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config.target_language, "zh");
        assert_eq!(config.max_chunk_chars, 2000);
        assert_eq!(config.concurrency, 8);
        assert!(config.continue_on_chunk_failure);
    }

    #[test]
    fn builder_clamps_floor_values() {
        let config = PipelineConfig::builder()
            .concurrency(0)
            .max_chunk_chars(0)
            .build()
            .unwrap();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.max_chunk_chars, 1);
    }

    #[test]
    fn empty_language_rejected() {
        let err = PipelineConfig::builder().target_language("  ").build();
        assert!(err.is_err());
    }
}
