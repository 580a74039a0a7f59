//! Backend capabilities: translation and formula recognition.
//!
//! Both backends are network services with arbitrary latency and possible
//! failure, so the pipeline only ever sees them through the two small traits
//! defined here. Production code wires them to an [`edgequake_llm`] provider;
//! tests substitute scripted fakes and never touch the network.
//!
//! Retry/backoff policy deliberately does NOT live here — a backend call is a
//! single attempt. The translate and recognize stages own the retry loops so
//! the policy can differ per stage (translation retries, recognition degrades
//! to an empty result).

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::prompts;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// A single failed backend call. Carries only a human-readable detail; the
/// calling stage decides whether to retry, degrade, or abort.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

/// Translates one bounded-length chunk of text into a target language.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// One backend call: translate `text` into `target_language`.
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, BackendError>;
}

/// Recognizes formula content from one rendered page image.
#[async_trait]
pub trait FormulaRecognitionBackend: Send + Sync {
    /// One backend call: return the delimited formula text found in the
    /// image, or an empty string when the page carries no formula.
    ///
    /// The returned text is raw backend output; callers run it through
    /// [`crate::prompts::strip_refusal`].
    async fn recognize_formula(&self, image_png: &[u8]) -> Result<String, BackendError>;
}

// ── Production implementations over edgequake-llm ────────────────────────

/// [`TranslationBackend`] backed by an [`edgequake_llm`] chat provider.
pub struct LlmTranslationBackend {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmTranslationBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, temperature: f32, max_tokens: usize) -> Self {
        Self {
            provider,
            options: CompletionOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl TranslationBackend for LlmTranslationBackend {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, BackendError> {
        let messages = vec![
            ChatMessage::system(prompts::translation_directive(target_language)),
            ChatMessage::user(text),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| BackendError(e.to_string()))?;

        debug!(
            "Translated chunk: {} in / {} out tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// [`FormulaRecognitionBackend`] backed by a vision-capable
/// [`edgequake_llm`] provider.
pub struct LlmFormulaBackend {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmFormulaBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, temperature: f32, max_tokens: usize) -> Self {
        Self {
            provider,
            options: CompletionOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl FormulaRecognitionBackend for LlmFormulaBackend {
    async fn recognize_formula(&self, image_png: &[u8]) -> Result<String, BackendError> {
        // PNG is lossless; text crispness matters more than payload size for
        // formula recognition. `detail: "high"` keeps small superscripts legible.
        let b64 = STANDARD.encode(image_png);
        let image = ImageData::new(b64, "image/png").with_detail("high");

        let messages = vec![
            ChatMessage::system(prompts::FORMULA_RECOGNITION_PROMPT),
            ChatMessage::user_with_images(prompts::FORMULA_RECOGNITION_REQUEST, vec![image]),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| BackendError(e.to_string()))?;

        Ok(response.content)
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed and
///    configured the provider entirely; used as-is. Useful in tests or when
///    the caller needs custom middleware.
///
/// 2. **Named provider** (`config.provider_name`) — resolved through
///    [`ProviderFactory::create_llm_provider`], which reads the matching API
///    key (`OPENAI_API_KEY`, etc.) from the environment.
///
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`) —
///    honoured when both are set, so an execution environment (Makefile, CI)
///    can pin the provider without touching the config.
///
/// 4. **Full auto-detection** (`ProviderFactory::from_env`) — scans known API
///    key variables and picks the first available provider.
///
/// Credentials never mutate process-wide state: whatever this resolves to is
/// captured in the immutable config and passed into the backends at
/// construction.
pub fn resolve_provider(
    config: &PipelineConfig,
    model: Option<&str>,
) -> Result<Arc<dyn LLMProvider>, PipelineError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = model.unwrap_or("gpt-4.1-mini");
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, model.unwrap_or(&env_model));
        }
    }

    // Prefer OpenAI explicitly when an OpenAI API key is present, so users
    // with multiple provider keys get a deterministic default.
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", model.unwrap_or("gpt-4.1-mini"));
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PipelineError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                 Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                 Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

/// Instantiate a named provider with the given model.
fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, PipelineError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PipelineError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
