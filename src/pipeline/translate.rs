//! Translation stage: one backend call per chunk, concurrent, order-preserving.
//!
//! ## Ordering
//!
//! Chunk calls are dispatched through `stream::iter(..).buffered(n)`, which
//! polls up to `n` futures concurrently but yields results in input order —
//! output index *i* always corresponds to input chunk *i*, regardless of
//! which backend call completes first.
//!
//! ## Retry strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient and frequent under
//! concurrent load. Exponential backoff (`retry_backoff_ms * 2^attempt`)
//! avoids thundering-herd: with 500 ms base and 3 retries the wait sequence
//! is 500 ms → 1 s → 2 s per chunk.
//!
//! ## Failure policy
//!
//! After retries are exhausted the chunk degrades: its original text passes
//! through untranslated, a [`UnitError`] is recorded, and the run continues
//! with Partial status. Set `continue_on_chunk_failure = false` to make a
//! single degraded chunk abort the run instead. Either way, if *every* chunk
//! fails the run aborts — an output consisting entirely of source text helps
//! nobody.

use crate::backend::TranslationBackend;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, UnitError};
use crate::pipeline::chunk::TextChunk;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Translation result for one chunk, 1:1 with the input chunk by index.
#[derive(Debug, Clone)]
pub struct TranslatedChunk {
    /// Index of the source [`TextChunk`].
    pub index: usize,
    /// Translated text, or the original chunk text when degraded.
    pub text: String,
    /// Present when the chunk exhausted its retries.
    pub error: Option<UnitError>,
}

/// Translate all chunks into the configured target language.
///
/// Output order equals input order. Fatal only when every chunk failed, or
/// when any chunk failed under strict mode.
pub async fn translate_chunks(
    backend: &Arc<dyn TranslationBackend>,
    chunks: &[TextChunk],
    config: &PipelineConfig,
) -> Result<Vec<TranslatedChunk>, PipelineError> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let total = chunks.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_translation_start(total);
    }

    let results: Vec<TranslatedChunk> = stream::iter(chunks.iter().enumerate().map(
        |(index, chunk)| {
            let backend = Arc::clone(backend);
            let config = config.clone();
            let text = chunk.text.clone();
            async move {
                let result = translate_one(&backend, index, &text, &config).await;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_chunk_done(index, total, result.error.is_some());
                }
                result
            }
        },
    ))
    .buffered(config.concurrency)
    .collect()
    .await;

    let degraded = results.iter().filter(|r| r.error.is_some()).count();

    if degraded == total {
        let first_error = results
            .iter()
            .find_map(|r| r.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(PipelineError::AllChunksFailed {
            total,
            retries: config.max_retries,
            first_error,
        });
    }

    if degraded > 0 && !config.continue_on_chunk_failure {
        let (index, detail) = results
            .iter()
            .find_map(|r| match &r.error {
                Some(UnitError::ChunkTranslation { index, detail, .. }) => {
                    Some((*index, detail.clone()))
                }
                _ => None,
            })
            .unwrap_or((0, "unknown error".to_string()));
        return Err(PipelineError::ChunkFailed {
            index,
            retries: config.max_retries,
            detail,
        });
    }

    Ok(results)
}

/// Concatenate translations in order into one continuous stream of text.
pub fn concat_translations(chunks: &[TranslatedChunk]) -> String {
    chunks.iter().map(|c| c.text.as_str()).collect()
}

/// One chunk, with retries. Never propagates the error upward — degradation
/// is recorded in the result so a single bad chunk can't abort the stream.
async fn translate_one(
    backend: &Arc<dyn TranslationBackend>,
    index: usize,
    text: &str,
    config: &PipelineConfig,
) -> TranslatedChunk {
    let mut last_err: Option<String> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "Chunk {}: retry {}/{} after {}ms",
                index, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match backend.translate(text, &config.target_language).await {
            Ok(translated) => {
                debug!("Chunk {}: translated {} chars", index, text.len());
                return TranslatedChunk {
                    index,
                    text: translated,
                    error: None,
                };
            }
            Err(e) => {
                warn!("Chunk {}: attempt {} failed — {}", index, attempt + 1, e);
                last_err = Some(e.to_string());
            }
        }
    }

    TranslatedChunk {
        index,
        // Pass the source text through so positional structure survives.
        text: text.to_string(),
        error: Some(UnitError::ChunkTranslation {
            index,
            retries: config.max_retries as u8,
            detail: last_err.unwrap_or_else(|| "unknown error".to_string()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted backend: uppercases input, with optional per-call delays and
    /// failure for specific chunks.
    struct FakeBackend {
        fail_containing: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl crate::backend::TranslationBackend for FakeBackend {
        async fn translate(
            &self,
            text: &str,
            _target_language: &str,
        ) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(marker) = self.fail_containing {
                if text.contains(marker) {
                    return Err(BackendError("scripted failure".into()));
                }
            }
            // Later chunks finish first so ordering is actually exercised.
            let delay = 20u64.saturating_sub(text.len() as u64);
            sleep(Duration::from_millis(delay)).await;
            Ok(text.to_uppercase())
        }
    }

    fn chunks_of(texts: &[&str]) -> Vec<TextChunk> {
        let mut start = 0;
        texts
            .iter()
            .map(|t| {
                let c = TextChunk {
                    start,
                    text: t.to_string(),
                };
                start += t.len();
                c
            })
            .collect()
    }

    fn test_config() -> PipelineConfig {
        PipelineConfig::builder()
            .concurrency(4)
            .max_retries(1)
            .retry_backoff_ms(1)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn order_preserved_under_concurrency() {
        let backend: Arc<dyn crate::backend::TranslationBackend> = Arc::new(FakeBackend {
            fail_containing: None,
            calls: AtomicUsize::new(0),
        });
        let chunks = chunks_of(&["aaaa", "bb", "cccccc", "d"]);

        let out = translate_chunks(&backend, &chunks, &test_config())
            .await
            .unwrap();

        let texts: Vec<&str> = out.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["AAAA", "BB", "CCCCCC", "D"]);
        for (i, c) in out.iter().enumerate() {
            assert_eq!(c.index, i);
        }
    }

    #[tokio::test]
    async fn failed_chunk_degrades_to_source_text() {
        let backend: Arc<dyn crate::backend::TranslationBackend> = Arc::new(FakeBackend {
            fail_containing: Some("bad"),
            calls: AtomicUsize::new(0),
        });
        let chunks = chunks_of(&["good one", "bad one", "fine"]);

        let out = translate_chunks(&backend, &chunks, &test_config())
            .await
            .unwrap();

        assert_eq!(out[0].text, "GOOD ONE");
        assert_eq!(out[1].text, "bad one");
        assert!(out[1].error.is_some());
        assert_eq!(out[2].text, "FINE");
    }

    #[tokio::test]
    async fn strict_mode_aborts_on_single_failure() {
        let backend: Arc<dyn crate::backend::TranslationBackend> = Arc::new(FakeBackend {
            fail_containing: Some("bad"),
            calls: AtomicUsize::new(0),
        });
        let chunks = chunks_of(&["ok", "bad"]);
        let config = PipelineConfig::builder()
            .max_retries(0)
            .continue_on_chunk_failure(false)
            .build()
            .unwrap();

        let err = translate_chunks(&backend, &chunks, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ChunkFailed { index: 1, .. }));
    }

    #[tokio::test]
    async fn all_chunks_failing_is_fatal() {
        let backend: Arc<dyn crate::backend::TranslationBackend> = Arc::new(FakeBackend {
            fail_containing: Some(""),
            calls: AtomicUsize::new(0),
        });
        let chunks = chunks_of(&["a", "b"]);

        let err = translate_chunks(&backend, &chunks, &test_config())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::AllChunksFailed { total: 2, .. }));
    }

    #[tokio::test]
    async fn retries_are_attempted() {
        let backend = Arc::new(FakeBackend {
            fail_containing: Some("x"),
            calls: AtomicUsize::new(0),
        });
        let dyn_backend: Arc<dyn crate::backend::TranslationBackend> = backend.clone();
        let chunks = chunks_of(&["x"]);

        let _ = translate_chunks(&dyn_backend, &chunks, &test_config()).await;
        // max_retries = 1 → initial attempt + one retry.
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_chunks_short_circuit() {
        let backend: Arc<dyn crate::backend::TranslationBackend> = Arc::new(FakeBackend {
            fail_containing: None,
            calls: AtomicUsize::new(0),
        });
        let out = translate_chunks(&backend, &[], &test_config()).await.unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn concat_restores_stream() {
        let chunks = vec![
            TranslatedChunk {
                index: 0,
                text: "Hello ".into(),
                error: None,
            },
            TranslatedChunk {
                index: 1,
                text: "world".into(),
                error: None,
            },
        ];
        assert_eq!(concat_translations(&chunks), "Hello world");
    }
}
