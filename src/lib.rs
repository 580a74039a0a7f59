//! # pdftrans
//!
//! Translate PDF documents with Vision Language Models.
//!
//! ## What it does
//!
//! A single run takes one PDF and produces a translated rendition of its
//! content streams: prose is chunked and translated by a chat backend, page
//! images are read by a vision backend that transcribes mathematical
//! formulae, and the recognized formulae are spliced back over the
//! equation-like spans of the original text. Embedded images and detected
//! tables are written alongside as artifacts.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Extract    page text + embedded images (pdfium, spawn_blocking)
//!  ├─ 2. Tables     column-aligned rows → table_result.xlsx
//!  ├─ 3. Render     rasterise pages to page_{n}.png (unless supplied)
//!  ├─ 4. Recognize  vision calls per page image, page-order sorted
//!  ├─ 5. Translate  fixed-width chunks, concurrent, order-preserving
//!  ├─ 6. Merge      recognized formulae over non-CJK `=` spans
//!  └─ 7. Artifacts  translated_result.md, formula_result.md,
//!                   merged_original.md, table_result.xlsx, img_result/
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdftrans::{run_pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = PipelineConfig::builder()
//!         .target_language("en")
//!         .build()?;
//!     let output = run_pipeline("paper.pdf", &config).await?;
//!     println!("{}", output.translated_text);
//!     eprintln!("status: {:?}, {} formulas", output.status, output.formulas.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdftrans` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdftrans = { version = "0.1", default-features = false }
//! ```
//!
//! ## Testing without a network
//!
//! Both backends sit behind small traits ([`TranslationBackend`],
//! [`FormulaRecognitionBackend`]); swap in scripted fakes via
//! [`run::PipelineBackends`] and the whole pipeline runs offline.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{BackendError, FormulaRecognitionBackend, TranslationBackend};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{PipelineError, UnitError};
pub use output::{RunOutput, RunStats, RunStatus};
pub use pipeline::chunk::{split_chunks, TextChunk};
pub use pipeline::extract::{ExtractedDocument, ImageRef};
pub use pipeline::merge::{merge_formulas, FormulaCandidate};
pub use pipeline::translate::TranslatedChunk;
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use run::{run_pipeline, run_pipeline_with_backends, PipelineBackends};
