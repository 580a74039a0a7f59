//! CLI binary for pdftrans.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig` and prints the run summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdftrans::{
    run_pipeline, PipelineConfig, PipelineProgressCallback, ProgressCallback, RunStatus,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar covering both translation chunks and
/// recognition images. Units complete out of order in concurrent mode, so the
/// bar tracks counts, not indices.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn extend(&self, prefix: &str, units: usize) {
        let len = self.bar.length().unwrap_or(0) + units as u64;
        self.bar.set_length(len);
        self.bar.set_prefix(prefix.to_string());
    }

    fn tick_unit(&self, label: String, degraded: bool) {
        if degraded {
            self.bar.println(format!("  {} {}", red("✗"), label));
        }
        self.bar.inc(1);
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_recognition_start(&self, total_images: usize) {
        self.extend("Recognizing", total_images);
    }

    fn on_image_done(&self, page: usize, _total: usize, degraded: bool) {
        self.tick_unit(format!("page image {page} degraded"), degraded);
    }

    fn on_translation_start(&self, total_chunks: usize) {
        self.extend("Translating", total_chunks);
    }

    fn on_chunk_done(&self, index: usize, _total: usize, degraded: bool) {
        self.tick_unit(format!("chunk {index} untranslated"), degraded);
    }

    fn on_run_complete(&self, degraded_units: usize) {
        self.bar.finish_and_clear();
        if degraded_units == 0 {
            eprintln!("{} all units completed", green("✔"));
        } else {
            eprintln!(
                "{} {} unit(s) degraded",
                cyan("⚠"),
                bold(&degraded_units.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Translate into Chinese (default), artifacts under result/
  pdftrans paper.pdf

  # Translate into English, custom artifact directory
  pdftrans --target-lang en --result-dir out/ paper.pdf

  # Externally rendered page images, specific models
  pdftrans --page-images rendered/ --model gpt-4.1-mini \
           --vision-model gpt-4.1 paper.pdf

  # Machine-readable run summary
  pdftrans --json paper.pdf > run.json

ARTIFACTS (under --result-dir):
  translated_result.md   translated text, chunk order preserved
  merged_original.md     original text with recognized formulas spliced in
  formula_result.md      recognized formulas, one per line
  table_result.xlsx      detected tables, concatenated
  img_result/            embedded images, Image_{page}-{index}.png

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, …)
  EDGEQUAKE_MODEL         Override model ID
"#;

/// Translate PDF documents using chat and vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdftrans",
    version,
    about = "Translate PDF documents using chat and vision LLMs",
    long_about = "Translate a PDF's content streams into a target language: text is chunked \
and translated, formulas are recognized from rendered page images and spliced back over \
the equation-like spans of the original text, and embedded images and tables are written \
as artifacts.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Target language code (e.g. zh, en, fr).
    #[arg(short, long, env = "PDFTRANS_TARGET_LANG", default_value = "zh")]
    target_lang: String,

    /// Directory receiving all artifacts.
    #[arg(short, long, env = "PDFTRANS_RESULT_DIR", default_value = "result")]
    result_dir: PathBuf,

    /// Directory of externally rendered page images (page_{n}.png).
    /// When omitted, pages are rasterised internally.
    #[arg(long, env = "PDFTRANS_PAGE_IMAGES")]
    page_images: Option<PathBuf>,

    /// Chat model for translation (e.g. gpt-4.1-mini).
    #[arg(long, env = "PDFTRANS_MODEL")]
    model: Option<String>,

    /// Vision model for formula recognition.
    #[arg(long, env = "PDFTRANS_VISION_MODEL")]
    vision_model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, …
    #[arg(long, env = "PDFTRANS_PROVIDER")]
    provider: Option<String>,

    /// Maximum characters per translation chunk.
    #[arg(long, env = "PDFTRANS_CHUNK_CHARS", default_value_t = 2000)]
    chunk_chars: usize,

    /// Number of concurrent backend calls.
    #[arg(short, long, env = "PDFTRANS_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// Retries per chunk on translation failure.
    #[arg(long, env = "PDFTRANS_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDFTRANS_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens per call.
    #[arg(long, env = "PDFTRANS_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Rendering DPI for internal rasterisation.
    #[arg(long, env = "PDFTRANS_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Abort the run on the first untranslatable chunk instead of passing
    /// the source text through.
    #[arg(long, env = "PDFTRANS_STRICT")]
    strict: bool,

    /// Output a structured JSON run summary instead of the text report.
    #[arg(long, env = "PDFTRANS_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFTRANS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFTRANS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFTRANS_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active; the
    // bar provides the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        Some(cb)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = run_pipeline(&cli.input, &config)
        .await
        .context("Translation run failed")?;

    if cli.json {
        let summary = serde_json::json!({
            "status": output.status,
            "result_dir": output.result_dir,
            "formulas": output.formulas,
            "unit_errors": output.unit_errors,
            "stats": output.stats,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
        return Ok(());
    }

    if !cli.quiet {
        let tick = match output.status {
            RunStatus::Full => green("✔"),
            RunStatus::Partial => cyan("⚠"),
            RunStatus::Failed => red("✘"),
        };
        eprintln!(
            "{tick}  {} pages  {} chunks  {} formulas  {}ms  →  {}",
            output.stats.page_count,
            output.stats.chunk_count,
            output.formulas.iter().filter(|f| !f.is_empty()).count(),
            output.stats.total_duration_ms,
            bold(&output.result_dir.display().to_string()),
        );
        if output.stats.degraded_chunks > 0 || output.stats.degraded_images > 0 {
            eprintln!(
                "   {} chunk(s) untranslated, {} image(s) unrecognized",
                output.stats.degraded_chunks, output.stats.degraded_images
            );
        }
        for err in &output.unit_errors {
            eprintln!("   {}", dim(&err.to_string()));
        }
        io::stderr().flush().ok();
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .target_language(cli.target_lang.clone())
        .result_dir(cli.result_dir.clone())
        .max_chunk_chars(cli.chunk_chars)
        .concurrency(cli.concurrency)
        .max_retries(cli.max_retries)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .dpi(cli.dpi)
        .continue_on_chunk_failure(!cli.strict);

    if let Some(ref dir) = cli.page_images {
        builder = builder.page_image_dir(dir.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.translation_model(model.clone());
    }
    if let Some(ref model) = cli.vision_model {
        builder = builder.recognition_model(model.clone());
    }
    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
