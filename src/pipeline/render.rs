//! Page rasterisation: render every page to `page_{n}.png` for recognition.
//!
//! The formula recognizer consumes a folder of rendered page images. When the
//! caller doesn't supply one (images rendered by an external collaborator),
//! this stage produces it, one PNG per page, 1-based page number in the
//! filename so the recognizer's page-order sort has an explicit key.
//!
//! Runs inside `spawn_blocking` — pdfium is CPU-bound and not async-safe.
//! A pixel cap bounds the longest edge regardless of physical page size so an
//! oversized page can neither exhaust memory nor blow the vision API upload
//! limit.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rasterise all pages of `pdf_path` into `out_dir/page_{n}.png`.
///
/// Returns the written paths in page order. The directory is created if
/// absent; existing files are overwritten (artifacts are single-use).
pub async fn render_page_images(
    pdf_path: &Path,
    out_dir: &Path,
    config: &PipelineConfig,
) -> Result<Vec<PathBuf>, PipelineError> {
    let path = pdf_path.to_path_buf();
    let dir = out_dir.to_path_buf();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;

    tokio::task::spawn_blocking(move || render_blocking(&path, &dir, dpi, max_pixels))
        .await
        .map_err(|e| PipelineError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_blocking(
    pdf_path: &Path,
    out_dir: &Path,
    dpi: u32,
    max_pixels: u32,
) -> Result<Vec<PathBuf>, PipelineError> {
    let pdfium = Pdfium::default();

    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| PipelineError::DocumentOpen {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

    std::fs::create_dir_all(out_dir).map_err(|e| PipelineError::ArtifactWrite {
        path: out_dir.to_path_buf(),
        source: e,
    })?;

    let pages = document.pages();
    let mut written = Vec::with_capacity(pages.len() as usize);

    for (index, page) in pages.iter().enumerate() {
        // Page width is in points (1/72 inch); the pixel cap bounds the
        // result no matter how large the physical page is.
        let target_width = (page.width().value / 72.0 * dpi as f32) as i32;
        let render_config = PdfRenderConfig::new()
            .set_target_width(target_width.min(max_pixels as i32))
            .set_maximum_height(max_pixels as i32);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            PipelineError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        let path = out_dir.join(format!("page_{}.png", index + 1));
        image
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| PipelineError::ArtifactWrite {
                path: path.clone(),
                source: std::io::Error::other(e),
            })?;

        debug!(
            "Rendered page {} → {}x{} px ({})",
            index + 1,
            image.width(),
            image.height(),
            path.display()
        );
        written.push(path);
    }

    info!("Rasterised {} pages into {}", written.len(), out_dir.display());
    Ok(written)
}
