//! Page extraction: walk PDF pages, collect raw text and embedded images.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto the blocking thread
//! pool so Tokio worker threads don't stall on CPU-heavy extraction.
//!
//! ## Offset contract
//!
//! Page texts are joined with a single `"\n"` separator, pages in increasing
//! index order. Downstream formula matching is offset-based against this
//! exact string, so the separator and ordering must never change.

use crate::error::PipelineError;
use crate::output::IMAGE_DIR;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One embedded raster image written to the image directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRef {
    /// 0-based page index the image was embedded in.
    pub page: usize,
    /// 0-based index of the image within its page.
    pub index_in_page: usize,
    /// Deterministic artifact filename: `Image_{page+1}-{index+1}.{ext}`.
    pub filename: String,
    /// Full path of the written file.
    pub path: PathBuf,
}

/// Everything the extractor pulls out of the document in one pass.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// All page texts joined with `"\n"`, pages in increasing index order.
    pub full_text: String,
    /// Embedded images, in (page, index-in-page) order.
    pub images: Vec<ImageRef>,
    /// Number of pages in the document.
    pub page_count: usize,
}

/// Extract text and embedded images from `pdf_path`, writing image files
/// under `{result_dir}/img_result/`.
///
/// Fatal on open failure: the run aborts with [`PipelineError::DocumentOpen`]
/// and no partial output. A single unreadable embedded image is logged and
/// skipped — it only feeds the artifact manifest, not the text pipeline.
pub async fn extract_document(
    pdf_path: &Path,
    result_dir: &Path,
) -> Result<ExtractedDocument, PipelineError> {
    validate_pdf_file(pdf_path)?;

    let path = pdf_path.to_path_buf();
    let image_dir = result_dir.join(IMAGE_DIR);

    tokio::task::spawn_blocking(move || extract_blocking(&path, &image_dir))
        .await
        .map_err(|e| PipelineError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Check existence and `%PDF` magic bytes before handing the path to pdfium,
/// so callers get a meaningful error rather than a parser crash.
fn validate_pdf_file(path: &Path) -> Result<(), PipelineError> {
    if !path.exists() {
        return Err(PipelineError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let mut f = std::fs::File::open(path).map_err(|_| PipelineError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    let mut magic = [0u8; 4];
    if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
        return Err(PipelineError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

fn extract_blocking(
    pdf_path: &Path,
    image_dir: &Path,
) -> Result<ExtractedDocument, PipelineError> {
    let pdfium = Pdfium::default();

    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| PipelineError::DocumentOpen {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    info!("PDF loaded: {} pages", page_count);

    std::fs::create_dir_all(image_dir).map_err(|e| PipelineError::ArtifactWrite {
        path: image_dir.to_path_buf(),
        source: e,
    })?;

    let mut page_texts: Vec<String> = Vec::with_capacity(page_count);
    let mut images: Vec<ImageRef> = Vec::new();

    for (page_index, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map(|t| t.all())
            .unwrap_or_else(|e| {
                warn!("Page {}: text extraction failed: {:?}", page_index + 1, e);
                String::new()
            });
        debug!("Page {}: {} chars of text", page_index + 1, text.len());
        page_texts.push(text);

        let mut image_index = 0usize;
        for object in page.objects().iter() {
            let Some(image_object) = object.as_image_object() else {
                continue;
            };

            // pdfium hands back a decoded bitmap, not the original compressed
            // stream, so the artifact is always PNG regardless of how the
            // image was embedded.
            match image_object.get_raw_image() {
                Ok(bitmap) => {
                    let filename =
                        format!("Image_{}-{}.png", page_index + 1, image_index + 1);
                    let path = image_dir.join(&filename);
                    if let Err(e) = bitmap.save_with_format(&path, image::ImageFormat::Png) {
                        warn!("Failed to write {}: {}", path.display(), e);
                    } else {
                        debug!("Wrote embedded image {}", filename);
                        images.push(ImageRef {
                            page: page_index,
                            index_in_page: image_index,
                            filename,
                            path,
                        });
                    }
                    image_index += 1;
                }
                Err(e) => {
                    warn!(
                        "Page {}: could not decode embedded image: {:?}",
                        page_index + 1,
                        e
                    );
                }
            }
        }
    }

    Ok(ExtractedDocument {
        full_text: page_texts.join("\n"),
        images,
        page_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_file_not_found() {
        let err = validate_pdf_file(Path::new("/nonexistent/doc.pdf")).unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound { .. }));
    }

    #[test]
    fn wrong_magic_is_not_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();

        let err = validate_pdf_file(&path).unwrap_err();
        assert!(matches!(err, PipelineError::NotAPdf { .. }));
    }

    #[test]
    fn pdf_magic_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("real.pdf");
        std::fs::write(&path, b"%PDF-1.7\n%rest").unwrap();

        assert!(validate_pdf_file(&path).is_ok());
    }

    #[test]
    fn image_filename_is_deterministic() {
        // The naming contract the service layer depends on.
        let name = format!("Image_{}-{}.png", 2 + 1, 0 + 1);
        assert_eq!(name, "Image_3-1.png");
    }
}
