//! Formula recognition: drive the vision backend over a folder of rendered
//! page images, one recognition result per image, in page order.
//!
//! ## Page order is a sort, not a directory listing
//!
//! Directory listing order is filesystem-dependent, and lexicographic order
//! puts `page_12.png` before `page_2.png`. The page index is therefore parsed
//! out of the filename and used as an explicit numeric sort key, so the
//! recognition sequence lines up with document pages.
//!
//! ## Degradation, never abortion
//!
//! A failed backend call for one image is logged and recorded as an empty
//! recognition so the positional correspondence with pages survives. Empty
//! strings stay in the sequence; refusal/apology responses are collapsed to
//! empty by [`crate::prompts::strip_refusal`] and never reach an artifact.

use crate::backend::FormulaRecognitionBackend;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, UnitError};
use crate::prompts::strip_refusal;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Raster extensions the recognizer accepts.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Last run of digits in the file stem, e.g. `page_12` → 12.
static PAGE_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\D*$").unwrap());

/// List the raster images in `dir`, sorted by the numeric page index parsed
/// from each filename. Files without a number sort after numbered ones, by
/// name, so a stray unnumbered file can't displace real pages.
pub fn list_page_images(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        PipelineError::Internal(format!("cannot list image folder '{}': {e}", dir.display()))
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();

    files.sort_by_key(|p| {
        let name = p
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        (parse_page_index(&name).unwrap_or(u64::MAX), name)
    });

    Ok(files)
}

/// Parse the page index out of a file stem, if it carries one.
fn parse_page_index(stem: &str) -> Option<u64> {
    PAGE_INDEX
        .captures(stem)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Recognize formulas from every image in `dir`, in page order.
///
/// Returns one string per image (possibly empty) plus the per-image errors
/// that degraded to empty results. Never fatal for a single image; fatal only
/// when the directory itself cannot be read.
pub async fn recognize_folder(
    backend: &Arc<dyn FormulaRecognitionBackend>,
    dir: &Path,
    config: &PipelineConfig,
) -> Result<(Vec<String>, Vec<UnitError>), PipelineError> {
    let files = list_page_images(dir)?;
    let total = files.len();
    info!("Recognizing formulas from {} page images", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_recognition_start(total);
    }

    let results: Vec<(String, Option<UnitError>)> =
        stream::iter(files.iter().enumerate().map(|(position, path)| {
            let backend = Arc::clone(backend);
            let config = config.clone();
            // Report the page parsed from the filename, so a gap in the
            // rendered sequence doesn't mislabel errors. Position is the
            // fallback for unnumbered files.
            let page = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(parse_page_index)
                .map(|n| n as usize)
                .unwrap_or(position + 1);
            let path = path.clone();
            async move {
                let result = recognize_one(&backend, page, &path).await;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_image_done(page, total, result.1.is_some());
                }
                result
            }
        }))
        .buffered(config.concurrency)
        .collect()
        .await;

    let mut formulas = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for (formula, error) in results {
        formulas.push(formula);
        if let Some(e) = error {
            errors.push(e);
        }
    }

    Ok((formulas, errors))
}

/// One image: read, recognize, normalise. Errors degrade to an empty string.
async fn recognize_one(
    backend: &Arc<dyn FormulaRecognitionBackend>,
    page: usize,
    path: &Path,
) -> (String, Option<UnitError>) {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) => {
            warn!("Page image {}: read failed: {}", page, e);
            return (
                String::new(),
                Some(UnitError::ImageRecognition {
                    page,
                    detail: format!("read failed: {e}"),
                }),
            );
        }
    };

    match backend.recognize_formula(&bytes).await {
        Ok(raw) => {
            let formula = strip_refusal(&raw);
            debug!(
                "Page image {}: {} chars recognized",
                page,
                formula.len()
            );
            (formula, None)
        }
        Err(e) => {
            warn!("Page image {}: recognition failed — {}", page, e);
            (
                String::new(),
                Some(UnitError::ImageRecognition {
                    page,
                    detail: e.to_string(),
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use async_trait::async_trait;

    struct FakeVision {
        responses: std::sync::Mutex<std::collections::HashMap<usize, &'static str>>,
    }

    #[async_trait]
    impl FormulaRecognitionBackend for FakeVision {
        async fn recognize_formula(&self, image_png: &[u8]) -> Result<String, BackendError> {
            // The fake images below contain their page number as bytes.
            let page = image_png[0] as usize;
            let map = self.responses.lock().unwrap();
            match map.get(&page) {
                Some(&"ERR") => Err(BackendError("scripted failure".into())),
                Some(text) => Ok(text.to_string()),
                None => Ok(String::new()),
            }
        }
    }

    fn touch_images(dir: &Path, names: &[(&str, u8)]) {
        for (name, payload) in names {
            std::fs::write(dir.join(name), [*payload]).unwrap();
        }
    }

    #[test]
    fn page_index_parsed_from_stem() {
        assert_eq!(parse_page_index("page_12"), Some(12));
        assert_eq!(parse_page_index("page_2"), Some(2));
        assert_eq!(parse_page_index("Image_3-1"), Some(1));
        assert_eq!(parse_page_index("cover"), None);
    }

    #[test]
    fn numeric_sort_beats_lexicographic() {
        let dir = tempfile::tempdir().unwrap();
        touch_images(
            dir.path(),
            &[
                ("page_10.png", 10),
                ("page_2.png", 2),
                ("page_1.png", 1),
                ("notes.txt", 0),
            ],
        );

        let files = list_page_images(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["page_1.png", "page_2.png", "page_10.png"]);
    }

    #[test]
    fn unnumbered_files_sort_last() {
        let dir = tempfile::tempdir().unwrap();
        touch_images(dir.path(), &[("cover.png", 0), ("page_1.png", 1)]);

        let files = list_page_images(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["page_1.png", "cover.png"]);
    }

    #[tokio::test]
    async fn results_line_up_with_pages_and_errors_degrade() {
        let dir = tempfile::tempdir().unwrap();
        touch_images(
            dir.path(),
            &[("page_1.png", 1), ("page_2.png", 2), ("page_3.png", 3)],
        );

        let backend: Arc<dyn FormulaRecognitionBackend> = Arc::new(FakeVision {
            responses: std::sync::Mutex::new(
                [(1usize, "$a=b$"), (2, "ERR"), (3, "  $c = d$\n")]
                    .into_iter()
                    .collect(),
            ),
        });
        let config = PipelineConfig::builder().concurrency(2).build().unwrap();

        let (formulas, errors) = recognize_folder(&backend, dir.path(), &config)
            .await
            .unwrap();

        assert_eq!(formulas, vec!["$a=b$", "", "$c = d$"]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            UnitError::ImageRecognition { page: 2, .. }
        ));
    }

    #[tokio::test]
    async fn errors_report_the_filename_page_across_gaps() {
        // page_7 is second in the sorted listing but the error must still
        // name page 7, not position 2.
        let dir = tempfile::tempdir().unwrap();
        touch_images(dir.path(), &[("page_3.png", 3), ("page_7.png", 7)]);

        let backend: Arc<dyn FormulaRecognitionBackend> = Arc::new(FakeVision {
            responses: std::sync::Mutex::new(
                [(3usize, "$a=b$"), (7, "ERR")].into_iter().collect(),
            ),
        });
        let config = PipelineConfig::default();

        let (formulas, errors) = recognize_folder(&backend, dir.path(), &config)
            .await
            .unwrap();

        assert_eq!(formulas, vec!["$a=b$", ""]);
        assert!(matches!(
            errors[0],
            UnitError::ImageRecognition { page: 7, .. }
        ));
    }

    #[tokio::test]
    async fn refusal_response_never_reaches_output() {
        let dir = tempfile::tempdir().unwrap();
        touch_images(dir.path(), &[("page_1.png", 1)]);

        let backend: Arc<dyn FormulaRecognitionBackend> = Arc::new(FakeVision {
            responses: std::sync::Mutex::new(
                [(1usize, "对不起，我无法提取图片中的数学公式内容。")]
                    .into_iter()
                    .collect(),
            ),
        });
        let config = PipelineConfig::default();

        let (formulas, errors) = recognize_folder(&backend, dir.path(), &config)
            .await
            .unwrap();

        assert_eq!(formulas, vec![""]);
        assert!(errors.is_empty());
    }
}
