//! Table extraction: detect column-aligned rows in page text and write one
//! combined spreadsheet artifact.
//!
//! Deliberately thin — no layout reconstruction, just row detection over the
//! extracted text. A block of three or more consecutive lines whose cells are
//! separated by runs of two or more spaces is treated as a table; all blocks
//! concatenate into a single `table_result.xlsx`. The artifact is written even
//! when no table was found, so the output contract is unconditional.

use crate::error::PipelineError;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tracing::{debug, info};

/// Cell separator: two or more consecutive spaces or a tab.
static CELL_SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\t| {2,}").unwrap());

/// One detected table: rows of cells, no header inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

/// Detect column-aligned table blocks in `text`.
pub fn detect_tables(text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut current: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if looks_like_table_row(trimmed) {
            current.push(split_cells(trimmed));
            continue;
        }
        flush_block(&mut current, &mut tables);
    }
    flush_block(&mut current, &mut tables);

    info!("Table detection: {} table(s)", tables.len());
    tables
}

fn flush_block(current: &mut Vec<Vec<String>>, tables: &mut Vec<Table>) {
    // Fewer than three aligned lines is an indented paragraph, not a table.
    if current.len() >= 3 {
        debug!("Detected table block: {} rows", current.len());
        tables.push(Table {
            rows: std::mem::take(current),
        });
    } else {
        current.clear();
    }
}

fn looks_like_table_row(line: &str) -> bool {
    line.len() >= 5 && CELL_SEP.find_iter(line).count() >= 1 && split_cells(line).len() >= 2
}

fn split_cells(line: &str) -> Vec<String> {
    CELL_SEP
        .split(line)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Write all detected tables, concatenated, to `path` as an xlsx workbook.
/// Tables are stacked on one worksheet with a blank row between blocks.
pub fn write_xlsx(tables: &[Table], path: &Path) -> Result<(), PipelineError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    let mut row_num: u32 = 0;
    for (block, table) in tables.iter().enumerate() {
        if block > 0 {
            row_num += 1;
        }
        for row in &table.rows {
            for (col, cell) in row.iter().enumerate() {
                sheet
                    .write_string(row_num, col as u16, cell)
                    .map_err(|e| artifact_error(path, e))?;
            }
            row_num += 1;
        }
    }

    workbook.save(path).map_err(|e| artifact_error(path, e))?;
    Ok(())
}

fn artifact_error(path: &Path, e: rust_xlsxwriter::XlsxError) -> PipelineError {
    PipelineError::ArtifactWrite {
        path: path.to_path_buf(),
        source: std::io::Error::other(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_block_is_a_table() {
        let text = "\
Some paragraph text here.

Model     Accuracy  Params
BERT      0.89      110M
GPT-2     0.91      1.5B

More prose afterwards.";
        let tables = detect_tables(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 3);
        assert_eq!(tables[0].rows[1], vec!["BERT", "0.89", "110M"]);
    }

    #[test]
    fn two_aligned_lines_are_not_a_table() {
        let text = "a  b\nc  d\nplain text";
        assert!(detect_tables(text).is_empty());
    }

    #[test]
    fn no_tables_in_prose() {
        assert!(detect_tables("just a sentence with single spaces").is_empty());
    }

    #[test]
    fn workbook_written_even_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table_result.xlsx");
        write_xlsx(&[], &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        // xlsx is a zip container
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn rows_land_in_the_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.xlsx");
        let table = Table {
            rows: vec![
                vec!["Model".into(), "Score".into()],
                vec!["BERT".into(), "0.89".into()],
            ],
        };
        write_xlsx(&[table], &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PK"));
        assert!(bytes.len() > 100);
    }
}
