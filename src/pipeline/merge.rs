//! Formula merging: locate equation-like spans in the original text and
//! splice recognized formulas over them, positionally.
//!
//! A formula candidate is a maximal run of characters that are neither CJK
//! ideographs nor the Chinese punctuation `，` `。` `：`, containing `=`
//! preceded by at least one character (an equation needs a left-hand side). The heuristic only makes sense against the *original*
//! (pre-translation) text — after translation the non-CJK property no longer
//! marks "untranslated formula material" — which is why the orchestrator runs
//! this stage on the extracted text, never on the translated stream.
//!
//! Candidates are consumed left to right, one recognized formula each. When
//! the recognized-formula supply is exhausted, matching stops entirely and
//! everything that remains passes through byte-identical. Running out of
//! formulas is defined degenerate behaviour, not an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A heuristically detected formula span in the original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaCandidate {
    /// Byte offset of the span's first byte.
    pub start: usize,
    /// Byte offset one past the span's last byte.
    pub end: usize,
    /// The raw matched substring, whitespace-trimmed.
    pub text: String,
}

/// Maximal runs of non-CJK, non-`，。：` characters. See [`is_candidate`]
/// for which runs qualify.
static NON_CJK_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\u{4e00}-\u{9fff}，。：]+").unwrap());

/// Replace up to `recognized.len()` formula candidates in `original_text`
/// with the recognized formulas, in left-to-right order.
///
/// Returns the matched spans (diagnostic/audit artifact) and the merged text.
/// With an empty `recognized` slice this is the identity: `([], original_text)`.
pub fn merge_formulas(
    original_text: &str,
    recognized: &[String],
) -> (Vec<FormulaCandidate>, String) {
    let mut candidates = Vec::new();
    let mut merged = String::with_capacity(original_text.len());
    let mut last_end = 0usize;

    for m in NON_CJK_RUN.find_iter(original_text) {
        if candidates.len() >= recognized.len() {
            break;
        }
        if !is_candidate(m.as_str()) {
            continue;
        }

        candidates.push(FormulaCandidate {
            start: m.start(),
            end: m.end(),
            text: m.as_str().trim().to_string(),
        });

        merged.push_str(&original_text[last_end..m.start()]);
        merged.push_str(&recognized[candidates.len() - 1]);
        last_end = m.end();
    }

    merged.push_str(&original_text[last_end..]);
    (candidates, merged)
}

/// Count every candidate span in `text`, ignoring any formula supply.
/// [`merge_formulas`] stops consuming once the supply runs out; this is the
/// number of spans it would match with an unbounded one.
pub fn count_candidates(text: &str) -> usize {
    NON_CJK_RUN
        .find_iter(text)
        .filter(|m| is_candidate(m.as_str()))
        .count()
}

// A run must contain `=` with at least one character before it; a run that
// opens with `=` has no left-hand side and is not an equation span.
fn is_candidate(run: &str) -> bool {
    run.contains('=') && !run.starts_with('=')
}
