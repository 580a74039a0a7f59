//! System prompts for the translation and formula-recognition backends.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing backend behaviour (e.g. tightening
//!    the formula-only constraint) requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect prompts and the refusal filter
//!    directly without a live backend.

/// Build the system directive for translating one chunk into `target_language`.
///
/// The chunk itself travels as the user message; the directive carries only
/// the target-language instruction so chunks stay independent of each other.
pub fn translation_directive(target_language: &str) -> String {
    format!(
        "You are a helpful translation assistant. Translate the following content \
         into {target_language}. Output only the translation, with no commentary, \
         and leave mathematical expressions and code unchanged."
    )
}

/// System prompt constraining the vision backend to return delimited formula
/// text or nothing at all.
///
/// Each formula must appear on its own line wrapped in `$…$` so the merge
/// stage can splice it verbatim into prose. The prompt forbids apology text,
/// but models disobey often enough that [`strip_refusal`] exists as a second
/// line of defence.
pub const FORMULA_RECOGNITION_PROMPT: &str = "\
You are a professional mathematical-formula recognition assistant. Return only \
the pure mathematical formulas visible in the image, with no surrounding prose \
in any language. Put each formula on its own line, wrapped in $ delimiters. \
If the image contains no extractable formula, return nothing at all. Never \
apologise and never explain that no formula could be extracted.";

/// User text accompanying the page image in the recognition request.
pub const FORMULA_RECOGNITION_REQUEST: &str =
    "Identify the mathematical formulas in the following image:";

/// Phrases that mark a refusal/apology response from the recognition backend.
///
/// A response containing any of these must never reach the formula artifact;
/// the recognition result for that image degrades to the empty string.
const REFUSAL_MARKERS: &[&str] = &[
    "对不起，我无法提取图片中的数学公式内容",
    "I'm sorry",
    "I am sorry",
    "I cannot extract",
    "I can't extract",
    "no mathematical formula",
    "unable to extract",
];

/// Normalise a raw recognition response: trim whitespace and collapse a
/// refusal/apology into the empty string.
///
/// Internal newlines are removed so each page contributes at most one line to
/// the formula artifact, matching the one-entry-per-page contract.
pub fn strip_refusal(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let lower = trimmed.to_lowercase();
    for marker in REFUSAL_MARKERS {
        if trimmed.contains(marker) || lower.contains(&marker.to_lowercase()) {
            return String::new();
        }
    }
    trimmed.replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_names_language() {
        let d = translation_directive("fr");
        assert!(d.contains("into fr"));
    }

    #[test]
    fn refusal_chinese_filtered() {
        assert_eq!(strip_refusal("对不起，我无法提取图片中的数学公式内容。"), "");
    }

    #[test]
    fn refusal_english_filtered() {
        assert_eq!(strip_refusal("I'm sorry, I cannot extract formulas."), "");
        assert_eq!(strip_refusal("There is no mathematical formula here."), "");
    }

    #[test]
    fn formula_passes_through() {
        assert_eq!(strip_refusal("  $x = y + z$\n"), "$x = y + z$");
    }

    #[test]
    fn multiline_formula_collapsed_to_one_line() {
        assert_eq!(strip_refusal("$a = b$\n$c = d$"), "$a = b$ $c = d$");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(strip_refusal("   \n"), "");
    }
}
