//! Text cleanup applied before chunking and query encoding

use once_cell::sync::Lazy;
use regex::Regex;

static CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("valid regex"));

static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Strip control characters and collapse whitespace runs to single spaces
pub fn preprocess_text(text: &str) -> String {
    let cleaned = CONTROL_CHARS.replace_all(text, "");
    WHITESPACE_RUNS.replace_all(&cleaned, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(
            preprocess_text("  Seoul\n\n is\tthe   capital "),
            "Seoul is the capital"
        );
    }

    #[test]
    fn test_strips_control_characters() {
        assert_eq!(preprocess_text("Bu\u{0}san\u{7}"), "Busan");
    }

    #[test]
    fn test_blank_input() {
        assert_eq!(preprocess_text(" \n\t "), "");
    }
}
