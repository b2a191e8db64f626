//! Text normalization for matching playlist entries against the ledger.
//!
//! The result is a lossy canonical form: two strings that normalize to the
//! same value are treated as the same identity. It is not reversible.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Runs of whitespace, collapsed to a single space.
pub static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Letters, digits and `_`. Narrower than the regex crate's `\w`, which also
/// admits joiners (U+200C, U+200D) and connector punctuation such as "‿".
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Strip diacritics by NFKD decomposition followed by dropping combining marks.
/// e.g., "Beyoncé" → "Beyonce", "naïve" → "naive"
pub fn strip_diacritics(s: &str) -> String {
    s.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Normalize free text (track title or artist name) for equality comparison.
///
/// Lowercase, trim, decompose (NFKD) and drop the detached marks, remove
/// punctuation, collapse whitespace. Total over any input.
///
/// Compatibility decomposition can surface uppercase letters ("㎒" → "MHz"),
/// so case is folded again after decomposing; the final trim covers
/// punctuation that sat next to the edges. Both keep the function idempotent.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let folded = strip_diacritics(lowered.trim()).to_lowercase();
    let stripped: String = folded
        .chars()
        .filter(|&c| is_word_char(c) || c.is_whitespace())
        .collect();
    WHITESPACE_RUN
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

// ============================================================================
// TESTS
// ============================================================================
