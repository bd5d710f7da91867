//! Deterministic cleanup of raw transcription output.
//!
//! A fixed, order-sensitive rewrite pipeline: strip filler phrases, then
//! normalize the spacing and punctuation damage the stripping leaves behind.
//! Pure and idempotent - re-cleaning cleaned text changes nothing.

use std::sync::LazyLock;

use regex::Regex;

/// Filler words and phrases to strip, each replaced by a single space.
///
/// Order matters: longer, more specific phrases come first so they are
/// removed as a unit and never partially matched by a shorter rule.
/// Capitalized and lowercase variants are listed separately instead of case
/// folding, to avoid altering the case of surrounding text.
const FILLERS: &[&str] = &[
    "you know what I mean,",
    "you know what i mean,",
    "you know what I mean",
    "you know what i mean",
    "I mean,",
    "i mean,",
    "I mean",
    "i mean",
    "you know,",
    "You know,",
    "you know",
    "You know",
    ", like,",
    ", Like,",
    "like,",
    "Like,",
    ", um,",
    ", Um,",
    ", uh,",
    ", Uh,",
    "um,",
    "Um,",
    "uh,",
    "Uh,",
    " um ",
    " Um ",
    " uh ",
    " Uh ",
    " um.",
    " uh.",
];

static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new("  +").unwrap());
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([.,!?;:])").unwrap());
static SPACE_AFTER_TERMINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.!?])\s{2,}").unwrap());

/// Remove filler phrases and clean up spacing and punctuation.
///
/// Always returns a string (possibly empty); there are no error conditions.
pub fn clean_transcript(text: &str) -> String {
    let mut text = text.to_string();
    for filler in FILLERS {
        if text.contains(filler) {
            text = text.replace(filler, " ");
        }
    }

    let text = MULTI_SPACE.replace_all(&text, " ");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    let text = SPACE_AFTER_TERMINAL.replace_all(&text, "$1 ");
    text.trim().to_string()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_filler_phrases_longest_first() {
        assert_eq!(
            clean_transcript("I mean, you know what I mean, the project is great"),
            "the project is great"
        );
    }

    #[test]
    fn test_long_phrase_not_partially_matched() {
        // "you know what I mean" must be removed as a unit; the standalone
        // "you know" rule must not leave "what I mean" behind.
        let cleaned = clean_transcript("so you know what I mean about it");
        assert!(!cleaned.contains("what I mean"));
        assert_eq!(cleaned, "so about it");
    }

    #[test]
    fn test_punctuation_spacing_cleanup() {
        assert_eq!(
            clean_transcript("hello ,  world !   next sentence"),
            "hello, world! next sentence"
        );
    }

    #[test]
    fn test_collapses_space_runs() {
        assert_eq!(clean_transcript("one    two  three"), "one two three");
    }

    #[test]
    fn test_collapses_tabs_after_sentence_end() {
        assert_eq!(clean_transcript("Done.\t\tNext thing"), "Done. Next thing");
    }

    #[test]
    fn test_strips_um_and_uh() {
        assert_eq!(
            clean_transcript("So, um, I think it works"),
            "So I think it works"
        );
        assert_eq!(clean_transcript("Uh, hello there"), "hello there");
    }

    #[test]
    fn test_strips_like_with_commas() {
        assert_eq!(
            clean_transcript("It was, like, really good."),
            "It was really good."
        );
    }

    #[test]
    fn test_case_of_surrounding_text_is_preserved() {
        assert_eq!(
            clean_transcript("You know, The Answer is Yes"),
            "The Answer is Yes"
        );
    }

    #[test]
    fn test_trims_edges() {
        assert_eq!(clean_transcript("  hello world  "), "hello world");
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        assert_eq!(clean_transcript(""), "");
        assert_eq!(clean_transcript("   "), "");
    }

    #[test]
    fn test_clean_text_passes_through() {
        assert_eq!(
            clean_transcript("The quick brown fox jumps over the lazy dog."),
            "The quick brown fox jumps over the lazy dog."
        );
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "I mean, you know what I mean, the project is great",
            "hello ,  world !   next sentence",
            "So, um, I think, you know, it works",
            "It was, like, really good.",
            "Um, hello there",
            "One sentence.  Two sentences.   Three.",
            "plain text with no fillers",
            "",
        ];

        for input in inputs {
            let once = clean_transcript(input);
            let twice = clean_transcript(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", input);
        }
    }
}
