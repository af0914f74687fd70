//! Word-level comparison of expected vs transcribed text
//!
//! A pure presentation derivation over the prompt text and the service's
//! transcription: each expected word is compared against the actual word at
//! the same position.

/// Per-word verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordStatus {
    Correct,
    /// One word is a substring of the other.
    Partial,
    Incorrect,
}

/// One expected word with its verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct WordMark {
    pub word: String,
    pub status: WordStatus,
}

/// Compare expected text against the transcription, word by position.
/// Case-insensitive; words are whitespace-separated.
pub fn word_marks(expected: &str, actual: &str) -> Vec<WordMark> {
    let expected_lower = expected.to_lowercase();
    let actual_lower = actual.to_lowercase();
    let actual_words: Vec<&str> = actual_lower.split_whitespace().collect();

    expected_lower
        .split_whitespace()
        .enumerate()
        .map(|(i, expected_word)| {
            let actual_word = actual_words.get(i).copied().unwrap_or("");
            let status = if actual_word == expected_word {
                WordStatus::Correct
            } else if !actual_word.is_empty()
                && (expected_word.contains(actual_word) || actual_word.contains(expected_word))
            {
                WordStatus::Partial
            } else {
                WordStatus::Incorrect
            };
            WordMark {
                word: expected_word.to_string(),
                status,
            }
        })
        .collect()
}
