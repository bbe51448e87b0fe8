// Copyright 2025 Storymesh (https://github.com/storymesh)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Keyword extraction from conversational text.
//!
//! Deliberately lightweight: lowercase, strip punctuation, drop stopwords
//! and very short words. Good enough to detect topic overlap between chat
//! turns without pulling in an NLP stack.

use regex::Regex;
use std::collections::HashSet;

/// Stopwords for scoring chat turns against each other.
const CONVERSATIONAL_STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "up", "about", "into", "through", "during", "is", "are", "was", "were", "been", "be",
    "have", "has", "had", "do", "does", "did", "will", "would", "could", "should", "may", "might",
    "i", "you", "he", "she", "it", "we", "they", "me", "him", "her",
];

/// Stopwords for refinement scoring. Swaps a few pronouns for question
/// words and demonstratives, which carry no topic signal in a follow-up
/// question.
const REFINEMENT_STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "up", "about", "into", "through", "during", "is", "are", "was", "were", "been", "be",
    "have", "has", "had", "do", "does", "did", "will", "would", "could", "should", "may", "might",
    "i", "you", "he", "she", "it", "we", "they", "what", "which", "who", "when", "where", "why",
    "how", "this", "that", "these", "those",
];

/// Keyword extractor with a fixed stopword list.
pub struct KeywordExtractor {
    stopwords: HashSet<&'static str>,
    strip_re: Regex,
    min_word_len: usize,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::conversational()
    }
}

impl KeywordExtractor {
    /// Extractor tuned for scoring chat turns.
    pub fn conversational() -> Self {
        Self::with_stopwords(CONVERSATIONAL_STOPWORDS)
    }

    /// Extractor tuned for refinement of already-selected context.
    pub fn refinement() -> Self {
        Self::with_stopwords(REFINEMENT_STOPWORDS)
    }

    fn with_stopwords(stopwords: &'static [&'static str]) -> Self {
        Self {
            stopwords: stopwords.iter().copied().collect(),
            strip_re: Regex::new(r"[^\w\s]").unwrap(),
            min_word_len: 3,
        }
    }

    /// Extract keywords in text order. Duplicates are kept so callers can
    /// weight overlap by raw keyword counts.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let stripped = self.strip_re.replace_all(&lowered, " ");

        stripped
            .split_whitespace()
            .filter(|word| {
                word.chars().count() >= self.min_word_len && !self.stopwords.contains(word)
            })
            .map(str::to_string)
            .collect()
    }
}

impl std::fmt::Debug for KeywordExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeywordExtractor")
            .field("stopwords", &self.stopwords.len())
            .field("min_word_len", &self.min_word_len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopwords_and_short_words_dropped() {
        let extractor = KeywordExtractor::conversational();

        let keywords = extractor.extract("The villain is hiding in an old lighthouse");
        assert_eq!(keywords, vec!["villain", "hiding", "old", "lighthouse"]);
    }

    #[test]
    fn test_punctuation_stripped_and_case_folded() {
        let extractor = KeywordExtractor::conversational();

        let keywords = extractor.extract("Chapter Three: the HEIST goes wrong!");
        assert_eq!(keywords, vec!["chapter", "three", "heist", "goes", "wrong"]);
    }

    #[test]
    fn test_duplicates_preserved() {
        let extractor = KeywordExtractor::conversational();

        let keywords = extractor.extract("dragons, dragons, more dragons");
        assert_eq!(keywords, vec!["dragons", "dragons", "more", "dragons"]);
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        let extractor = KeywordExtractor::conversational();

        assert!(extractor.extract("").is_empty());
        assert!(extractor.extract("  ...  ").is_empty());
    }

    #[test]
    fn test_refinement_list_drops_question_words() {
        let conversational = KeywordExtractor::conversational();
        let refinement = KeywordExtractor::refinement();

        // Question words survive the conversational list but not the
        // refinement list.
        assert_eq!(conversational.extract("what happens next"), vec!["what", "happens", "next"]);
        assert_eq!(refinement.extract("what happens next"), vec!["happens", "next"]);

        // And the other way around for pronouns.
        assert_eq!(conversational.extract("tell her everything"), vec!["tell", "everything"]);
        assert_eq!(refinement.extract("tell her everything"), vec!["tell", "her", "everything"]);
    }
}
