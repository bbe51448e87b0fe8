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

//! Token budgeting and greedy context selection.

use storymesh_memory::ConversationTurn;

/// Rough chars-to-tokens ratio for LLM prompt text.
const TOKENS_PER_CHAR: f64 = 0.25;

/// Estimated token cost of a message.
pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() as f64 * TOKENS_PER_CHAR).ceil() as usize
}

/// A turn with its blended relevance score.
#[derive(Debug, Clone)]
pub struct ScoredTurn {
    pub turn: ConversationTurn,
    pub score: f64,
}

/// A turn that made it into the context budget.
#[derive(Debug, Clone)]
pub struct SelectedTurn {
    pub turn: ConversationTurn,
    pub score: f64,
    pub truncated: bool,
}

/// Greedily pack turns into the budget, in the given order.
///
/// Selection stops at the first turn that does not fit, even if a later
/// cheaper turn would. That keeps the output a prefix of the ranking:
/// everything included outranks everything excluded.
///
/// One special case: when the single best turn alone exceeds the whole
/// budget, it is truncated to fit and selection stops there.
pub fn select_within_budget(scored: Vec<ScoredTurn>, max_tokens: usize) -> Vec<SelectedTurn> {
    let mut selected = Vec::new();
    let mut current_tokens = 0usize;

    for entry in scored {
        let cost = estimate_tokens(&entry.turn.message);

        if current_tokens + cost <= max_tokens {
            current_tokens += cost;
            selected.push(SelectedTurn {
                turn: entry.turn,
                score: entry.score,
                truncated: false,
            });
        } else if selected.is_empty() {
            let keep = (max_tokens as f64 / TOKENS_PER_CHAR).floor() as usize;
            let mut turn = entry.turn;
            let mut message: String = turn.message.chars().take(keep).collect();
            message.push_str("...");
            turn.message = message;
            selected.push(SelectedTurn {
                turn,
                score: entry.score,
                truncated: true,
            });
            break;
        } else {
            break;
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use storymesh_memory::TurnRole;

    fn turn(message: &str) -> ConversationTurn {
        ConversationTurn::new("editor", TurnRole::Assistant, message, Utc::now())
    }

    fn scored(message: &str, score: f64) -> ScoredTurn {
        ScoredTurn {
            turn: turn(message),
            score,
        }
    }

    #[test]
    fn test_token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        // 40 chars at 0.25 tokens each.
        assert_eq!(estimate_tokens(&"x".repeat(40)), 10);
    }

    #[test]
    fn test_selection_respects_budget() {
        // 40 chars = 10 tokens each, budget fits exactly two.
        let items = vec![
            scored(&"a".repeat(40), 0.9),
            scored(&"b".repeat(40), 0.8),
            scored(&"c".repeat(40), 0.7),
        ];

        let selected = select_within_budget(items, 20);
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|s| !s.truncated));
        assert!((selected[0].score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_selection_stops_at_first_overflow() {
        // First fits, second does not, third would have fit but stays out.
        let items = vec![
            scored(&"a".repeat(40), 0.9), // 10 tokens
            scored(&"b".repeat(80), 0.8), // 20 tokens
            scored(&"c".repeat(8), 0.7),  // 2 tokens
        ];

        let selected = select_within_budget(items, 15);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].turn.message, "a".repeat(40));
    }

    #[test]
    fn test_oversized_first_turn_is_truncated() {
        // 400 chars = 100 tokens against a budget of 50.
        let items = vec![scored(&"x".repeat(400), 0.9), scored("short", 0.8)];

        let selected = select_within_budget(items, 50);
        assert_eq!(selected.len(), 1);
        assert!(selected[0].truncated);
        // floor(50 / 0.25) = 200 chars plus the ellipsis.
        assert_eq!(selected[0].turn.message.chars().count(), 203);
        assert!(selected[0].turn.message.ends_with("..."));
    }

    #[test]
    fn test_truncation_counts_chars_not_bytes() {
        // Multibyte text must not split inside a character.
        let long = "é".repeat(400);
        let items = vec![scored(&long, 0.9)];

        let selected = select_within_budget(items, 50);
        assert!(selected[0].truncated);
        assert_eq!(selected[0].turn.message.chars().count(), 203);
    }

    #[test]
    fn test_oversized_turn_after_selection_is_dropped_not_truncated() {
        let items = vec![
            scored(&"a".repeat(8), 0.9),   // 2 tokens, fits
            scored(&"b".repeat(400), 0.8), // 100 tokens, over budget
        ];

        let selected = select_within_budget(items, 50);
        assert_eq!(selected.len(), 1);
        assert!(!selected[0].truncated);
    }

    #[test]
    fn test_empty_input_selects_nothing() {
        assert!(select_within_budget(Vec::new(), 500).is_empty());
    }

    proptest! {
        /// Untruncated selections always fit the budget.
        #[test]
        fn prop_untruncated_selection_fits_budget(
            lengths in prop::collection::vec(0usize..300, 0..12),
            max_tokens in 1usize..200,
        ) {
            let items: Vec<ScoredTurn> = lengths
                .iter()
                .enumerate()
                .map(|(i, len)| scored(&"m".repeat(*len), 1.0 - i as f64 * 0.01))
                .collect();

            let selected = select_within_budget(items, max_tokens);

            if selected.iter().all(|s| !s.truncated) {
                let total: usize = selected
                    .iter()
                    .map(|s| estimate_tokens(&s.turn.message))
                    .sum();
                prop_assert!(total <= max_tokens);
            } else {
                // Truncation only ever applies to a lone first selection.
                prop_assert_eq!(selected.len(), 1);
            }
        }
    }
}
