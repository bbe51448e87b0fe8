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

//! Agent affinity matrix.
//!
//! How much one agent's conversations matter to another. Scores are
//! directional: `score(target, source)` reads "how relevant is `source`'s
//! work when building context for `target`". Pairs with no entry fall back
//! to a default, so a custom agent slots in without editing the matrix.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_affinity() -> f64 {
    0.3
}

/// Directional relevance scores between agent pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAffinityMatrix {
    #[serde(default)]
    scores: HashMap<String, HashMap<String, f64>>,
    /// Fallback for pairs without an explicit entry
    #[serde(default = "default_affinity")]
    default_score: f64,
}

impl Default for AgentAffinityMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentAffinityMatrix {
    /// An empty matrix; every pair scores the default.
    pub fn new() -> Self {
        Self {
            scores: HashMap::new(),
            default_score: default_affinity(),
        }
    }

    /// Override the fallback score for unlisted pairs.
    pub fn with_default_score(mut self, score: f64) -> Self {
        self.default_score = score;
        self
    }

    /// Set the affinity of `source`'s turns when targeting `target`.
    pub fn set(&mut self, target: &str, source: &str, score: f64) {
        self.scores
            .entry(target.to_string())
            .or_default()
            .insert(source.to_string(), score);
    }

    /// Affinity of `source`'s turns for context aimed at `target`.
    pub fn score(&self, target: &str, source: &str) -> f64 {
        self.scores
            .get(target)
            .and_then(|row| row.get(source))
            .copied()
            .unwrap_or(self.default_score)
    }

    /// Agents with an explicit row in the matrix.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.scores.keys().map(String::as_str)
    }

    fn with_rows(rows: &[(&str, &[(&str, f64)])]) -> Self {
        let mut matrix = Self::new();
        for (target, pairs) in rows {
            for (source, score) in *pairs {
                matrix.set(target, source, *score);
            }
        }
        matrix
    }

    /// Matrix for the writing-studio agent roster.
    pub fn writing_studio() -> Self {
        Self::with_rows(&[
            (
                "plot-architect",
                &[
                    ("character-psychologist", 0.9),
                    ("world-builder", 0.8),
                    ("genre-specialist", 0.7),
                    ("dialogue-coach", 0.5),
                    ("style-mentor", 0.5),
                    ("editor", 0.4),
                    ("research-assistant", 0.6),
                ],
            ),
            (
                "character-psychologist",
                &[
                    ("plot-architect", 0.9),
                    ("dialogue-coach", 0.9),
                    ("world-builder", 0.6),
                    ("style-mentor", 0.5),
                    ("genre-specialist", 0.5),
                    ("editor", 0.4),
                    ("research-assistant", 0.6),
                ],
            ),
            (
                "dialogue-coach",
                &[
                    ("character-psychologist", 0.9),
                    ("plot-architect", 0.5),
                    ("style-mentor", 0.8),
                    ("genre-specialist", 0.6),
                    ("editor", 0.7),
                    ("world-builder", 0.4),
                    ("research-assistant", 0.5),
                ],
            ),
            (
                "world-builder",
                &[
                    ("plot-architect", 0.8),
                    ("genre-specialist", 0.8),
                    ("character-psychologist", 0.6),
                    ("research-assistant", 0.8),
                    ("style-mentor", 0.5),
                    ("dialogue-coach", 0.4),
                    ("editor", 0.4),
                ],
            ),
            (
                "genre-specialist",
                &[
                    ("plot-architect", 0.7),
                    ("world-builder", 0.8),
                    ("style-mentor", 0.8),
                    ("research-assistant", 0.7),
                    ("character-psychologist", 0.5),
                    ("dialogue-coach", 0.6),
                    ("editor", 0.6),
                ],
            ),
            (
                "style-mentor",
                &[
                    ("dialogue-coach", 0.8),
                    ("genre-specialist", 0.8),
                    ("editor", 0.9),
                    ("plot-architect", 0.5),
                    ("character-psychologist", 0.5),
                    ("world-builder", 0.5),
                    ("research-assistant", 0.5),
                ],
            ),
            (
                "editor",
                &[
                    ("style-mentor", 0.9),
                    ("dialogue-coach", 0.7),
                    ("genre-specialist", 0.6),
                    ("plot-architect", 0.4),
                    ("character-psychologist", 0.4),
                    ("world-builder", 0.4),
                    ("research-assistant", 0.5),
                ],
            ),
            (
                "research-assistant",
                &[
                    ("world-builder", 0.8),
                    ("genre-specialist", 0.7),
                    ("plot-architect", 0.6),
                    ("character-psychologist", 0.6),
                    ("dialogue-coach", 0.5),
                    ("style-mentor", 0.5),
                    ("editor", 0.5),
                ],
            ),
        ])
    }

    /// Matrix for the story-drive agent roster.
    pub fn story_drive() -> Self {
        Self::with_rows(&[
            (
                "plot",
                &[
                    ("character", 0.95),
                    ("world", 0.8),
                    ("genre", 0.7),
                    ("dialog", 0.5),
                    ("narrative", 0.9),
                    ("editor", 0.6),
                    ("reader", 0.6),
                ],
            ),
            (
                "character",
                &[
                    ("plot", 0.95),
                    ("dialog", 0.9),
                    ("world", 0.6),
                    ("narrative", 0.8),
                    ("genre", 0.5),
                    ("editor", 0.5),
                    ("reader", 0.7),
                ],
            ),
            (
                "dialog",
                &[
                    ("character", 0.9),
                    ("plot", 0.5),
                    ("editor", 0.8),
                    ("genre", 0.6),
                    ("narrative", 0.7),
                    ("world", 0.4),
                    ("reader", 0.6),
                ],
            ),
            (
                "world",
                &[
                    ("plot", 0.8),
                    ("genre", 0.85),
                    ("character", 0.6),
                    ("narrative", 0.8),
                    ("editor", 0.4),
                    ("dialog", 0.4),
                    ("reader", 0.5),
                ],
            ),
            (
                "genre",
                &[
                    ("plot", 0.7),
                    ("world", 0.85),
                    ("narrative", 0.7),
                    ("editor", 0.6),
                    ("character", 0.5),
                    ("dialog", 0.6),
                    ("reader", 0.6),
                ],
            ),
            (
                "editor",
                &[
                    ("narrative", 0.8),
                    ("dialog", 0.8),
                    ("plot", 0.6),
                    ("genre", 0.6),
                    ("character", 0.5),
                    ("world", 0.4),
                    ("reader", 0.7),
                ],
            ),
            (
                "reader",
                &[
                    ("plot", 0.6),
                    ("character", 0.7),
                    ("narrative", 0.6),
                    ("dialog", 0.6),
                    ("editor", 0.7),
                    ("world", 0.5),
                    ("genre", 0.6),
                ],
            ),
            (
                "narrative",
                &[
                    ("plot", 0.9),
                    ("character", 0.8),
                    ("world", 0.8),
                    ("editor", 0.8),
                    ("dialog", 0.7),
                    ("genre", 0.7),
                    ("reader", 0.6),
                ],
            ),
        ])
    }
}
