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

//! Relevance engine configuration.

use crate::error::{ContextError, ContextResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_enabled() -> bool {
    true
}

fn default_max_tokens() -> usize {
    500
}

fn default_score_threshold() -> f64 {
    0.1
}

fn default_keyword_weight() -> f64 {
    0.3
}

fn default_semantic_weight() -> f64 {
    0.3
}

fn default_recency_weight() -> f64 {
    0.2
}

fn default_affinity_weight() -> f64 {
    0.2
}

/// Weights for blending the relevance signals.
///
/// Weights are relative; the engine normalizes them to sum to 1 before
/// scoring, which keeps blended scores in `[0, 1]` no matter what the
/// configuration says.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceWeights {
    #[serde(default = "default_keyword_weight")]
    pub keyword_match: f64,
    #[serde(default = "default_semantic_weight")]
    pub semantic_similarity: f64,
    #[serde(default = "default_recency_weight")]
    pub recency: f64,
    #[serde(default = "default_affinity_weight")]
    pub agent_affinity: f64,
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self {
            keyword_match: default_keyword_weight(),
            semantic_similarity: default_semantic_weight(),
            recency: default_recency_weight(),
            agent_affinity: default_affinity_weight(),
        }
    }
}

impl RelevanceWeights {
    pub fn sum(&self) -> f64 {
        self.keyword_match + self.semantic_similarity + self.recency + self.agent_affinity
    }

    /// Scaled copy whose weights sum to 1.
    pub fn normalized(&self) -> Self {
        let sum = self.sum();
        Self {
            keyword_match: self.keyword_match / sum,
            semantic_similarity: self.semantic_similarity / sum,
            recency: self.recency / sum,
            agent_affinity: self.agent_affinity / sum,
        }
    }

    pub fn validate(&self) -> ContextResult<()> {
        let weights = [
            self.keyword_match,
            self.semantic_similarity,
            self.recency,
            self.agent_affinity,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ContextError::Config(
                "relevance weights must be finite and non-negative".to_string(),
            ));
        }
        if self.sum() <= 0.0 {
            return Err(ContextError::Config(
                "relevance weights must not all be zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Relevance engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Master switch; a disabled engine returns no context
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Token budget for agents without an explicit limit
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: usize,
    /// Per-agent token budgets
    #[serde(default)]
    pub agent_token_limits: HashMap<String, usize>,
    /// Turns scoring at or below this are dropped before selection
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,
    #[serde(default)]
    pub weights: RelevanceWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            default_max_tokens: default_max_tokens(),
            agent_token_limits: HashMap::new(),
            score_threshold: default_score_threshold(),
            weights: RelevanceWeights::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> ContextResult<()> {
        if self.default_max_tokens == 0 {
            return Err(ContextError::Config(
                "default_max_tokens must be at least 1".to_string(),
            ));
        }
        if let Some((agent, _)) = self.agent_token_limits.iter().find(|(_, limit)| **limit == 0) {
            return Err(ContextError::Config(format!(
                "token limit for agent {:?} must be at least 1",
                agent
            )));
        }
        if !self.score_threshold.is_finite() || !(0.0..1.0).contains(&self.score_threshold) {
            return Err(ContextError::Config(
                "score_threshold must be in [0, 1)".to_string(),
            ));
        }
        self.weights.validate()
    }

    /// Token budget for one agent.
    pub fn token_limit_for(&self, agent_id: &str) -> usize {
        self.agent_token_limits
            .get(agent_id)
            .copied()
            .unwrap_or(self.default_max_tokens)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_default_max_tokens(mut self, tokens: usize) -> Self {
        self.default_max_tokens = tokens;
        self
    }

    pub fn with_agent_limit(mut self, agent_id: impl Into<String>, tokens: usize) -> Self {
        self.agent_token_limits.insert(agent_id.into(), tokens);
        self
    }

    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn with_weights(mut self, weights: RelevanceWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Budgets tuned for the writing-studio roster.
    pub fn writing_studio() -> Self {
        Self::default()
            .with_agent_limit("plot-architect", 750)
            .with_agent_limit("character-psychologist", 600)
            .with_agent_limit("dialogue-coach", 400)
            .with_agent_limit("research-assistant", 1000)
            .with_agent_limit("world-builder", 500)
            .with_agent_limit("genre-specialist", 400)
            .with_agent_limit("editor", 300)
            .with_agent_limit("style-mentor", 400)
    }

    /// Budgets tuned for the story-drive roster.
    pub fn story_drive() -> Self {
        Self::default()
            .with_agent_limit("plot", 750)
            .with_agent_limit("character", 600)
            .with_agent_limit("dialog", 500)
            .with_agent_limit("world", 600)
            .with_agent_limit("genre", 400)
            .with_agent_limit("editor", 400)
            .with_agent_limit("reader", 350)
            .with_agent_limit("narrative", 700)
    }
}
