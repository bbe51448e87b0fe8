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

//! Context refinement.
//!
//! A second, stricter pass over an already-built bundle. Where the engine
//! asks "is this turn at all relevant", the refiner asks "does this turn
//! bear on the question being asked right now" and keeps only the few
//! strongest entries. Useful for terse agents whose prompts should carry
//! the minimum of cross-talk.

use crate::error::{ContextError, ContextResult};
use crate::format::{format_time_ago, BundleMetadata, ContextBundle, ContextEntry};
use crate::keywords::KeywordExtractor;
use crate::roster::AgentRoster;
use crate::scoring::{overlap_coefficient, recency_score};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storymesh_memory::Clock;

fn default_min_relevance() -> f64 {
    0.5
}

fn default_max_entries() -> usize {
    3
}

fn default_direct_mention() -> f64 {
    1.0
}

fn default_topic_overlap() -> f64 {
    0.7
}

fn default_entity_match() -> f64 {
    0.6
}

fn default_thematic_link() -> f64 {
    0.4
}

/// Refinement thresholds.
///
/// The three overlap tiers map increasing keyword overlap with the user
/// message to fixed scores; a direct mention of the source agent by name
/// outranks them all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinerConfig {
    /// Entries scoring below this are dropped
    #[serde(default = "default_min_relevance")]
    pub min_relevance: f64,
    /// At most this many entries survive
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_direct_mention")]
    pub direct_mention: f64,
    /// Overlap above 0.4
    #[serde(default = "default_topic_overlap")]
    pub topic_overlap: f64,
    /// Overlap above 0.2
    #[serde(default = "default_entity_match")]
    pub entity_match: f64,
    /// Overlap above 0.1
    #[serde(default = "default_thematic_link")]
    pub thematic_link: f64,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            min_relevance: default_min_relevance(),
            max_entries: default_max_entries(),
            direct_mention: default_direct_mention(),
            topic_overlap: default_topic_overlap(),
            entity_match: default_entity_match(),
            thematic_link: default_thematic_link(),
        }
    }
}

impl RefinerConfig {
    pub fn validate(&self) -> ContextResult<()> {
        if self.max_entries == 0 {
            return Err(ContextError::Config(
                "max_entries must be at least 1".to_string(),
            ));
        }
        let scores = [
            self.min_relevance,
            self.direct_mention,
            self.topic_overlap,
            self.entity_match,
            self.thematic_link,
        ];
        if scores.iter().any(|s| !s.is_finite() || !(0.0..=1.0).contains(s)) {
            return Err(ContextError::Config(
                "refinement scores must be in [0, 1]".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_min_relevance(mut self, min: f64) -> Self {
        self.min_relevance = min;
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }
}

/// Narrows a [`ContextBundle`] to the entries that bear on one message.
pub struct ContextRefiner {
    config: RefinerConfig,
    roster: AgentRoster,
    keywords: KeywordExtractor,
    clock: Arc<dyn Clock>,
}

impl ContextRefiner {
    /// Refiner with default thresholds.
    pub fn new(roster: AgentRoster, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: RefinerConfig::default(),
            keywords: KeywordExtractor::refinement(),
            roster,
            clock,
        }
    }

    /// Refiner with custom thresholds.
    pub fn with_config(
        config: RefinerConfig,
        roster: AgentRoster,
        clock: Arc<dyn Clock>,
    ) -> ContextResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            keywords: KeywordExtractor::refinement(),
            roster,
            clock,
        })
    }

    pub fn config(&self) -> &RefinerConfig {
        &self.config
    }

    /// Re-score a bundle against the message actually being sent and keep
    /// only the strongest entries. Returns `None` when nothing survives.
    ///
    /// The refined text always uses plain `Name (time): message` lines;
    /// attribution prefixes and truncation markers from the original
    /// rendering are not carried over.
    pub fn refine(&self, bundle: &ContextBundle, user_message: &str) -> Option<ContextBundle> {
        if bundle.entries.is_empty() {
            return None;
        }

        let now = self.clock.now();
        let lower_message = user_message.to_lowercase();
        let message_keywords = self.keywords.extract(user_message);

        let mut scored: Vec<(f64, &ContextEntry)> = bundle
            .entries
            .iter()
            .map(|entry| {
                (
                    self.score_entry(entry, &lower_message, &message_keywords, now),
                    entry,
                )
            })
            .collect();

        scored.retain(|(score, _)| *score >= self.config.min_relevance);
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(self.config.max_entries);

        if scored.is_empty() {
            return None;
        }

        let mut text = String::from("[CONTEXT FROM OTHER AGENTS]\n");
        let mut entries = Vec::with_capacity(scored.len());
        let mut agents: Vec<String> = Vec::new();

        for (score, entry) in &scored {
            let name = self.roster.display_name(&entry.agent_id);
            let time_ago = format_time_ago(entry.timestamp, now);
            text.push_str(&format!("{} ({}): {}\n", name, time_ago, entry.message));

            if !agents.iter().any(|a| a == &entry.agent_id) {
                agents.push(entry.agent_id.clone());
            }

            let mut kept = (*entry).clone();
            kept.relevance_score = *score;
            entries.push(kept);
        }
        text.push_str("[END CONTEXT]\n");

        Some(ContextBundle {
            formatted_text: text,
            metadata: BundleMetadata {
                context_count: entries.len(),
                agents,
                injected_at: bundle.metadata.injected_at,
                target_agent: bundle.metadata.target_agent.clone(),
                filtered: true,
                original_count: Some(bundle.entries.len()),
            },
            entries,
        })
    }

    /// Score one entry: the best matching tier, plus a small boost for
    /// entries under ten minutes old, capped at 1.
    fn score_entry(
        &self,
        entry: &ContextEntry,
        lower_message: &str,
        message_keywords: &[String],
        now: DateTime<Utc>,
    ) -> f64 {
        let mut score: f64 = 0.0;

        let display = self.roster.display_name(&entry.agent_id).to_lowercase();
        if !display.is_empty() && lower_message.contains(&display) {
            score = score.max(self.config.direct_mention);
        }

        let entry_keywords = self.keywords.extract(&entry.message);
        let overlap = overlap_coefficient(message_keywords, &entry_keywords);
        if overlap > 0.4 {
            score = score.max(self.config.topic_overlap);
        } else if overlap > 0.2 {
            score = score.max(self.config.entity_match);
        } else if overlap > 0.1 {
            score = score.max(self.config.thematic_link);
        }

        let boost = recency_score(now - entry.timestamp, Duration::minutes(10)) * 0.1;
        (score + boost).min(1.0)
    }
}

impl std::fmt::Debug for ContextRefiner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRefiner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
