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

//! Cross-agent relevance engine.
//!
//! Given the turn a user is about to send to one agent, picks the turns
//! from *other* agents in the same session that are worth injecting into
//! that agent's prompt, ranks them, fits them into the target agent's
//! token budget, and renders the result as a [`ContextBundle`].
//!
//! Context lookup is strictly best-effort: a failure inside the pipeline
//! is logged and surfaces as "no context", never as an error to the chat
//! path.

use crate::affinity::AgentAffinityMatrix;
use crate::config::EngineConfig;
use crate::error::ContextResult;
use crate::format::{format_bundle, ContextBundle};
use crate::keywords::KeywordExtractor;
use crate::roster::AgentRoster;
use crate::scoring::{keyword_overlap, lexical_similarity, recency_score};
use crate::selection::{select_within_budget, ScoredTurn};
use chrono::Duration;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storymesh_memory::{Clock, ConversationTurn, SessionId, SessionMemoryStore};
use tracing::{debug, warn};

/// Selects and formats cross-agent context for prompt injection.
///
/// One engine serves every roster: the affinity matrix, display names,
/// and token budgets are injected at construction, so a writing-studio
/// engine and a story-drive engine differ only in configuration.
pub struct RelevanceEngine {
    store: Arc<SessionMemoryStore>,
    config: EngineConfig,
    affinity: AgentAffinityMatrix,
    roster: AgentRoster,
    keywords: KeywordExtractor,
    enabled: AtomicBool,
    /// Per-agent opt-outs; agents without an entry are enabled
    agent_overrides: parking_lot::RwLock<HashMap<String, bool>>,
    clock: Arc<dyn Clock>,
}

impl RelevanceEngine {
    /// Engine with a neutral affinity matrix and raw-id display names.
    pub fn new(store: Arc<SessionMemoryStore>, config: EngineConfig) -> ContextResult<Self> {
        Self::with_parts(store, config, AgentAffinityMatrix::new(), AgentRoster::new())
    }

    /// Engine with explicit affinity matrix and roster.
    ///
    /// Reads time from the store's clock so recency scores and expiry
    /// agree on "now".
    pub fn with_parts(
        store: Arc<SessionMemoryStore>,
        config: EngineConfig,
        affinity: AgentAffinityMatrix,
        roster: AgentRoster,
    ) -> ContextResult<Self> {
        config.validate()?;

        let clock = store.clock();
        Ok(Self {
            enabled: AtomicBool::new(config.enabled),
            agent_overrides: parking_lot::RwLock::new(HashMap::new()),
            keywords: KeywordExtractor::conversational(),
            store,
            config,
            affinity,
            roster,
            clock,
        })
    }

    /// Preconfigured engine for the writing-studio roster.
    pub fn writing_studio(store: Arc<SessionMemoryStore>) -> ContextResult<Self> {
        Self::with_parts(
            store,
            EngineConfig::writing_studio(),
            AgentAffinityMatrix::writing_studio(),
            AgentRoster::writing_studio(),
        )
    }

    /// Preconfigured engine for the story-drive roster.
    pub fn story_drive(store: Arc<SessionMemoryStore>) -> ContextResult<Self> {
        Self::with_parts(
            store,
            EngineConfig::story_drive(),
            AgentAffinityMatrix::story_drive(),
            AgentRoster::story_drive(),
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SessionMemoryStore> {
        &self.store
    }

    /// Relevant cross-agent context for `target_agent`, or `None` when the
    /// engine is disabled, the session is empty, or nothing scores high
    /// enough. Errors are logged and also yield `None`.
    pub async fn get_relevant_context(
        &self,
        session_id: &SessionId,
        target_agent: &str,
        user_message: &str,
    ) -> Option<ContextBundle> {
        if !self.enabled.load(Ordering::Relaxed) || !self.is_agent_enabled(target_agent) {
            return None;
        }

        match self
            .build_context(session_id, target_agent, user_message)
            .await
        {
            Ok(bundle) => bundle,
            Err(err) => {
                warn!(
                    "Context lookup failed for agent {} in session {}: {}",
                    target_agent, session_id, err
                );
                None
            }
        }
    }

    async fn build_context(
        &self,
        session_id: &SessionId,
        target_agent: &str,
        user_message: &str,
    ) -> ContextResult<Option<ContextBundle>> {
        let conversations = self.store.get_all_conversations(session_id).await?;
        if conversations.is_empty() {
            return Ok(None);
        }

        let scored = self.score_turns(&conversations, target_agent, user_message);
        debug!(
            "Session {}: {} of {} turns relevant for {}",
            session_id,
            scored.len(),
            conversations.len(),
            target_agent
        );

        let max_tokens = self.config.token_limit_for(target_agent);
        let selected = select_within_budget(scored, max_tokens);
        if selected.is_empty() {
            return Ok(None);
        }

        Ok(format_bundle(
            selected,
            target_agent,
            &self.roster,
            self.clock.now(),
        ))
    }

    /// Score every other agent's turn against the user message, drop those
    /// at or below the threshold, and rank the rest best-first. Equal
    /// scores keep their chronological order.
    fn score_turns(
        &self,
        conversations: &[ConversationTurn],
        target_agent: &str,
        user_message: &str,
    ) -> Vec<ScoredTurn> {
        let now = self.clock.now();
        let weights = self.config.weights.normalized();
        let message_keywords = self.keywords.extract(user_message);

        let mut scored = Vec::new();
        for turn in conversations {
            // The target agent already knows its own conversation.
            if turn.agent_id == target_agent {
                continue;
            }

            let turn_keywords = self.keywords.extract(&turn.message);
            let keyword_score = keyword_overlap(&message_keywords, &turn_keywords);
            let semantic_score = lexical_similarity(user_message, &turn.message);
            let recency = recency_score(now - turn.timestamp, Duration::hours(1));
            let affinity = self.affinity.score(target_agent, &turn.agent_id);

            let score = keyword_score * weights.keyword_match
                + semantic_score * weights.semantic_similarity
                + recency * weights.recency
                + affinity * weights.agent_affinity;

            if score > self.config.score_threshold {
                scored.push(ScoredTurn {
                    turn: turn.clone(),
                    score,
                });
            }
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored
    }

    /// Turn the whole engine on or off at runtime.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Opt a single agent in or out of receiving context.
    pub fn set_agent_enabled(&self, agent_id: &str, enabled: bool) {
        self.agent_overrides
            .write()
            .insert(agent_id.to_string(), enabled);
    }

    pub fn is_agent_enabled(&self, agent_id: &str) -> bool {
        self.agent_overrides
            .read()
            .get(agent_id)
            .copied()
            .unwrap_or(true)
    }

    /// Snapshot of the engine's switches, budgets, and affinity matrix.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            enabled: self.is_enabled(),
            agent_overrides: self.agent_overrides.read().clone(),
            token_limits: self.config.agent_token_limits.clone(),
            default_max_tokens: self.config.default_max_tokens,
            weights: self.config.weights.clone(),
            affinity: self.affinity.clone(),
        }
    }
}

impl std::fmt::Debug for RelevanceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelevanceEngine")
            .field("config", &self.config)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

/// Engine switches and budgets for inspection endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub enabled: bool,
    pub agent_overrides: HashMap<String, bool>,
    pub token_limits: HashMap<String, usize>,
    pub default_max_tokens: usize,
    pub weights: crate::config::RelevanceWeights,
    pub affinity: AgentAffinityMatrix,
}
