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

//! Session memory store
//!
//! In-process, bounded storage of conversation turns partitioned by
//! session. Each session's log sits behind its own async mutex, so
//! concurrent operations on different sessions never contend while
//! operations on the same session serialize. A background sweep removes
//! sessions idle past the configured TTL.
//!
//! All state is volatile by design; nothing touches disk.

use crate::clock::{Clock, SystemClock};
use crate::config::MemoryConfig;
use crate::error::{MemoryError, MemoryResult};
use crate::session::{SessionDetail, SessionState};
use crate::turn::{ConversationTurn, SessionId, TurnRole};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

type SessionEntry = Arc<Mutex<SessionState>>;

/// Concurrency-safe store of per-session conversation logs.
///
/// Constructed once at process startup (inside a Tokio runtime, since the
/// cleanup sweep is spawned here) and torn down with [`destroy`]. The sweep
/// task holds only a weak reference, so a store that is simply dropped
/// stops sweeping on the next tick.
///
/// [`destroy`]: SessionMemoryStore::destroy
pub struct SessionMemoryStore {
    config: MemoryConfig,
    clock: Arc<dyn Clock>,
    /// Per-session state, each behind its own async mutex
    sessions: RwLock<HashMap<String, SessionEntry>>,
    sweep_handle: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl SessionMemoryStore {
    /// Create a store with the system clock.
    pub fn new(config: MemoryConfig) -> MemoryResult<Arc<Self>> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store reading time from the given clock.
    pub fn with_clock(config: MemoryConfig, clock: Arc<dyn Clock>) -> MemoryResult<Arc<Self>> {
        config.validate()?;

        let store = Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            sweep_handle: parking_lot::Mutex::new(None),
            config,
            clock,
        });

        let handle = Self::spawn_cleanup_sweep(Arc::downgrade(&store));
        *store.sweep_handle.lock() = Some(handle);

        Ok(store)
    }

    /// Active configuration.
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// The clock this store reads time from. Consumers that derive
    /// time-based signals from stored turns should share it.
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Append a turn to a session, creating the session if absent.
    ///
    /// The turn is stamped with the store clock's current time. If the log
    /// grows past `max_entries_per_session` the oldest turns are dropped in
    /// the same operation. Returns the stored turn.
    pub async fn add_conversation(
        &self,
        session_id: &SessionId,
        agent_id: &str,
        role: TurnRole,
        message: &str,
    ) -> MemoryResult<ConversationTurn> {
        Self::validate_id(session_id)?;

        let entry = self.session_entry(session_id).await;
        let mut state = entry.lock().await;

        let now = self.clock.now();
        let turn = ConversationTurn::new(agent_id, role, message, now);
        state.touch(now);
        let evicted = state.append(turn.clone(), self.config.max_entries_per_session);
        if evicted > 0 {
            debug!(
                "Session {}: evicted {} oldest turns past cap of {}",
                session_id, evicted, self.config.max_entries_per_session
            );
        }

        Ok(turn)
    }

    /// Turns for a session in insertion order, optionally filtered to one
    /// agent. A missing session yields an empty vec, not an error. Updates
    /// the session's last-accessed time.
    pub async fn get_conversation_history(
        &self,
        session_id: &SessionId,
        agent_id: Option<&str>,
    ) -> MemoryResult<Vec<ConversationTurn>> {
        let query = match agent_id {
            Some(agent) => HistoryQuery::new().agent(agent),
            None => HistoryQuery::new(),
        };
        self.query_history(session_id, &query).await
    }

    /// All turns for a session in insertion order.
    pub async fn get_all_conversations(
        &self,
        session_id: &SessionId,
    ) -> MemoryResult<Vec<ConversationTurn>> {
        self.get_conversation_history(session_id, None).await
    }

    /// Query a session's history with filtering and pagination.
    pub async fn query_history(
        &self,
        session_id: &SessionId,
        query: &HistoryQuery,
    ) -> MemoryResult<Vec<ConversationTurn>> {
        Self::validate_id(session_id)?;

        let entry = {
            let sessions = self.sessions.read().await;
            match sessions.get(session_id.as_str()) {
                Some(entry) => entry.clone(),
                None => return Ok(Vec::new()),
            }
        };

        let mut state = entry.lock().await;
        state.touch(self.clock.now());

        let mut results: Vec<ConversationTurn> = match &query.agent_id {
            Some(agent) => state
                .turns()
                .filter(|t| t.agent_id == *agent)
                .cloned()
                .collect(),
            None => state.turns().cloned().collect(),
        };

        if let Some(offset) = query.offset {
            results = results.into_iter().skip(offset).collect();
        }

        if let Some(limit) = query.limit {
            results.truncate(limit);
        }

        Ok(results)
    }

    /// Remove a session and its log entirely. Idempotent: clearing a
    /// session that does not exist succeeds.
    pub async fn clear_session(&self, session_id: &SessionId) -> MemoryResult<()> {
        Self::validate_id(session_id)?;

        let entry = {
            let sessions = self.sessions.read().await;
            match sessions.get(session_id.as_str()) {
                Some(entry) => entry.clone(),
                None => return Ok(()),
            }
        };

        // Hold the session lock across removal so an in-flight write for
        // this session cannot interleave with the delete.
        let _guard = entry.lock().await;
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id.as_str());

        Ok(())
    }

    /// Remove every session idle longer than the configured TTL. Returns
    /// how many were removed. Runs on the sweep timer but can also be
    /// invoked directly.
    pub async fn cleanup_expired_sessions(&self) -> usize {
        let ttl = self.config.session_ttl();

        let candidates: Vec<(String, SessionEntry)> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .map(|(id, entry)| (id.clone(), entry.clone()))
                .collect()
        };

        let mut removed = 0;
        for (id, entry) in candidates {
            let state = entry.lock().await;
            if !state.is_expired(self.clock.now(), ttl) {
                continue;
            }

            let mut sessions = self.sessions.write().await;
            // The session may have been cleared and recreated since the
            // snapshot; only remove the exact entry we checked.
            if let Some(current) = sessions.get(&id) {
                if Arc::ptr_eq(current, &entry) {
                    sessions.remove(&id);
                    removed += 1;
                    debug!(
                        "Session {}: expired (idle since {})",
                        id,
                        state.last_accessed()
                    );
                }
            }
        }

        removed
    }

    /// Snapshot of store-wide counts and per-session metadata. Does not
    /// update any session's last-accessed time.
    pub async fn stats(&self) -> StoreStats {
        let entries: Vec<(String, SessionEntry)> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .map(|(id, entry)| (id.clone(), entry.clone()))
                .collect()
        };

        let mut details = Vec::with_capacity(entries.len());
        for (id, entry) in entries {
            let state = entry.lock().await;
            details.push(state.detail(&id));
        }
        details.sort_by(|a, b| {
            a.created
                .cmp(&b.created)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });

        StoreStats {
            total_sessions: details.len(),
            total_conversations: details.iter().map(|d| d.conversation_count).sum(),
            session_details: details,
        }
    }

    /// Stop the cleanup sweep and drop all sessions. The store is not
    /// reusable afterwards.
    pub async fn destroy(&self) {
        if let Some(handle) = self.sweep_handle.lock().take() {
            handle.abort();
        }

        let mut sessions = self.sessions.write().await;
        sessions.clear();
    }

    fn validate_id(session_id: &SessionId) -> MemoryResult<()> {
        if !session_id.is_valid() {
            return Err(MemoryError::InvalidSessionId(session_id.0.clone()));
        }
        Ok(())
    }

    /// Fetch the entry for a session, creating it lazily on first write.
    async fn session_entry(&self, session_id: &SessionId) -> SessionEntry {
        {
            let sessions = self.sessions.read().await;
            if let Some(entry) = sessions.get(session_id.as_str()) {
                return entry.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SessionState::new(self.clock.now()))))
            .clone()
    }

    fn spawn_cleanup_sweep(store: Weak<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = match store.upgrade() {
                Some(store) => store.config.cleanup_interval(),
                None => return,
            };

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; a fresh store has
            // nothing to sweep yet.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let store = match store.upgrade() {
                    Some(store) => store,
                    None => break,
                };

                let removed = store.cleanup_expired_sessions().await;
                if removed > 0 {
                    info!("Cleaned up {} expired sessions", removed);
                }
            }
        })
    }
}

impl std::fmt::Debug for SessionMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMemoryStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Filtering and pagination options for [`SessionMemoryStore::query_history`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Keep only turns from this agent
    pub agent_id: Option<String>,
    /// Skip this many turns from the front
    pub offset: Option<usize>,
    /// Return at most this many turns
    pub limit: Option<usize>,
}

impl HistoryQuery {
    /// An unfiltered query returning the whole history
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter to one agent's turns
    pub fn agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Skip turns from the front
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Cap the number of returned turns
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Store-wide statistics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_sessions: usize,
    pub total_conversations: usize,
    pub session_details: Vec<SessionDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Arc<SessionMemoryStore> {
        SessionMemoryStore::new(MemoryConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_add_creates_session_lazily() {
        let store = store();
        let session = SessionId::from("session-1");

        let stats = store.stats().await;
        assert_eq!(stats.total_sessions, 0);

        store
            .add_conversation(&session, "plot-architect", TurnRole::User, "Hello")
            .await
            .unwrap();

        let stats = store.stats().await;
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.total_conversations, 1);
    }

    #[tokio::test]
    async fn test_add_returns_stored_turn() {
        let store = store();
        let session = SessionId::from("session-1");

        let turn = store
            .add_conversation(&session, "editor", TurnRole::Assistant, "Tighten the prose")
            .await
            .unwrap();

        assert_eq!(turn.agent_id, "editor");
        assert_eq!(turn.role, TurnRole::Assistant);
        assert_eq!(turn.message, "Tighten the prose");
    }

    #[tokio::test]
    async fn test_blank_session_id_is_rejected() {
        let store = store();

        let err = store
            .add_conversation(&SessionId::from("  "), "editor", TurnRole::User, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidSessionId(_)));

        let err = store
            .clear_session(&SessionId::from(""))
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidSessionId(_)));
    }

    #[tokio::test]
    async fn test_history_of_missing_session_is_empty() {
        let store = store();
        let history = store
            .get_all_conversations(&SessionId::from("nope"))
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_history_filters_by_agent() {
        let store = store();
        let session = SessionId::from("session-1");

        store
            .add_conversation(&session, "plot-architect", TurnRole::Assistant, "A twist")
            .await
            .unwrap();
        store
            .add_conversation(&session, "editor", TurnRole::Assistant, "A cut")
            .await
            .unwrap();
        store
            .add_conversation(&session, "plot-architect", TurnRole::User, "More twists")
            .await
            .unwrap();

        let all = store.get_all_conversations(&session).await.unwrap();
        assert_eq!(all.len(), 3);

        let plot = store
            .get_conversation_history(&session, Some("plot-architect"))
            .await
            .unwrap();
        assert_eq!(plot.len(), 2);
        assert!(plot.iter().all(|t| t.agent_id == "plot-architect"));
        assert_eq!(plot[0].message, "A twist");
        assert_eq!(plot[1].message, "More twists");
    }

    #[tokio::test]
    async fn test_query_pagination() {
        let store = store();
        let session = SessionId::from("session-1");

        for i in 1..=6 {
            store
                .add_conversation(
                    &session,
                    "editor",
                    TurnRole::Assistant,
                    &format!("Message {}", i),
                )
                .await
                .unwrap();
        }

        let page = store
            .query_history(&session, &HistoryQuery::new().offset(2).limit(3))
            .await
            .unwrap();
        let messages: Vec<&str> = page.iter().map(|t| t.message.as_str()).collect();
        assert_eq!(messages, vec!["Message 3", "Message 4", "Message 5"]);
    }

    #[tokio::test]
    async fn test_clear_session_is_idempotent() {
        let store = store();
        let session = SessionId::from("session-1");

        store
            .add_conversation(&session, "editor", TurnRole::User, "hi")
            .await
            .unwrap();

        store.clear_session(&session).await.unwrap();
        assert!(store.get_all_conversations(&session).await.unwrap().is_empty());

        // Second clear of a now-absent session still succeeds.
        store.clear_session(&session).await.unwrap();
    }

    #[tokio::test]
    async fn test_destroy_releases_sessions() {
        let store = store();
        let session = SessionId::from("session-1");

        store
            .add_conversation(&session, "editor", TurnRole::User, "hi")
            .await
            .unwrap();
        store.destroy().await;

        assert_eq!(store.stats().await.total_sessions, 0);
    }
}
