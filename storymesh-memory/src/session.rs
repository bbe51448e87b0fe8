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

//! Per-session state
//!
//! Each session owns an insertion-ordered, bounded log of turns plus the
//! access metadata the TTL sweep reads. The store wraps every instance in
//! its own async mutex; nothing here locks.

use crate::turn::ConversationTurn;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Mutable state of one session. Invariant: `len() <= cap` passed to
/// [`SessionState::append`] holds after every append.
#[derive(Debug)]
pub(crate) struct SessionState {
    turns: VecDeque<ConversationTurn>,
    created: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
}

impl SessionState {
    /// Create an empty session stamped at the given instant.
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        Self {
            turns: VecDeque::new(),
            created: now,
            last_accessed: now,
        }
    }

    /// Record an access. Every read and write path calls this; the TTL
    /// sweep compares against it.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed = now;
    }

    /// Append a turn, evicting oldest turns past `cap`. Returns how many
    /// turns were evicted.
    pub(crate) fn append(&mut self, turn: ConversationTurn, cap: usize) -> usize {
        self.turns.push_back(turn);

        let mut evicted = 0;
        while self.turns.len() > cap {
            self.turns.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Turns in insertion order.
    pub(crate) fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the session has sat idle longer than `ttl`.
    pub(crate) fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_accessed > ttl
    }

    pub(crate) fn last_accessed(&self) -> DateTime<Utc> {
        self.last_accessed
    }

    /// Snapshot for the stats surface.
    pub(crate) fn detail(&self, session_id: &str) -> SessionDetail {
        SessionDetail {
            session_id: session_id.to_string(),
            conversation_count: self.turns.len(),
            created: self.created,
            last_accessed: self.last_accessed,
        }
    }
}

/// Per-session entry in the store's stats snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    pub session_id: String,
    pub conversation_count: usize,
    pub created: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::TurnRole;
    use proptest::prelude::*;

    fn turn(message: &str, now: DateTime<Utc>) -> ConversationTurn {
        ConversationTurn::new("plot-architect", TurnRole::Assistant, message, now)
    }

    #[test]
    fn test_append_within_cap_evicts_nothing() {
        let now = Utc::now();
        let mut state = SessionState::new(now);

        for i in 0..5 {
            let evicted = state.append(turn(&format!("Message {}", i + 1), now), 10);
            assert_eq!(evicted, 0);
        }
        assert_eq!(state.len(), 5);
    }

    #[test]
    fn test_append_past_cap_drops_oldest() {
        let now = Utc::now();
        let mut state = SessionState::new(now);

        for i in 0..7 {
            state.append(turn(&format!("Message {}", i + 1), now), 5);
        }

        let messages: Vec<&str> = state.turns().map(|t| t.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Message 3", "Message 4", "Message 5", "Message 6", "Message 7"]
        );
    }

    #[test]
    fn test_expiry_is_strict() {
        let now = Utc::now();
        let mut state = SessionState::new(now);
        state.touch(now);

        let ttl = Duration::hours(24);
        assert!(!state.is_expired(now + ttl, ttl));
        assert!(state.is_expired(now + ttl + Duration::seconds(1), ttl));
    }

    #[test]
    fn test_detail_snapshot() {
        let now = Utc::now();
        let mut state = SessionState::new(now);
        state.append(turn("Hello", now), 10);

        let detail = state.detail("session-1");
        assert_eq!(detail.session_id, "session-1");
        assert_eq!(detail.conversation_count, 1);
        assert_eq!(detail.created, now);
    }

    proptest! {
        /// After any sequence of appends the log holds at most `cap` turns,
        /// and exactly the most recent ones in original relative order.
        #[test]
        fn prop_eviction_keeps_recent_suffix(cap in 1usize..16, count in 0usize..48) {
            let now = Utc::now();
            let mut state = SessionState::new(now);

            for i in 0..count {
                state.append(turn(&format!("Message {}", i + 1), now), cap);
                prop_assert!(state.len() <= cap);
            }

            let expected: Vec<String> = (count.saturating_sub(cap)..count)
                .map(|i| format!("Message {}", i + 1))
                .collect();
            let actual: Vec<String> = state.turns().map(|t| t.message.clone()).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
