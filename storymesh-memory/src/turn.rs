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

//! Conversation turns and session identity
//!
//! A turn is one message exchanged with one agent persona. Turns are
//! immutable once stored; the only thing that ever happens to them is
//! FIFO eviction when a session log overflows its cap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new unique ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is usable as a storage key.
    /// Empty and whitespace-only ids are rejected by every store operation.
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The human user addressing an agent
    User,
    /// An agent persona's reply
    Assistant,
    /// System-injected content
    System,
}

impl TurnRole {
    /// String form used in logs and wire formats
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
            TurnRole::System => "system",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One message exchanged with one agent persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Which persona produced or received this turn
    pub agent_id: String,
    /// Speaker role
    pub role: TurnRole,
    /// Message text
    pub message: String,
    /// Insertion time, assigned by the store's clock
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a turn stamped at the given instant
    pub fn new(
        agent_id: impl Into<String>,
        role: TurnRole,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            role,
            message: message.into(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_validity() {
        assert!(SessionId::new().is_valid());
        assert!(SessionId::from_string("session-123").is_valid());
        assert!(!SessionId::from_string("").is_valid());
        assert!(!SessionId::from_string("   ").is_valid());
    }

    #[test]
    fn test_role_serde_is_lowercase() {
        let json = serde_json::to_string(&TurnRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");

        let role: TurnRole = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, TurnRole::User);
    }

    #[test]
    fn test_turn_construction() {
        let now = Utc::now();
        let turn = ConversationTurn::new("plot-architect", TurnRole::Assistant, "Try a twist", now);

        assert_eq!(turn.agent_id, "plot-architect");
        assert_eq!(turn.role.as_str(), "assistant");
        assert_eq!(turn.timestamp, now);
    }
}
