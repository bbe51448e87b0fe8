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

//! Agent display names.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maps agent ids to the names shown in formatted context. Ids without an
/// entry render as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRoster {
    display_names: HashMap<String, String>,
}

impl AgentRoster {
    /// An empty roster; every agent renders by raw id.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a display name for an agent id.
    pub fn with_name(mut self, agent_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.display_names.insert(agent_id.into(), name.into());
        self
    }

    /// Display name for an agent, falling back to the raw id.
    pub fn display_name<'a>(&'a self, agent_id: &'a str) -> &'a str {
        self.display_names
            .get(agent_id)
            .map(String::as_str)
            .unwrap_or(agent_id)
    }

    /// Roster for the writing-studio agents.
    pub fn writing_studio() -> Self {
        Self::new()
            .with_name("plot-architect", "Plot Architect")
            .with_name("character-psychologist", "Character Psychologist")
            .with_name("dialogue-coach", "Dialogue Coach")
            .with_name("world-builder", "World Builder")
            .with_name("genre-specialist", "Genre Specialist")
            .with_name("style-mentor", "Style Mentor")
            .with_name("editor", "Editor")
            .with_name("research-assistant", "Research Assistant")
    }

    /// Roster for the story-drive agents, which use their short ids as
    /// display names.
    pub fn story_drive() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_agent_renders_display_name() {
        let roster = AgentRoster::writing_studio();
        assert_eq!(roster.display_name("plot-architect"), "Plot Architect");
        assert_eq!(roster.display_name("editor"), "Editor");
    }

    #[test]
    fn test_unknown_agent_renders_raw_id() {
        let roster = AgentRoster::writing_studio();
        assert_eq!(roster.display_name("muse"), "muse");

        let empty = AgentRoster::story_drive();
        assert_eq!(empty.display_name("plot"), "plot");
    }

    #[test]
    fn test_with_name_overrides() {
        let roster = AgentRoster::writing_studio().with_name("editor", "Copy Editor");
        assert_eq!(roster.display_name("editor"), "Copy Editor");
    }
}
