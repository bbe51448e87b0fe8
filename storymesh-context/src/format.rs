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

//! Context bundle assembly.
//!
//! Selected turns become a prompt-ready text block plus a structured view
//! of the same entries. Downstream consumers splice `formatted_text` into
//! an agent's system prompt; the refiner works from `entries` so it never
//! has to parse the text back apart.

use crate::roster::AgentRoster;
use crate::selection::SelectedTurn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storymesh_memory::TurnRole;

/// One selected turn as it appears in a bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    pub agent_id: String,
    pub role: TurnRole,
    /// Message text, already truncated if the budget required it
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub relevance_score: f64,
    pub truncated: bool,
}

/// Bookkeeping attached to a bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleMetadata {
    /// Number of entries in the bundle
    pub context_count: usize,
    /// Source agents in the order they appear in the text
    pub agents: Vec<String>,
    pub injected_at: DateTime<Utc>,
    pub target_agent: String,
    /// True once a refinement pass has narrowed the bundle
    #[serde(default)]
    pub filtered: bool,
    /// Entry count before refinement, when `filtered` is set
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub original_count: Option<usize>,
}

/// Cross-agent context ready for prompt injection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBundle {
    pub formatted_text: String,
    pub entries: Vec<ContextEntry>,
    pub metadata: BundleMetadata,
}

/// Assemble selected turns into a bundle for `target_agent`.
///
/// Entries are grouped by source agent in order of first appearance in
/// the ranking, chronological within each group. Returns `None` when
/// nothing was selected.
pub fn format_bundle(
    selected: Vec<SelectedTurn>,
    target_agent: &str,
    roster: &AgentRoster,
    now: DateTime<Utc>,
) -> Option<ContextBundle> {
    if selected.is_empty() {
        return None;
    }

    let mut groups: Vec<(String, Vec<SelectedTurn>)> = Vec::new();
    for sel in selected {
        match groups.iter_mut().find(|(id, _)| *id == sel.turn.agent_id) {
            Some((_, turns)) => turns.push(sel),
            None => groups.push((sel.turn.agent_id.clone(), vec![sel])),
        }
    }

    let mut text = String::from("[CONTEXT FROM OTHER AGENTS]\n");
    let mut entries = Vec::new();

    for (agent_id, turns) in &mut groups {
        turns.sort_by_key(|s| s.turn.timestamp);

        let name = roster.display_name(agent_id);
        for sel in turns.iter() {
            let time_ago = format_time_ago(sel.turn.timestamp, now);
            match sel.turn.role {
                TurnRole::User => {
                    text.push_str(&format!(
                        "User to {} ({}): {}\n",
                        name, time_ago, sel.turn.message
                    ));
                }
                TurnRole::Assistant | TurnRole::System => {
                    text.push_str(&format!("{} ({}): {}\n", name, time_ago, sel.turn.message));
                }
            }
            if sel.truncated {
                text.push_str("[Message truncated for token limit]\n");
            }

            entries.push(ContextEntry {
                agent_id: sel.turn.agent_id.clone(),
                role: sel.turn.role,
                message: sel.turn.message.clone(),
                timestamp: sel.turn.timestamp,
                relevance_score: sel.score,
                truncated: sel.truncated,
            });
        }
    }

    text.push_str("[END CONTEXT]\n");

    let agents = groups.iter().map(|(id, _)| id.clone()).collect();
    Some(ContextBundle {
        formatted_text: text,
        metadata: BundleMetadata {
            context_count: entries.len(),
            agents,
            injected_at: now,
            target_agent: target_agent.to_string(),
            filtered: false,
            original_count: None,
        },
        entries,
    })
}

/// Coarse human-readable age label for a timestamp.
pub fn format_time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now - timestamp;
    let minutes = diff.num_minutes();
    let hours = diff.num_hours();

    if minutes < 1 {
        "just now".to_string()
    } else if minutes == 1 {
        "1 minute ago".to_string()
    } else if minutes < 60 {
        format!("{} minutes ago", minutes)
    } else if hours == 1 {
        "1 hour ago".to_string()
    } else {
        format!("{} hours ago", hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use storymesh_memory::ConversationTurn;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn selected(
        agent_id: &str,
        role: TurnRole,
        message: &str,
        age_minutes: i64,
        score: f64,
    ) -> SelectedTurn {
        SelectedTurn {
            turn: ConversationTurn::new(
                agent_id,
                role,
                message,
                now() - Duration::minutes(age_minutes),
            ),
            score,
            truncated: false,
        }
    }

    #[test]
    fn test_time_labels_at_boundaries() {
        let base = now();

        assert_eq!(format_time_ago(base, base), "just now");
        assert_eq!(format_time_ago(base - Duration::seconds(59), base), "just now");
        assert_eq!(format_time_ago(base - Duration::seconds(60), base), "1 minute ago");
        assert_eq!(format_time_ago(base - Duration::seconds(119), base), "1 minute ago");
        assert_eq!(
            format_time_ago(base - Duration::minutes(5), base),
            "5 minutes ago"
        );
        assert_eq!(
            format_time_ago(base - Duration::seconds(3599), base),
            "59 minutes ago"
        );
        assert_eq!(format_time_ago(base - Duration::seconds(3600), base), "1 hour ago");
        assert_eq!(
            format_time_ago(base - Duration::seconds(7199), base),
            "1 hour ago"
        );
        assert_eq!(
            format_time_ago(base - Duration::seconds(7200), base),
            "2 hours ago"
        );
        assert_eq!(format_time_ago(base - Duration::hours(5), base), "5 hours ago");
    }

    #[test]
    fn test_future_timestamp_reads_just_now() {
        let base = now();
        assert_eq!(format_time_ago(base + Duration::minutes(3), base), "just now");
    }

    #[test]
    fn test_bundle_envelope_and_lines() {
        let roster = AgentRoster::writing_studio();
        let selected = vec![selected(
            "plot-architect",
            TurnRole::Assistant,
            "The heist goes wrong in chapter three",
            5,
            0.8,
        )];

        let bundle = format_bundle(selected, "editor", &roster, now()).unwrap();

        assert_eq!(
            bundle.formatted_text,
            "[CONTEXT FROM OTHER AGENTS]\n\
             Plot Architect (5 minutes ago): The heist goes wrong in chapter three\n\
             [END CONTEXT]\n"
        );
        assert_eq!(bundle.metadata.context_count, 1);
        assert_eq!(bundle.metadata.agents, vec!["plot-architect"]);
        assert_eq!(bundle.metadata.target_agent, "editor");
        assert!(!bundle.metadata.filtered);
        assert_eq!(bundle.entries.len(), 1);
        assert!((bundle.entries[0].relevance_score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_user_turns_get_attribution_prefix() {
        let roster = AgentRoster::writing_studio();
        let selected = vec![selected(
            "dialogue-coach",
            TurnRole::User,
            "Make the banter sharper",
            2,
            0.6,
        )];

        let bundle = format_bundle(selected, "editor", &roster, now()).unwrap();
        assert!(bundle
            .formatted_text
            .contains("User to Dialogue Coach (2 minutes ago): Make the banter sharper\n"));
    }

    #[test]
    fn test_groups_keep_first_appearance_order_and_sort_within() {
        let roster = AgentRoster::writing_studio();
        // Ranking order: editor newest first, then plot-architect, then an
        // older editor turn. Groups must come out editor-then-plot, with the
        // editor group re-sorted chronologically.
        let selected = vec![
            selected("editor", TurnRole::Assistant, "Cut the adverbs", 1, 0.9),
            selected("plot-architect", TurnRole::Assistant, "Add a betrayal", 10, 0.8),
            selected("editor", TurnRole::Assistant, "Trim chapter two", 30, 0.7),
        ];

        let bundle = format_bundle(selected, "style-mentor", &roster, now()).unwrap();

        assert_eq!(bundle.metadata.agents, vec!["editor", "plot-architect"]);
        let text = &bundle.formatted_text;
        let trim_pos = text.find("Trim chapter two").unwrap();
        let cut_pos = text.find("Cut the adverbs").unwrap();
        let betrayal_pos = text.find("Add a betrayal").unwrap();
        // Older editor turn renders before the newer one, both before plot.
        assert!(trim_pos < cut_pos);
        assert!(cut_pos < betrayal_pos);

        // Entries mirror the rendered order.
        let entry_messages: Vec<&str> =
            bundle.entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            entry_messages,
            vec!["Trim chapter two", "Cut the adverbs", "Add a betrayal"]
        );
    }

    #[test]
    fn test_truncated_entry_gets_marker_line() {
        let roster = AgentRoster::writing_studio();
        let mut sel = selected("editor", TurnRole::Assistant, "A very long note...", 1, 0.9);
        sel.truncated = true;

        let bundle = format_bundle(vec![sel], "plot-architect", &roster, now()).unwrap();
        assert!(bundle
            .formatted_text
            .contains("A very long note...\n[Message truncated for token limit]\n"));
        assert!(bundle.entries[0].truncated);
    }

    #[test]
    fn test_unknown_agent_renders_raw_id() {
        let roster = AgentRoster::story_drive();
        let selected = vec![selected("plot", TurnRole::Assistant, "Raise the stakes", 3, 0.5)];

        let bundle = format_bundle(selected, "editor", &roster, now()).unwrap();
        assert!(bundle
            .formatted_text
            .contains("plot (3 minutes ago): Raise the stakes\n"));
    }

    #[test]
    fn test_empty_selection_yields_no_bundle() {
        let roster = AgentRoster::new();
        assert!(format_bundle(Vec::new(), "editor", &roster, now()).is_none());
    }
}
