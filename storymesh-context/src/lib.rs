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

//! Storymesh Context Engine
//!
//! Cross-agent context sharing for multi-agent writing sessions. When a
//! user addresses one agent, the engine surfaces what the *other* agents
//! in the session have already said that bears on the message:
//! - **Relevance scoring**: Keyword overlap, lexical similarity, recency
//!   decay, and agent affinity blended with configurable weights
//! - **Token budgeting**: Greedy best-first packing into per-agent limits,
//!   truncating a lone oversized turn rather than dropping it
//! - **Prompt rendering**: A delimited text block grouped by source agent,
//!   plus the same entries in structured form
//! - **Refinement**: An optional stricter second pass that keeps only the
//!   few entries tied to the question being asked
//!
//! # Pipeline
//!
//! ```text
//! session history ──► score (self-excluded) ──► rank ──► budget ──► bundle
//!                                                                     │
//!                                              refine (optional) ◄────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use storymesh_context::RelevanceEngine;
//! use storymesh_memory::{MemoryConfig, SessionMemoryStore, SessionId, TurnRole};
//!
//! #[tokio::main]
//! async fn main() -> storymesh_context::ContextResult<()> {
//!     let store = SessionMemoryStore::new(MemoryConfig::default())?;
//!     let engine = RelevanceEngine::writing_studio(store.clone())?;
//!
//!     let session = SessionId::from_string("workshop-42");
//!     store
//!         .add_conversation(&session, "plot-architect", TurnRole::Assistant,
//!             "The heist should go wrong in chapter three")
//!         .await?;
//!
//!     if let Some(bundle) = engine
//!         .get_relevant_context(&session, "editor", "tighten the heist chapter")
//!         .await
//!     {
//!         println!("{}", bundle.formatted_text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod affinity;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod keywords;
pub mod refine;
pub mod roster;
pub mod scoring;
pub mod selection;

// Re-exports
pub use affinity::AgentAffinityMatrix;
pub use config::{EngineConfig, RelevanceWeights};
pub use engine::{EngineStats, RelevanceEngine};
pub use error::{ContextError, ContextResult};
pub use format::{BundleMetadata, ContextBundle, ContextEntry};
pub use keywords::KeywordExtractor;
pub use refine::{ContextRefiner, RefinerConfig};
pub use roster::AgentRoster;
pub use selection::{ScoredTurn, SelectedTurn};
