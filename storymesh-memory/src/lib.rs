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

//! Storymesh Session Memory
//!
//! Bounded, in-process conversation memory for multi-agent writing
//! assistants:
//! - **Session logs**: Append-only turn history partitioned by session
//! - **Bounded growth**: Per-session entry cap with oldest-first eviction
//! - **Idle expiry**: Background sweep removes sessions past their TTL
//! - **Deterministic time**: Pluggable clock so expiry and recency are
//!   testable without sleeping
//!
//! # Architecture
//!
//! Every session owns its own async mutex, so agents writing to different
//! sessions never contend and writes within one session serialize cleanly:
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │                SessionMemoryStore                  │
//! │  ┌──────────────────────────────────────────────┐  │
//! │  │ RwLock<HashMap<session, Mutex<SessionState>>>│  │
//! │  │   "abc" ─► [turn, turn, turn, ...] ≤ cap     │  │
//! │  │   "def" ─► [turn, turn]                      │  │
//! │  └──────────────────────────────────────────────┘  │
//! │            ▲                        │              │
//! │       add / query            cleanup sweep (TTL)   │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use storymesh_memory::{MemoryConfig, SessionMemoryStore, SessionId, TurnRole};
//!
//! #[tokio::main]
//! async fn main() -> storymesh_memory::MemoryResult<()> {
//!     let store = SessionMemoryStore::new(MemoryConfig::default())?;
//!
//!     let session = SessionId::from_string("workshop-42");
//!     store
//!         .add_conversation(&session, "plot-architect", TurnRole::Assistant,
//!             "The heist should go wrong in chapter three")
//!         .await?;
//!
//!     let history = store.get_all_conversations(&session).await?;
//!     assert_eq!(history.len(), 1);
//!
//!     store.destroy().await;
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod session;
pub mod store;
pub mod turn;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::MemoryConfig;
pub use error::{MemoryError, MemoryResult};
pub use session::SessionDetail;
pub use store::{HistoryQuery, SessionMemoryStore, StoreStats};
pub use turn::{ConversationTurn, SessionId, TurnRole};
