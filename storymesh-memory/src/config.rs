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

//! Session memory configuration.

use crate::error::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};

/// Configuration for the session memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Hard cap on turns kept per session; oldest turns evict first.
    #[serde(default = "default_max_entries")]
    pub max_entries_per_session: usize,

    /// Idle seconds after which a session is eligible for cleanup.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Period of the background cleanup sweep, in seconds.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

fn default_max_entries() -> usize {
    100
}

fn default_session_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_cleanup_interval_secs() -> u64 {
    60 * 60
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_entries_per_session: default_max_entries(),
            session_ttl_secs: default_session_ttl_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl MemoryConfig {
    /// Check the configuration for values the store cannot operate with.
    pub fn validate(&self) -> MemoryResult<()> {
        if self.max_entries_per_session == 0 {
            return Err(MemoryError::Config(
                "max_entries_per_session must be at least 1".to_string(),
            ));
        }
        if self.session_ttl_secs == 0 {
            return Err(MemoryError::Config(
                "session_ttl_secs must be positive".to_string(),
            ));
        }
        if self.cleanup_interval_secs == 0 {
            return Err(MemoryError::Config(
                "cleanup_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Session idle timeout as a chrono duration, for age comparisons.
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl_secs as i64)
    }

    /// Sweep period as a std duration, for the tokio interval.
    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Set the per-session turn cap.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries_per_session = max;
        self
    }

    /// Set the idle timeout in seconds.
    pub fn with_session_ttl_secs(mut self, secs: u64) -> Self {
        self.session_ttl_secs = secs;
        self
    }

    /// Set the sweep period in seconds.
    pub fn with_cleanup_interval_secs(mut self, secs: u64) -> Self {
        self.cleanup_interval_secs = secs;
        self
    }
}
