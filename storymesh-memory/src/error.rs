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

//! Session memory error types

use thiserror::Error;

/// Result type for session memory operations
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Errors that can occur in the session memory store
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Session ID was empty or blank
    #[error("Invalid session ID: {0:?}")]
    InvalidSessionId(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
