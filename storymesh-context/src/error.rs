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

//! Context engine error types

use thiserror::Error;

pub type ContextResult<T> = Result<T, ContextError>;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Memory store error: {0}")]
    Store(#[from] storymesh_memory::MemoryError),

    #[error("Configuration error: {0}")]
    Config(String),
}
