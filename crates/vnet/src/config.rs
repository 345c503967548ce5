// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

#[derive(Debug, Clone)]
pub struct FabricConfig {
    /// Bytes buffered per direction before a writer suspends
    pub buffer_size: usize,
    /// Dials that may wait for an accept before further dials suspend
    pub backlog: usize,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1024 * 1024, // 1MB
            backlog: 16,
        }
    }
}
