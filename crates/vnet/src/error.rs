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

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FabricError {
    /// The listener was closed or dropped, or it discarded a pending dial
    #[error("virtual fabric closed")]
    Closed,
}

impl From<FabricError> for std::io::Error {
    fn from(err: FabricError) -> Self {
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, err)
    }
}

pub type FabricResult<T> = Result<T, FabricError>;
