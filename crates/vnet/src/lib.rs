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

//! In-process virtual network
//!
//! A listener/dialer pair that hands out full-duplex byte streams without
//! touching the operating system's network stack. Every `dial` is paired with
//! exactly one `accept`; each direction of a connection is a bounded buffer,
//! so a writer suspends instead of dropping data when its peer falls behind.

pub mod config;
pub mod connection;
pub mod connector;
pub mod error;
pub mod listener;

pub use config::FabricConfig;
pub use connection::{Connection, ConnectionInfo};
pub use connector::FabricConnector;
pub use error::{FabricError, FabricResult};
pub use listener::{Dialer, VirtualListener};

/// Bind a listener whose connections buffer up to `buffer_size` bytes per direction
pub fn listen(buffer_size: usize) -> VirtualListener {
    VirtualListener::bind(FabricConfig { buffer_size, ..FabricConfig::default() })
}
