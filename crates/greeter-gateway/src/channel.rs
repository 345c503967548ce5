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

use tonic::transport::{Channel, Endpoint};
use vnet::{Dialer, FabricConnector};

/// Authority used for requests on the fabric; nothing resolves it
pub const FABRIC_AUTHORITY: &str = "http://fabric.local";

/// A tonic channel whose connections are dialed through the fabric.
///
/// Nothing is dialed until the first call. The channel keeps one HTTP/2
/// connection and redials it if it drops; clones share that connection.
/// Must be called from within a tokio runtime.
pub fn fabric_channel(dialer: Dialer) -> Channel {
    Endpoint::from_static(FABRIC_AUTHORITY).connect_with_connector_lazy(FabricConnector::new(dialer))
}
