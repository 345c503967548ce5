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

use std::time::Duration;
use tonic::codec::CompressionEncoding;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Deadline for a downstream call when the request carries no `grpc-timeout`
    pub default_timeout: Option<Duration>,
    /// Payload compression negotiated with the RPC server
    pub compression: Option<CompressionEncoding>,
    /// Largest accepted HTTP request body
    pub max_body_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            default_timeout: Some(Duration::from_secs(30)),
            compression: Some(CompressionEncoding::Gzip),
            max_body_size: 4 * 1024 * 1024, // 4MB, the default gRPC message limit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_config_default() {
        let config = GatewayConfig::default();
        assert_eq!(config.default_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.compression, Some(CompressionEncoding::Gzip));
        assert_eq!(config.max_body_size, 4 * 1024 * 1024);
    }
}
