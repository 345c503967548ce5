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

//! Call deadlines carried by HTTP requests

use crate::error::{GatewayError, GatewayResult};
use hyper::HeaderMap;
use std::time::Duration;

pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// Parse a gRPC timeout value: up to 8 digits followed by a unit
/// (`H`, `M`, `S`, `m`, `u`, `n`)
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 || value.len() > 9 {
        return None;
    }

    let (digits, unit) = value.split_at(value.len() - 1);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    match unit {
        "H" => Some(Duration::from_secs(amount * 60 * 60)),
        "M" => Some(Duration::from_secs(amount * 60)),
        "S" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_millis(amount)),
        "u" => Some(Duration::from_micros(amount)),
        "n" => Some(Duration::from_nanos(amount)),
        _ => None,
    }
}

/// Deadline requested by the caller, if any
pub fn request_timeout(headers: &HeaderMap) -> GatewayResult<Option<Duration>> {
    let Some(value) = headers.get(GRPC_TIMEOUT_HEADER) else {
        return Ok(None);
    };

    value.to_str().ok().and_then(parse_grpc_timeout).map(Some).ok_or_else(|| GatewayError::InvalidArgument {
        message: format!("invalid {} header: {:?}", GRPC_TIMEOUT_HEADER, value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_grpc_timeout("1H"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_grpc_timeout("2M"), Some(Duration::from_secs(120)));
        assert_eq!(parse_grpc_timeout("3S"), Some(Duration::from_secs(3)));
        assert_eq!(parse_grpc_timeout("100m"), Some(Duration::from_millis(100)));
        assert_eq!(parse_grpc_timeout("250u"), Some(Duration::from_micros(250)));
        assert_eq!(parse_grpc_timeout("99999999n"), Some(Duration::from_nanos(99_999_999)));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_grpc_timeout(""), None);
        assert_eq!(parse_grpc_timeout("m"), None);
        assert_eq!(parse_grpc_timeout("10"), None);
        assert_eq!(parse_grpc_timeout("+5S"), None);
        assert_eq!(parse_grpc_timeout("10x"), None);
        assert_eq!(parse_grpc_timeout("123456789S"), None);
    }

    #[test]
    fn test_request_timeout_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_timeout(&headers).unwrap(), None);

        headers.insert(GRPC_TIMEOUT_HEADER, "50m".parse().unwrap());
        assert_eq!(request_timeout(&headers).unwrap(), Some(Duration::from_millis(50)));

        headers.insert(GRPC_TIMEOUT_HEADER, "soon".parse().unwrap());
        assert!(matches!(request_timeout(&headers), Err(GatewayError::InvalidArgument { .. })));
    }
}
