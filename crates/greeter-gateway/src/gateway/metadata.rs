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

//! Forwarding between `grpc-metadata-*` HTTP headers and gRPC metadata

use hyper::HeaderMap;
use hyper::header::HeaderName;
use tonic::metadata::MetadataMap;
use tracing::trace;

pub const METADATA_HEADER_PREFIX: &str = "grpc-metadata-";

/// Reply headers that describe the gRPC transport rather than the call
const RESERVED_REPLY_HEADERS: &[&str] = &["content-type", "content-length", "date", "te", "trailer"];

/// Collect `grpc-metadata-<key>` request headers as metadata entries `<key>`
pub fn metadata_from_headers(headers: &HeaderMap) -> MetadataMap {
    let mut forwarded = HeaderMap::new();

    for (name, value) in headers {
        let Some(key) = name.as_str().strip_prefix(METADATA_HEADER_PREFIX) else {
            continue;
        };
        match HeaderName::from_bytes(key.as_bytes()) {
            Ok(key) => {
                forwarded.append(key, value.clone());
            }
            Err(_) => trace!(header = %name, "skipping metadata header with invalid key"),
        }
    }

    MetadataMap::from_headers(forwarded)
}

/// Expose reply metadata as `grpc-metadata-<key>` response headers
pub fn headers_from_metadata(metadata: MetadataMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let mut current: Option<HeaderName> = None;

    // Repeated values of one key arrive with no name after the first
    for (name, value) in metadata.into_headers() {
        if let Some(name) = name {
            current = Some(name);
        }
        let Some(name) = current.as_ref() else {
            continue;
        };
        if name.as_str().starts_with("grpc-") || RESERVED_REPLY_HEADERS.contains(&name.as_str()) {
            continue;
        }
        if let Ok(forwarded) = HeaderName::from_bytes(format!("{}{}", METADATA_HEADER_PREFIX, name).as_bytes()) {
            headers.append(forwarded, value);
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_headers_become_metadata() {
        let mut headers = HeaderMap::new();
        headers.insert("grpc-metadata-request-id", "abc".parse().unwrap());
        headers.insert("content-type", "application/json".parse().unwrap());

        let metadata = metadata_from_headers(&headers);
        assert_eq!(metadata.get("request-id").unwrap(), "abc");
        assert!(metadata.get("content-type").is_none());
    }

    #[test]
    fn test_reply_metadata_becomes_headers() {
        let mut metadata = MetadataMap::new();
        metadata.insert("x-served-by", "greeter".parse().unwrap());
        metadata.insert("content-type", "application/grpc".parse().unwrap());
        metadata.insert("grpc-encoding", "gzip".parse().unwrap());

        let headers = headers_from_metadata(metadata);
        assert_eq!(headers["grpc-metadata-x-served-by"], "greeter");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_repeated_reply_metadata_keeps_every_value() {
        let mut metadata = MetadataMap::new();
        metadata.append("x-tag", "a".parse().unwrap());
        metadata.append("x-tag", "b".parse().unwrap());
        metadata.append("grpc-status", "0".parse().unwrap());
        metadata.append("x-served-by", "greeter".parse().unwrap());

        let headers = headers_from_metadata(metadata);
        let tags: Vec<_> = headers.get_all("grpc-metadata-x-tag").iter().map(|v| v.to_str().unwrap()).collect();
        assert_eq!(tags, vec!["a", "b"]);
        assert_eq!(headers["grpc-metadata-x-served-by"], "greeter");
        assert_eq!(headers.len(), 3);
    }
}
