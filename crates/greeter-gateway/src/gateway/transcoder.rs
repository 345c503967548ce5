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

//! JSON <-> protobuf message transcoding

use crate::error::{GatewayError, GatewayResult};
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::marker::PhantomData;

/// Converts one method's request and reply between JSON and wire bytes
pub trait MessageTranscoder: Send + Sync {
    /// Decode a JSON request into the protobuf encoding of the request message
    fn json_to_wire(&self, body: Value) -> GatewayResult<Bytes>;

    /// Decode a protobuf reply and re-encode it as JSON
    fn wire_to_json(&self, wire: Bytes) -> GatewayResult<Value>;
}

/// Transcoder for a pair of prost messages with serde mappings
pub struct ProstJsonTranscoder<Req, Resp> {
    _marker: PhantomData<fn() -> (Req, Resp)>,
}

impl<Req, Resp> ProstJsonTranscoder<Req, Resp> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<Req, Resp> Default for ProstJsonTranscoder<Req, Resp> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Resp> MessageTranscoder for ProstJsonTranscoder<Req, Resp>
where
    Req: prost::Message + DeserializeOwned,
    Resp: prost::Message + Default + Serialize,
{
    fn json_to_wire(&self, body: Value) -> GatewayResult<Bytes> {
        let message: Req = serde_json::from_value(body).map_err(|e| GatewayError::InvalidArgument {
            message: format!("invalid request body: {}", e),
        })?;

        Ok(Bytes::from(message.encode_to_vec()))
    }

    fn wire_to_json(&self, wire: Bytes) -> GatewayResult<Value> {
        let message = Resp::decode(wire).map_err(|e| GatewayError::Internal {
            message: format!("failed to decode reply: {}", e),
        })?;

        serde_json::to_value(&message).map_err(|e| GatewayError::Internal {
            message: format!("failed to encode reply as JSON: {}", e),
        })
    }
}

/// Parse an HTTP body into a JSON object and merge path parameters into it.
///
/// An empty body is the empty message. Path parameters override body fields
/// of the same name.
pub fn request_json(body: &[u8], path_params: &[(String, String)]) -> GatewayResult<Value> {
    let mut fields = if body.iter().all(u8::is_ascii_whitespace) {
        Map::new()
    } else {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => fields,
            Ok(other) => {
                return Err(GatewayError::InvalidArgument {
                    message: format!("request body must be a JSON object, got {}", json_kind(&other)),
                });
            }
            Err(e) => {
                return Err(GatewayError::InvalidArgument {
                    message: format!("malformed JSON body: {}", e),
                });
            }
        }
    };

    for (name, value) in path_params {
        fields.insert(name.clone(), Value::String(value.clone()));
    }

    Ok(Value::Object(fields))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{HelloReply, HelloRequest};
    use prost::Message;
    use serde_json::json;

    fn transcoder() -> ProstJsonTranscoder<HelloRequest, HelloReply> {
        ProstJsonTranscoder::new()
    }

    #[test]
    fn test_json_to_wire() {
        let wire = transcoder().json_to_wire(json!({"name": "test"})).unwrap();
        assert_eq!(HelloRequest::decode(wire).unwrap().name, "test");
    }

    #[test]
    fn test_mistyped_field_is_invalid_argument() {
        let err = transcoder().json_to_wire(json!({"name": 5})).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidArgument { .. }));
    }

    #[test]
    fn test_wire_to_json() {
        let wire = Bytes::from(HelloReply { message: "test world".to_string() }.encode_to_vec());
        assert_eq!(transcoder().wire_to_json(wire).unwrap(), json!({"message": "test world"}));
    }

    #[test]
    fn test_corrupt_reply_is_internal() {
        let err = transcoder().wire_to_json(Bytes::from_static(&[0x0a, 0x10, b'x'])).unwrap_err();
        assert!(matches!(err, GatewayError::Internal { .. }));
    }

    #[test]
    fn test_request_json_merges_path_params() {
        let params = vec![("name".to_string(), "path".to_string())];
        let value = request_json(br#"{"name":"body"}"#, &params).unwrap();
        assert_eq!(value, json!({"name": "path"}));
    }

    #[test]
    fn test_request_json_empty_body() {
        assert_eq!(request_json(b"", &[]).unwrap(), json!({}));
        assert_eq!(request_json(b"  \n", &[]).unwrap(), json!({}));
    }

    #[test]
    fn test_request_json_rejects_non_objects() {
        assert!(matches!(request_json(b"[1,2]", &[]), Err(GatewayError::InvalidArgument { .. })));
        assert!(matches!(request_json(b"{\"name\":", &[]), Err(GatewayError::InvalidArgument { .. })));
    }
}
