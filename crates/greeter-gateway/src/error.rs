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

use crate::gateway::error_mapping::ErrorMapper;
use http_body_util::Full;
use hyper::header::{CACHE_CONTROL, CONTENT_TYPE};
use hyper::{Response, StatusCode, body::Bytes};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tonic::Code;
use tracing::error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Method not allowed: {message}")]
    MethodNotAllowed { message: String },

    #[error("Deadline exceeded: {message}")]
    DeadlineExceeded { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("gRPC error: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("Fabric error: {0}")]
    Fabric(#[from] vnet::FabricError),

    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("Hyper error: {0}")]
    Hyper(#[from] hyper::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Router error: {0}")]
    Router(String),
}

impl GatewayError {
    /// gRPC code carried by this error
    pub fn grpc_code(&self) -> Code {
        match self {
            GatewayError::NotFound { .. } => Code::NotFound,
            GatewayError::InvalidArgument { .. } => Code::InvalidArgument,
            GatewayError::MethodNotAllowed { .. } => Code::Unimplemented,
            GatewayError::DeadlineExceeded { .. } => Code::DeadlineExceeded,
            GatewayError::Internal { .. } => Code::Internal,
            GatewayError::Rpc(status) => status.code(),
            GatewayError::Fabric(_) | GatewayError::Transport(_) | GatewayError::Hyper(_) => Code::Unavailable,
            GatewayError::Http(_) | GatewayError::Router(_) => Code::Internal,
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            _ => ErrorMapper::grpc_to_http_status(self.grpc_code()),
        }
    }

    /// Message shown to HTTP callers
    pub fn message(&self) -> String {
        match self {
            GatewayError::NotFound { message }
            | GatewayError::InvalidArgument { message }
            | GatewayError::MethodNotAllowed { message }
            | GatewayError::DeadlineExceeded { message }
            | GatewayError::Internal { message } => message.clone(),
            GatewayError::Rpc(status) => status.message().to_string(),
            other => other.to_string(),
        }
    }
}

/// JSON error body, shaped like `google.rpc.Status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub details: Vec<serde_json::Value>,
}

impl From<&GatewayError> for ErrorBody {
    fn from(error: &GatewayError) -> Self {
        Self {
            code: error.grpc_code() as i32,
            message: error.message(),
            details: Vec::new(),
        }
    }
}

impl From<GatewayError> for Response<Full<Bytes>> {
    fn from(error: GatewayError) -> Self {
        let status_code = error.status_code();
        let body = ErrorBody::from(&error);

        if status_code.is_server_error() {
            error!(status = %status_code, "Gateway error: {}", error);
        }

        let json = match serde_json::to_vec(&body) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize error response: {}", e);
                br#"{"code":13,"message":"failed to serialize error","details":[]}"#.to_vec()
            }
        };

        Response::builder()
            .status(status_code)
            .header(CONTENT_TYPE, "application/json")
            .header(CACHE_CONTROL, "no-cache")
            .body(Full::new(Bytes::from(json)))
            .unwrap_or_else(|e| {
                error!("Failed to build error response: {}", e);
                let mut response = Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            })
    }
}

impl From<hyper::http::Error> for GatewayError {
    fn from(err: hyper::http::Error) -> Self {
        GatewayError::Http(err.to_string())
    }
}

impl From<matchit::InsertError> for GatewayError {
    fn from(err: matchit::InsertError) -> Self {
        GatewayError::Router(err.to_string())
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_status_codes() {
        let not_found = GatewayError::NotFound { message: "x".to_string() };
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let invalid = GatewayError::InvalidArgument { message: "x".to_string() };
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);

        let not_allowed = GatewayError::MethodNotAllowed { message: "x".to_string() };
        assert_eq!(not_allowed.status_code(), StatusCode::METHOD_NOT_ALLOWED);

        let deadline = GatewayError::DeadlineExceeded { message: "x".to_string() };
        assert_eq!(deadline.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let unimplemented = GatewayError::Rpc(tonic::Status::unimplemented("x"));
        assert_eq!(unimplemented.status_code(), StatusCode::NOT_IMPLEMENTED);

        let fabric = GatewayError::Fabric(vnet::FabricError::Closed);
        assert_eq!(fabric.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_rpc_message_is_status_message() {
        let error = GatewayError::Rpc(tonic::Status::internal("handler failed"));
        assert_eq!(error.message(), "handler failed");
        assert_eq!(ErrorBody::from(&error).code, Code::Internal as i32);
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = Response::from(GatewayError::InvalidArgument { message: "bad json".to_string() });
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            ErrorBody {
                code: 3,
                message: "bad json".to_string(),
                details: vec![],
            }
        );
    }
}
