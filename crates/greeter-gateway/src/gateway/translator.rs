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

//! HTTP request handling: route, transcode, call, transcode back

use super::codec::WireCodec;
use super::deadline;
use super::metadata::{headers_from_metadata, metadata_from_headers};
use super::route::{MethodBinding, RouteTable};
use super::transcoder::request_json;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use futures::future::BoxFuture;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::CONTENT_TYPE;
use hyper::{Request, Response, StatusCode};
use parking_lot::RwLock;
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;
use tonic::Code;
use tonic::client::Grpc;
use tonic::metadata::MetadataMap;
use tonic::transport::Channel;
use tower::Service;
use tracing::{debug, warn};

/// Gateway counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GatewayMetrics {
    /// Requests that reached the gateway
    pub total_requests: u64,
    /// Requests forwarded to the RPC server
    pub downstream_calls: u64,
    /// Requests answered with an error
    pub failed_requests: u64,
}

struct GatewayInner {
    routes: RouteTable,
    channel: Channel,
    config: GatewayConfig,
    metrics: RwLock<GatewayMetrics>,
}

/// Translates HTTP/JSON requests into unary RPC calls.
///
/// Cloning is cheap; clones share the route table, the RPC channel and the
/// metrics.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

/// Collects route bindings before the gateway starts serving
#[derive(Debug, Default)]
pub struct GatewayBuilder {
    routes: RouteTable,
    config: GatewayConfig,
}

impl GatewayBuilder {
    pub fn bind(mut self, binding: MethodBinding) -> GatewayResult<Self> {
        self.routes.insert(binding)?;
        Ok(self)
    }

    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Finish the gateway; every downstream call goes through `channel`
    pub fn build(self, channel: Channel) -> Gateway {
        Gateway {
            inner: Arc::new(GatewayInner {
                routes: self.routes,
                channel,
                config: self.config,
                metrics: RwLock::new(GatewayMetrics::default()),
            }),
        }
    }
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::default()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.inner.routes
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Snapshot of the gateway counters
    pub fn metrics(&self) -> GatewayMetrics {
        self.inner.metrics.read().clone()
    }

    /// Answer one HTTP request. Failures become JSON error responses.
    pub async fn handle<B>(&self, request: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.inner.metrics.write().total_requests += 1;

        let method = request.method().clone();
        let path = request.uri().path().to_string();

        match self.transcode(request).await {
            Ok(response) => response,
            Err(error) => {
                self.inner.metrics.write().failed_requests += 1;
                debug!(%method, %path, status = %error.status_code(), "gateway request failed: {}", error);
                error.into()
            }
        }
    }

    async fn transcode<B>(&self, request: Request<B>) -> GatewayResult<Response<Full<Bytes>>>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = request.into_parts();

        let matched = self.inner.routes.at(&parts.method, parts.uri.path())?.ok_or_else(|| GatewayError::NotFound {
            message: format!("no route for {} {}", parts.method, parts.uri.path()),
        })?;
        let binding = matched.binding;

        let timeout = deadline::request_timeout(&parts.headers)?.or(self.inner.config.default_timeout);

        let body = Limited::new(body, self.inner.config.max_body_size)
            .collect()
            .await
            .map_err(|e| GatewayError::InvalidArgument {
                message: format!("failed to read request body: {}", e),
            })?
            .to_bytes();

        let payload = binding.transcoder().json_to_wire(request_json(&body, &matched.path_params)?)?;
        let metadata = metadata_from_headers(&parts.headers);

        debug!(rpc = %binding.rpc_path(), bytes = payload.len(), "forwarding request");
        self.inner.metrics.write().downstream_calls += 1;

        let reply = self.call_with_deadline(binding, payload, metadata, timeout).await?;
        let (reply_metadata, message, _) = reply.into_parts();

        let json = binding.transcoder().wire_to_json(message)?;
        let body = serde_json::to_vec(&json).map_err(|e| GatewayError::Internal {
            message: format!("failed to serialize reply: {}", e),
        })?;

        let mut response = Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))?;
        response.headers_mut().extend(headers_from_metadata(reply_metadata));

        Ok(response)
    }

    async fn call_with_deadline(&self, binding: &MethodBinding, payload: Bytes, metadata: MetadataMap, timeout: Option<Duration>) -> GatewayResult<tonic::Response<Bytes>> {
        let Some(timeout) = timeout else {
            return self.invoke(binding, payload, metadata, None).await;
        };

        let deadline = Instant::now() + timeout;
        let result = tokio::time::timeout(timeout, self.invoke(binding, payload, metadata, Some(timeout))).await;

        match result {
            Err(_) => {
                warn!(rpc = %binding.rpc_path(), ?timeout, "downstream call exceeded its deadline");
                Err(GatewayError::DeadlineExceeded {
                    message: format!("call to {} did not finish within {:?}", binding.rpc_path(), timeout),
                })
            }
            // The server cancels handlers at the propagated deadline; that
            // cancellation can arrive just ahead of the local timer
            Ok(Err(GatewayError::Rpc(status))) if status.code() == Code::Cancelled && Instant::now() >= deadline => Err(GatewayError::DeadlineExceeded {
                message: status.message().to_string(),
            }),
            Ok(result) => result,
        }
    }

    async fn invoke(&self, binding: &MethodBinding, payload: Bytes, metadata: MetadataMap, timeout: Option<Duration>) -> GatewayResult<tonic::Response<Bytes>> {
        let mut grpc = Grpc::new(self.inner.channel.clone());
        if let Some(encoding) = self.inner.config.compression {
            grpc = grpc.send_compressed(encoding).accept_compressed(encoding);
        }
        grpc.ready().await?;

        let mut request = tonic::Request::new(payload);
        *request.metadata_mut() = metadata;
        if let Some(timeout) = timeout {
            request.set_timeout(timeout);
        }

        Ok(grpc.unary(request, binding.rpc_path().clone(), WireCodec).await?)
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway").field("routes", &self.inner.routes).field("config", &self.inner.config).finish()
    }
}

impl<B> Service<Request<B>> for Gateway
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let gateway = self.clone();
        Box::pin(async move { Ok(gateway.handle(request).await) })
    }
}
