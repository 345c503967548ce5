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

//! In-process test harness
//!
//! [`Harness`] wires a handler into an RPC server on one virtual fabric and
//! the CORS-filtered gateway into an HTTP server on a second one, then hands
//! out clients for both paths. Every harness owns its own fabrics, so tests
//! can run side by side.

use crate::channel::fabric_channel;
use crate::config::GatewayConfig;
use crate::cors::{CorsLayer, CorsPolicy};
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{Gateway, WireCodec};
use crate::greeter::{greeter_gateway, greeter_service};
use crate::http::serve_http;
use crate::proto::greeter_client::GreeterClient;
use crate::proto::greeter_server::Greeter;
use crate::proto::{HelloReply, HelloRequest};
use crate::server::RpcServer;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::client::conn::http1::{self, SendRequest};
use hyper::header::{CONTENT_TYPE, HOST};
use hyper::http::uri::PathAndQuery;
use hyper::{HeaderMap, Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tonic::client::Grpc;
use tonic::codec::CompressionEncoding;
use tonic::transport::Channel;
use tonic::{Code, Status};
use tower::Layer;
use tracing::{debug, error, warn};
use vnet::{Dialer, FabricConfig, VirtualListener};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Settings for both fabrics
    pub fabric: FabricConfig,
    pub gateway: GatewayConfig,
    pub cors: CorsPolicy,
    /// Compression accepted and used by the RPC server and native clients
    pub rpc_compression: Option<CompressionEncoding>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            fabric: FabricConfig::default(),
            gateway: GatewayConfig::default(),
            cors: CorsPolicy::permissive(),
            rpc_compression: Some(CompressionEncoding::Gzip),
        }
    }
}

/// A running RPC server and gateway, each on its own virtual fabric
pub struct Harness {
    config: HarnessConfig,
    rpc_dialer: Dialer,
    http_dialer: Dialer,
    gateway: Gateway,
    shutdown: Vec<oneshot::Sender<()>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Harness {
    /// Start with the default configuration
    pub async fn start<G: Greeter>(greeter: G) -> GatewayResult<Self> {
        Self::start_with(greeter, HarnessConfig::default()).await
    }

    pub async fn start_with<G: Greeter>(greeter: G, config: HarnessConfig) -> GatewayResult<Self> {
        let rpc_listener = VirtualListener::bind(config.fabric.clone());
        let rpc_dialer = rpc_listener.dialer();
        let (rpc_stop, rpc_signal) = oneshot::channel::<()>();

        let server = RpcServer::new().register(greeter_service(greeter, config.rpc_compression));
        let rpc_task = tokio::spawn(async move {
            let signal = async {
                let _ = rpc_signal.await;
            };
            if let Err(e) = server.serve_with_shutdown(rpc_listener, signal).await {
                error!("RPC server failed: {}", e);
            }
        });

        let gateway = greeter_gateway(config.gateway.clone(), fabric_channel(rpc_dialer.clone()))?;

        let http_listener = VirtualListener::bind(config.fabric.clone());
        let http_dialer = http_listener.dialer();
        let (http_stop, http_signal) = oneshot::channel::<()>();

        let service = CorsLayer::new(config.cors.clone()).layer(gateway.clone());
        let http_task = tokio::spawn(serve_http(http_listener, service, async {
            let _ = http_signal.await;
        }));

        debug!("harness started");

        Ok(Self {
            config,
            rpc_dialer,
            http_dialer,
            gateway,
            shutdown: vec![http_stop, rpc_stop],
            tasks: vec![http_task, rpc_task],
        })
    }

    /// A native client on its own connection
    pub fn rpc_client(&self) -> RpcClient {
        RpcClient::new(fabric_channel(self.rpc_dialer.clone()), self.config.rpc_compression)
    }

    pub fn http_client(&self) -> HttpClient {
        HttpClient::new(self.http_dialer.clone())
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Dialer of the fabric the RPC server listens on
    pub fn rpc_dialer(&self) -> &Dialer {
        &self.rpc_dialer
    }

    /// Dialer of the fabric the gateway listens on
    pub fn http_dialer(&self) -> &Dialer {
        &self.http_dialer
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Stop both servers and close their fabrics
    pub async fn shutdown(mut self) {
        for stop in self.shutdown.drain(..) {
            let _ = stop.send(());
        }

        for mut task in self.tasks.drain(..) {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("harness task failed: {}", e),
                Err(_) => {
                    warn!("harness task did not stop within {:?}", SHUTDOWN_GRACE);
                    task.abort();
                }
            }
        }

        debug!("harness stopped");
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness").field("config", &self.config).field("gateway", &self.gateway).finish()
    }
}

/// Native `helloworld.Greeter` client
#[derive(Debug, Clone)]
pub struct RpcClient {
    channel: Channel,
    compression: Option<CompressionEncoding>,
}

impl RpcClient {
    pub fn new(channel: Channel, compression: Option<CompressionEncoding>) -> Self {
        Self { channel, compression }
    }

    pub async fn say_hello(&self, name: impl Into<String>) -> Result<HelloReply, Status> {
        let mut client = GreeterClient::new(self.channel.clone());
        if let Some(encoding) = self.compression {
            client = client.send_compressed(encoding).accept_compressed(encoding);
        }

        let reply = client.say_hello(HelloRequest { name: name.into() }).await?;
        Ok(reply.into_inner())
    }

    /// Unary call with an already-encoded request, returning the encoded reply
    pub async fn call_raw(&self, path: &'static str, payload: Bytes) -> Result<Bytes, Status> {
        let mut grpc = Grpc::new(self.channel.clone());
        if let Some(encoding) = self.compression {
            grpc = grpc.send_compressed(encoding).accept_compressed(encoding);
        }
        grpc.ready().await.map_err(|e| Status::new(Code::Unavailable, format!("channel not ready: {}", e)))?;

        let reply = grpc.unary(tonic::Request::new(payload), PathAndQuery::from_static(path), WireCodec).await?;
        Ok(reply.into_inner())
    }
}

/// A buffered HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// HTTP/1.1 client for the gateway fabric. Each request uses a fresh connection.
#[derive(Debug, Clone)]
pub struct HttpClient {
    dialer: Dialer,
}

impl HttpClient {
    pub fn new(dialer: Dialer) -> Self {
        Self { dialer }
    }

    /// Open a keep-alive connection for a sequence of requests
    pub async fn connect(&self) -> GatewayResult<HttpConnection> {
        let connection = self.dialer.dial().await?;
        let id = connection.id();

        let (sender, conn) = http1::handshake(TokioIo::new(connection)).await?;
        tokio::spawn(async move {
            if let Err(err) = conn.await {
                debug!("HTTP client connection {} failed: {}", id, err);
            }
        });

        Ok(HttpConnection { sender })
    }

    pub async fn send(&self, request: Request<Full<Bytes>>) -> GatewayResult<HttpResponse> {
        self.connect().await?.send(request).await
    }

    pub async fn request(&self, method: Method, path: &str, body: impl Into<Bytes>, headers: &[(&str, &str)]) -> GatewayResult<HttpResponse> {
        self.send(build_request(method, path, body.into(), headers)?).await
    }

    /// POST `body` serialized as JSON
    pub async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> GatewayResult<HttpResponse> {
        let body = serde_json::to_vec(body).map_err(|e| GatewayError::InvalidArgument {
            message: format!("failed to serialize request: {}", e),
        })?;
        self.request(Method::POST, path, body, &[(CONTENT_TYPE.as_str(), "application/json")]).await
    }

    pub async fn get(&self, path: &str) -> GatewayResult<HttpResponse> {
        self.request(Method::GET, path, Bytes::new(), &[]).await
    }
}

/// One HTTP/1.1 connection; requests on it are answered in order
pub struct HttpConnection {
    sender: SendRequest<Full<Bytes>>,
}

impl HttpConnection {
    pub async fn send(&mut self, request: Request<Full<Bytes>>) -> GatewayResult<HttpResponse> {
        self.sender.ready().await?;
        let response = self.sender.send_request(request).await?;

        let (parts, body) = response.into_parts();
        let body = body.collect().await?.to_bytes();

        Ok(HttpResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    pub async fn request(&mut self, method: Method, path: &str, body: impl Into<Bytes>, headers: &[(&str, &str)]) -> GatewayResult<HttpResponse> {
        self.send(build_request(method, path, body.into(), headers)?).await
    }
}

impl std::fmt::Debug for HttpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection").field("closed", &self.sender.is_closed()).finish()
    }
}

fn build_request(method: Method, path: &str, body: Bytes, headers: &[(&str, &str)]) -> GatewayResult<Request<Full<Bytes>>> {
    let mut builder = Request::builder().method(method).uri(path).header(HOST, "fabric.local");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    Ok(builder.body(Full::new(body))?)
}
