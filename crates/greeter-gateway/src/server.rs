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

//! RPC server bound to a virtual fabric listener

use hyper::{Request, Response};
use std::convert::Infallible;
use std::future::Future;
use tonic::body::BoxBody;
use tonic::server::NamedService;
use tonic::service::RoutesBuilder;
use tonic::transport::Server;
use tower::Service;
use tracing::info;
use vnet::VirtualListener;

/// gRPC server that accepts connections from a [`VirtualListener`].
///
/// Services are registered up front; each accepted connection is served
/// concurrently and replies on a connection keep request order.
#[derive(Default)]
pub struct RpcServer {
    routes: RoutesBuilder,
    services: Vec<&'static str>,
}

impl RpcServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generated service such as `GreeterServer`
    pub fn register<S>(mut self, service: S) -> Self
    where
        S: Service<Request<BoxBody>, Response = Response<BoxBody>, Error = Infallible> + NamedService + Clone + Send + 'static,
        S::Future: Send + 'static,
    {
        info!(service = S::NAME, "registering RPC service");
        self.routes.add_service(service);
        self.services.push(S::NAME);
        self
    }

    /// Names of the registered services
    pub fn services(&self) -> &[&'static str] {
        &self.services
    }

    /// Serve until the listener is closed
    pub async fn serve(self, listener: VirtualListener) -> Result<(), tonic::transport::Error> {
        self.serve_with_shutdown(listener, futures::future::pending()).await
    }

    /// Serve until `signal` resolves or the listener is closed
    pub async fn serve_with_shutdown<F>(self, listener: VirtualListener, signal: F) -> Result<(), tonic::transport::Error>
    where
        F: Future<Output = ()>,
    {
        info!(services = ?self.services, "RPC server listening on the virtual fabric");

        let result = Server::builder().add_routes(self.routes.routes()).serve_with_incoming_shutdown(listener, signal).await;

        info!("RPC server stopped");
        result
    }
}

impl std::fmt::Debug for RpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcServer").field("services", &self.services).finish()
    }
}
