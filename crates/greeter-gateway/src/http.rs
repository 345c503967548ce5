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

//! HTTP/1.1 serving for tower services, over the virtual fabric or TCP

use hyper::body::{Body, Incoming};
use hyper::rt::{Read, Write};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::future::Future;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tower::{Service, ServiceExt};
use tracing::{debug, error, info};
use vnet::VirtualListener;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Serve HTTP/1.1 requests from one connection until the peer hangs up or
/// `stop` flips. A stopped connection finishes its in-flight request first.
pub async fn serve_connection<I, S, ResBody>(io: I, service: S, mut stop: watch::Receiver<bool>) -> Result<(), hyper::Error>
where
    I: Read + Write + Unpin + Send + 'static,
    S: Service<Request<Incoming>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    ResBody: Body + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Into<BoxError>,
{
    let service = service_fn(move |request: Request<Incoming>| service.clone().oneshot(request));
    let connection = http1::Builder::new().serve_connection(io, service);
    tokio::pin!(connection);

    if *stop.borrow() {
        connection.as_mut().graceful_shutdown();
        return connection.await;
    }

    tokio::select! {
        result = connection.as_mut() => result,
        _ = stop.changed() => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    }
}

/// Open connections of one accept loop
struct Connections {
    tasks: JoinSet<()>,
    stop: watch::Sender<bool>,
}

impl Connections {
    fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Self { tasks: JoinSet::new(), stop }
    }

    fn spawn<I, S, ResBody>(&mut self, io: I, service: S, peer: String)
    where
        I: Read + Write + Unpin + Send + 'static,
        S: Service<Request<Incoming>, Response = Response<ResBody>> + Clone + Send + 'static,
        S::Future: Send + 'static,
        S::Error: Into<BoxError>,
        ResBody: Body + Send + 'static,
        ResBody::Data: Send,
        ResBody::Error: Into<BoxError>,
    {
        let stop = self.stop.subscribe();
        self.tasks.spawn(async move {
            if let Err(err) = serve_connection(io, service, stop).await {
                debug!("Error serving connection {}: {}", peer, err);
            }
        });
    }

    /// Drop the bookkeeping of connections that already finished
    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                error!("connection task failed: {}", e);
            }
        }
    }

    /// Ask every connection to stop and wait for them
    async fn drain(mut self) {
        let _ = self.stop.send(true);
        let open = self.tasks.len();
        if open > 0 {
            debug!("waiting for {} open connections", open);
        }
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                error!("connection task failed: {}", e);
            }
        }
    }
}

/// Accept fabric connections and serve each on its own task until `shutdown`
/// resolves or the listener is closed. Returns once every accepted connection
/// has finished.
pub async fn serve_http<S, ResBody, F>(mut listener: VirtualListener, service: S, shutdown: F)
where
    S: Service<Request<Incoming>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    ResBody: Body + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Into<BoxError>,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut connections = Connections::new();

    loop {
        let connection = tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok(connection) => connection,
                Err(_) => break,
            },
        };

        connections.reap();
        let peer = format!("fabric#{}", connection.id());
        connections.spawn(TokioIo::new(connection), service.clone(), peer);
    }

    listener.close();
    connections.drain().await;
    info!("HTTP server on the virtual fabric stopped");
}

/// TCP counterpart of [`serve_http`]
pub async fn serve_tcp<S, ResBody, F>(listener: TcpListener, service: S, shutdown: F)
where
    S: Service<Request<Incoming>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    ResBody: Body + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Into<BoxError>,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut connections = Connections::new();

    loop {
        let (stream, remote_addr) = tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            },
        };

        connections.reap();
        connections.spawn(TokioIo::new(stream), service.clone(), remote_addr.to_string());
    }

    connections.drain().await;
    info!("HTTP server stopped");
}
