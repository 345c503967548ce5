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

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Config};
use greeter_gateway::{CorsLayer, HelloWorldGreeter, RpcServer, fabric_channel, greeter_gateway, greeter_service, serve_tcp};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vnet::{FabricConfig, VirtualListener};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    info!("Starting greeter gateway");

    let cli = Cli::parse();
    let config = Config::from_env().with_cli(&cli);
    info!("Loaded configuration: bind_address={}, timeout_ms={}, compression={:?}", config.bind_address, config.timeout_ms, config.compression);

    // The RPC server is only reachable through the in-process fabric
    let rpc_listener = VirtualListener::bind(FabricConfig::default());
    let rpc_dialer = rpc_listener.dialer();
    let (rpc_stop, rpc_signal) = oneshot::channel::<()>();

    let server = RpcServer::new().register(greeter_service(HelloWorldGreeter, config.compression_encoding()));
    let rpc_task = tokio::spawn(async move {
        let signal = async {
            let _ = rpc_signal.await;
        };
        if let Err(e) = server.serve_with_shutdown(rpc_listener, signal).await {
            error!("RPC server failed: {}", e);
        }
    });

    let gateway = greeter_gateway(config.gateway_config(), fabric_channel(rpc_dialer)).context("failed to build gateway routes")?;
    let service = ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).service(gateway);

    let listener = TcpListener::bind(&config.bind_address).await.with_context(|| format!("failed to bind {}", config.bind_address))?;
    info!("Greeter gateway listening on http://{}", config.bind_address);

    serve_tcp(listener, service, shutdown_signal()).await;

    let _ = rpc_stop.send(());
    rpc_task.await.context("RPC server task panicked")?;

    info!("Greeter gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
