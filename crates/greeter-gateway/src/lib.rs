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

//! Greeter gateway
//!
//! Serves `helloworld.Greeter` natively over gRPC and as HTTP/JSON through a
//! translating gateway, with both transports running on in-process virtual
//! fabrics. The [`harness`] module wires everything together for tests.

pub mod channel;
pub mod config;
pub mod cors;
pub mod error;
pub mod gateway;
pub mod greeter;
pub mod harness;
pub mod http;
pub mod proto;
pub mod server;

pub use channel::fabric_channel;
pub use config::GatewayConfig;
pub use cors::{Cors, CorsLayer, CorsPolicy};
pub use error::{ErrorBody, GatewayError, GatewayResult};
pub use gateway::{ErrorMapper, Gateway, GatewayBuilder, GatewayMetrics, MethodBinding};
pub use greeter::{HelloWorldGreeter, greeter_bindings, greeter_gateway, greeter_service};
pub use harness::{Harness, HarnessConfig, HttpClient, HttpConnection, HttpResponse, RpcClient};
pub use http::{serve_http, serve_tcp};
pub use server::RpcServer;
