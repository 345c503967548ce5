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

use crate::config::GatewayConfig;
use crate::error::GatewayResult;
use crate::gateway::{Gateway, MethodBinding};
use crate::proto::greeter_server::{Greeter, GreeterServer};
use crate::proto::{HelloReply, HelloRequest, SAY_HELLO_PATH};
use hyper::Method;
use tonic::codec::CompressionEncoding;
use tonic::transport::Channel;
use tonic::{Request, Response, Status};
use tracing::debug;

/// Replies to `name` with `"<name> world"`
#[derive(Debug, Default, Clone, Copy)]
pub struct HelloWorldGreeter;

#[tonic::async_trait]
impl Greeter for HelloWorldGreeter {
    async fn say_hello(&self, request: Request<HelloRequest>) -> Result<Response<HelloReply>, Status> {
        let name = request.into_inner().name;
        debug!(%name, "SayHello");

        Ok(Response::new(HelloReply { message: format!("{} world", name) }))
    }
}

/// Wrap a handler in the generated server, optionally compressing replies
pub fn greeter_service<G: Greeter>(greeter: G, compression: Option<CompressionEncoding>) -> GreeterServer<G> {
    let server = GreeterServer::new(greeter);
    match compression {
        Some(encoding) => server.send_compressed(encoding).accept_compressed(encoding),
        None => server,
    }
}

/// HTTP bindings of `helloworld.Greeter`
pub fn greeter_bindings() -> Vec<MethodBinding> {
    vec![
        MethodBinding::unary::<HelloRequest, HelloReply>(Method::POST, "/v1/example/echo", SAY_HELLO_PATH),
        MethodBinding::unary::<HelloRequest, HelloReply>(Method::GET, "/v1/example/echo/{name}", SAY_HELLO_PATH),
    ]
}

/// Gateway exposing `helloworld.Greeter` over `channel`
pub fn greeter_gateway(config: GatewayConfig, channel: Channel) -> GatewayResult<Gateway> {
    let builder = greeter_bindings().into_iter().try_fold(Gateway::builder().config(config), |builder, binding| builder.bind(binding))?;
    Ok(builder.build(channel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_say_hello() {
        let reply = HelloWorldGreeter.say_hello(Request::new(HelloRequest { name: "test".to_string() })).await.unwrap();
        assert_eq!(reply.into_inner().message, "test world");
    }

    #[tokio::test]
    async fn test_say_hello_empty_name() {
        let reply = HelloWorldGreeter.say_hello(Request::new(HelloRequest::default())).await.unwrap();
        assert_eq!(reply.into_inner().message, " world");
    }

    #[test]
    fn test_bindings_target_say_hello() {
        let bindings = greeter_bindings();
        assert_eq!(bindings.len(), 2);
        assert!(bindings.iter().all(|binding| binding.rpc_path().path() == SAY_HELLO_PATH));
    }
}
