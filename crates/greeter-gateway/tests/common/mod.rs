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

//! Shared handler for the integration tests

#![allow(dead_code)]

use greeter_gateway::proto::greeter_server::Greeter;
use greeter_gateway::proto::{HelloReply, HelloRequest};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tonic::{Request, Response, Status};

/// Greeter that counts its calls.
///
/// The name `boom` fails with `Internal`, `reject` fails with
/// `InvalidArgument`. An `x-request-id` metadata entry is echoed back.
#[derive(Debug, Clone, Default)]
pub struct CountingGreeter {
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl CountingGreeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` before answering
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[tonic::async_trait]
impl Greeter for CountingGreeter {
    async fn say_hello(&self, request: Request<HelloRequest>) -> Result<Response<HelloReply>, Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let request_id = request.metadata().get("x-request-id").cloned();
        let name = request.into_inner().name;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut reply = match name.as_str() {
            "boom" => return Err(Status::internal("handler failed")),
            "reject" => return Err(Status::invalid_argument("name rejected")),
            _ => Response::new(HelloReply { message: format!("{} world", name) }),
        };

        if let Some(request_id) = request_id {
            reply.metadata_mut().insert("x-request-id", request_id);
        }
        Ok(reply)
    }
}
