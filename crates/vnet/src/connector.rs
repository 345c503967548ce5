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

//! `tower` connector that dials through the fabric instead of resolving a URI

use crate::connection::Connection;
use crate::error::FabricError;
use crate::listener::Dialer;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tonic::transport::Uri;
use tower::Service;
use tracing::trace;

/// Connector for tonic endpoints and hyper clients.
///
/// The target URI is only used for logging; every call opens a fresh
/// connection on the wrapped [`Dialer`].
#[derive(Debug, Clone)]
pub struct FabricConnector {
    dialer: Dialer,
}

impl FabricConnector {
    pub fn new(dialer: Dialer) -> Self {
        Self { dialer }
    }

    pub fn dialer(&self) -> &Dialer {
        &self.dialer
    }
}

impl Service<Uri> for FabricConnector {
    type Response = TokioIo<Connection>;
    type Error = FabricError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let dialer = self.dialer.clone();
        Box::pin(async move {
            trace!(%uri, "connecting through virtual fabric");
            dialer.dial().await.map(TokioIo::new)
        })
    }
}
