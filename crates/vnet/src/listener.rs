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

//! Listener and dialer halves of the fabric

use crate::config::FabricConfig;
use crate::connection::{Connection, ConnectionInfo};
use crate::error::{FabricError, FabricResult};
use futures::Stream;
use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll, ready};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

/// A dial waiting for the listener to accept it
struct PendingDial {
    connection: Connection,
    accepted: oneshot::Sender<()>,
}

#[derive(Debug, Default)]
struct DialStats {
    next_id: AtomicU64,
    established: AtomicU64,
}

/// Connection factory paired with one [`VirtualListener`].
///
/// Cheap to clone; every clone dials the same listener.
#[derive(Clone)]
pub struct Dialer {
    sender: mpsc::Sender<PendingDial>,
    buffer_size: usize,
    stats: Arc<DialStats>,
}

impl Dialer {
    /// Open a new connection and wait until the listener accepts it
    pub async fn dial(&self) -> FabricResult<Connection> {
        let id = self.stats.next_id.fetch_add(1, Ordering::Relaxed);
        let info = ConnectionInfo { id };
        let (local, remote) = tokio::io::duplex(self.buffer_size);
        let (accepted_tx, accepted_rx) = oneshot::channel();

        trace!(connection_id = id, "dialing virtual listener");

        self.sender
            .send(PendingDial {
                connection: Connection::new(remote, info),
                accepted: accepted_tx,
            })
            .await
            .map_err(|_| FabricError::Closed)?;

        // The listener drops the pending dial if it closes before accepting it
        accepted_rx.await.map_err(|_| FabricError::Closed)?;

        self.stats.established.fetch_add(1, Ordering::Relaxed);
        debug!(connection_id = id, "virtual connection established");

        Ok(Connection::new(local, info))
    }

    /// Number of dials that completed the handshake
    pub fn dial_count(&self) -> u64 {
        self.stats.established.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for Dialer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dialer").field("buffer_size", &self.buffer_size).field("closed", &self.sender.is_closed()).finish()
    }
}

/// Accepting half of the fabric
pub struct VirtualListener {
    pending: mpsc::Receiver<PendingDial>,
    dialer: Dialer,
}

impl VirtualListener {
    pub fn bind(config: FabricConfig) -> Self {
        let (sender, pending) = mpsc::channel(config.backlog.max(1));
        let dialer = Dialer {
            sender,
            buffer_size: config.buffer_size,
            stats: Arc::new(DialStats::default()),
        };

        debug!(buffer_size = config.buffer_size, backlog = config.backlog, "virtual listener bound");

        Self { pending, dialer }
    }

    /// A dialer connected to this listener
    pub fn dialer(&self) -> Dialer {
        self.dialer.clone()
    }

    /// Wait for the next dial and complete its handshake
    pub async fn accept(&mut self) -> FabricResult<Connection> {
        poll_fn(|cx| self.poll_accept(cx)).await
    }

    pub fn poll_accept(&mut self, cx: &mut Context<'_>) -> Poll<FabricResult<Connection>> {
        loop {
            match ready!(self.pending.poll_recv(cx)) {
                Some(PendingDial { connection, accepted }) => {
                    if accepted.send(()).is_err() {
                        // Dialer gave up before the handshake finished
                        trace!(connection_id = connection.id(), "discarding abandoned dial");
                        continue;
                    }
                    trace!(connection_id = connection.id(), "virtual connection accepted");
                    return Poll::Ready(Ok(connection));
                }
                None => return Poll::Ready(Err(FabricError::Closed)),
            }
        }
    }

    /// Stop accepting new dials.
    ///
    /// Dials already queued can still be accepted; once they are drained
    /// `accept` reports [`FabricError::Closed`].
    pub fn close(&mut self) {
        debug!("virtual listener closed");
        self.pending.close();
    }
}

impl Stream for VirtualListener {
    type Item = FabricResult<Connection>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // A closed fabric ends the stream rather than yielding an error, so
        // accept loops terminate cleanly
        match self.get_mut().poll_accept(cx) {
            Poll::Ready(Ok(connection)) => Poll::Ready(Some(Ok(connection))),
            Poll::Ready(Err(FabricError::Closed)) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for VirtualListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualListener").field("dialer", &self.dialer).finish()
    }
}
