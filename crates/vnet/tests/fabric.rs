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

//! Integration tests for the virtual fabric

use std::collections::HashSet;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_stream::StreamExt;
use tower::Service;
use vnet::{FabricConfig, FabricConnector, FabricError, VirtualListener};

#[tokio::test]
async fn test_data_arrives_in_order_through_small_buffer() {
    let mut listener = vnet::listen(16);
    let dialer = listener.dialer();

    let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    let expected = payload.clone();

    let writer = tokio::spawn(async move {
        let mut conn = dialer.dial().await.unwrap();
        conn.write_all(&payload).await.unwrap();
        conn.shutdown().await.unwrap();
    });

    let mut conn = listener.accept().await.unwrap();
    let mut received = Vec::new();
    conn.read_to_end(&mut received).await.unwrap();
    writer.await.unwrap();

    assert_eq!(received, expected);
}

#[tokio::test]
async fn test_writer_suspends_when_buffer_is_full() {
    let mut listener = vnet::listen(8);
    let dialer = listener.dialer();

    let accept = tokio::spawn(async move { listener.accept().await });
    let mut conn = dialer.dial().await.unwrap();
    let mut peer = accept.await.unwrap().unwrap();

    let blocked = tokio::time::timeout(Duration::from_millis(50), conn.write_all(&[1u8; 32])).await;
    assert!(blocked.is_err(), "writer should wait for the reader instead of dropping data");

    // Draining the peer lets a fresh write through
    let mut buf = [0u8; 8];
    peer.read_exact(&mut buf).await.unwrap();
    assert_eq!(buf, [1u8; 8]);
}

#[tokio::test]
async fn test_concurrent_dials_each_accepted_once() {
    let mut listener = VirtualListener::bind(FabricConfig { buffer_size: 64, backlog: 2 });
    let dialer = listener.dialer();

    let dials: Vec<_> = (0..8)
        .map(|_| {
            let dialer = dialer.clone();
            tokio::spawn(async move { dialer.dial().await.map(|c| c.id()) })
        })
        .collect();

    let mut accepted = HashSet::new();
    for _ in 0..8 {
        let conn = listener.next().await.unwrap().unwrap();
        assert!(accepted.insert(conn.id()), "connection accepted twice");
    }

    let mut dialed = HashSet::new();
    for dial in dials {
        dialed.insert(dial.await.unwrap().unwrap());
    }

    assert_eq!(accepted, dialed);
    assert_eq!(dialer.dial_count(), 8);
}

#[tokio::test]
async fn test_listener_stream_ends_when_closed() {
    let mut listener = vnet::listen(64);
    listener.close();

    assert!(listener.next().await.is_none());
    assert_eq!(listener.dialer().dial().await.unwrap_err(), FabricError::Closed);
}

#[tokio::test]
async fn test_connector_dials_listener() {
    let mut listener = vnet::listen(64);
    let mut connector = FabricConnector::new(listener.dialer());

    let accept = tokio::spawn(async move { listener.accept().await.map(|c| c.id()) });
    let io = connector.call("http://fabric.local".parse().unwrap()).await.unwrap();

    assert_eq!(accept.await.unwrap().unwrap(), io.inner().id());
    assert_eq!(connector.dialer().dial_count(), 1);
}
