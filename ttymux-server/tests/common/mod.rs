//! Shared helpers for end-to-end tests over a real Unix socket

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tempfile::TempDir;
use tokio::net::UnixStream;
use tokio::sync::broadcast;
use tokio_util::codec::Framed;
use uuid::Uuid;

use ttymux_protocol::{
    ClientCodec, ClientMessage, ReadRequest, ReadResponse, ServerMessage, TerminalIndex,
    PROTOCOL_VERSION,
};
use ttymux_server::config::AppConfig;
use ttymux_server::{SharedCenter, TtyHandle, TtyServer};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// A running server in a temporary directory
pub struct TestServer {
    pub center: SharedCenter,
    pub shutdown: broadcast::Sender<()>,
    server: Option<TtyServer>,
    dir: TempDir,
}

impl TestServer {
    /// Bind a server but don't start accepting yet
    pub fn bind() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let server = TtyServer::bind(AppConfig::default(), &dir.path().join("ttymux.sock")).unwrap();
        Self {
            center: server.center(),
            shutdown: server.shutdown_handle(),
            server: Some(server),
            dir,
        }
    }

    /// Application handle to a terminal
    pub fn tty(&self, index: u32) -> TtyHandle {
        TtyHandle::open(self.center.clone(), TerminalIndex::from(index))
    }

    pub fn socket_path(&self) -> std::path::PathBuf {
        self.dir.path().join("ttymux.sock")
    }

    /// Start accepting viewers
    pub fn start(&mut self) {
        let server = self.server.take().unwrap();
        tokio::spawn(server.run());
    }

    pub async fn viewer(&self) -> TestViewer {
        TestViewer::connect(&self.socket_path()).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

/// A viewer speaking the wire protocol
pub struct TestViewer {
    framed: Framed<UnixStream, ClientCodec>,
}

impl TestViewer {
    /// Connect and complete the handshake
    pub async fn connect(path: &Path) -> Self {
        let mut viewer = Self::connect_raw(path).await;
        viewer
            .send(ClientMessage::Connect {
                client_id: Uuid::new_v4(),
                protocol_version: PROTOCOL_VERSION,
            })
            .await;
        match viewer.recv().await {
            ServerMessage::Connected { .. } => viewer,
            other => panic!("Expected Connected, got {:?}", other),
        }
    }

    /// Connect without a handshake
    pub async fn connect_raw(path: &Path) -> Self {
        let stream = UnixStream::connect(path).await.unwrap();
        Self {
            framed: Framed::new(stream, ClientCodec::new()),
        }
    }

    pub async fn send(&mut self, msg: ClientMessage) {
        self.framed.send(msg).await.unwrap();
    }

    /// Next message from the server
    pub async fn recv(&mut self) -> ServerMessage {
        match tokio::time::timeout(RECV_TIMEOUT, self.framed.next()).await {
            Ok(Some(Ok(msg))) => msg,
            Ok(Some(Err(e))) => panic!("Decode error: {}", e),
            Ok(None) => panic!("Server closed the connection"),
            Err(_) => panic!("Timed out waiting for a server message"),
        }
    }

    /// Next message accepted by `pick`, skipping everything else
    pub async fn recv_until<T>(&mut self, mut pick: impl FnMut(ServerMessage) -> Option<T>) -> T {
        loop {
            if let Some(found) = pick(self.recv().await) {
                return found;
            }
        }
    }

    /// Whatever arrives within `wait`, without blocking longer
    pub async fn drain(&mut self, wait: Duration) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(Some(Ok(msg))) = tokio::time::timeout(wait, self.framed.next()).await {
            messages.push(msg);
        }
        messages
    }

    /// Send a request and wait for the response it produces
    pub async fn request<T>(
        &mut self,
        msg: ClientMessage,
        pick: impl FnMut(ServerMessage) -> Option<T>,
    ) -> T {
        self.send(msg).await;
        self.recv_until(pick).await
    }

    /// Claim or release read authority, returning the `ok` flag
    pub async fn set_read_enabled(&mut self, terminal: i64, enabled: bool) -> bool {
        self.request(
            ClientMessage::SetReadEnabled { terminal, enabled },
            |msg| match msg {
                ServerMessage::ReadEnabled { ok, .. } => Some(ok),
                _ => None,
            },
        )
        .await
    }

    /// Wait for the next read request, returning its id and payload
    pub async fn next_read_request(&mut self) -> (u32, ReadRequest) {
        self.recv_until(|msg| match msg {
            ServerMessage::SendReadRequest {
                request_id,
                request,
                ..
            } => Some((request_id, request)),
            _ => None,
        })
        .await
    }

    /// Resolve a read, returning the `ok` flag
    pub async fn resolve(
        &mut self,
        terminal: i64,
        request_id: u32,
        value: ReadResponse,
    ) -> bool {
        self.request(
            ClientMessage::ResolveReadRequest {
                terminal,
                request_id,
                value,
            },
            |msg| match msg {
                ServerMessage::ReadSettled { ok, .. } => Some(ok),
                _ => None,
            },
        )
        .await
    }
}
