//! Unix socket server
//!
//! Accepts viewer connections, decodes their messages with [`ServerCodec`]
//! and feeds them to the handlers. Each connection task drains the viewer's
//! registry queue into the socket. Handler replies travel through that queue
//! too, so a viewer receives replies, output and read requests in the order
//! they were queued.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use ttymux_protocol::{ServerCodec, TerminalIndex};
use ttymux_utils::{paths, Result, TtymuxError};

use crate::config::AppConfig;
use crate::handlers::HandlerContext;
use crate::registry::ViewerRegistry;
use crate::tty::{SharedCenter, TtyCenter, TtyHandle};

/// State shared by the accept loop and every connection task
#[derive(Clone)]
pub struct SharedState {
    pub center: SharedCenter,
    pub registry: Arc<ViewerRegistry>,
    pub config: Arc<AppConfig>,
    pub shutdown_tx: broadcast::Sender<()>,
}

impl SharedState {
    pub fn new(config: AppConfig) -> Self {
        let registry = Arc::new(ViewerRegistry::new());
        let center = TtyCenter::new(Arc::clone(&registry), config.tty.clone()).into_shared();
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            center,
            registry,
            config: Arc::new(config),
            shutdown_tx,
        }
    }

    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }
}

/// A bound server, ready to accept viewers
pub struct TtyServer {
    state: SharedState,
    listener: UnixListener,
    socket_path: PathBuf,
}

impl TtyServer {
    /// Bind the listening socket
    ///
    /// A socket file left behind by a previous run is replaced. Must be
    /// called from within a Tokio runtime.
    pub fn bind(config: AppConfig, socket_path: &Path) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            paths::ensure_dir(parent).map_err(|e| TtymuxError::Bind {
                path: socket_path.to_path_buf(),
                source: e,
            })?;
        }

        if socket_path.exists() {
            warn!("Removing stale socket {}", socket_path.display());
            std::fs::remove_file(socket_path).map_err(|e| TtymuxError::Bind {
                path: socket_path.to_path_buf(),
                source: e,
            })?;
        }

        let listener = UnixListener::bind(socket_path).map_err(|e| TtymuxError::Bind {
            path: socket_path.to_path_buf(),
            source: e,
        })?;
        info!("Listening on {}", socket_path.display());

        Ok(Self {
            state: SharedState::new(config),
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn center(&self) -> SharedCenter {
        self.state.center.clone()
    }

    /// Application handle to a terminal, creating it if needed
    pub fn tty(&self, index: TerminalIndex) -> TtyHandle {
        TtyHandle::open(self.center(), index)
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Sender that stops the server when signalled
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.state.shutdown_tx.clone()
    }

    /// Accept viewers until shutdown is signalled
    ///
    /// On shutdown every pending read fails, every claim is revoked and the
    /// socket file is removed.
    pub async fn run(self) -> Result<()> {
        let Self {
            state,
            listener,
            socket_path,
        } = self;

        run_accept_loop(listener, state.clone()).await;

        state.center.lock().shutdown();
        if let Err(e) = std::fs::remove_file(&socket_path) {
            warn!("Failed to remove socket {}: {}", socket_path.display(), e);
        }
        info!("Server stopped");
        Ok(())
    }
}

/// Run the Unix socket accept loop
pub async fn run_accept_loop(listener: UnixListener, state: SharedState) {
    let mut shutdown_rx = state.subscribe_shutdown();

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        debug!("New viewer connection");
                        let state_clone = state.clone();
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            handle_client(reader, writer, state_clone).await;
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, stopping accept loop");
                break;
            }
        }
    }
}

/// Serve one viewer until it disconnects or the server shuts down
pub async fn handle_client<R, W>(reader: R, writer: W, state: SharedState)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (tx, mut rx) = mpsc::channel(state.config.viewers.queue_capacity.max(1));
    let viewer_id = state.registry.register_viewer(tx);
    info!("{} connected", viewer_id);

    let ctx = HandlerContext::new(state.center.clone(), Arc::clone(&state.registry), viewer_id);
    let mut reader = FramedRead::new(reader, ServerCodec::default());
    let mut writer = FramedWrite::new(writer, ServerCodec::default());
    let mut shutdown_rx = state.subscribe_shutdown();

    loop {
        tokio::select! {
            frame = reader.next() => {
                match frame {
                    Some(Ok(msg)) => {
                        if !ctx.dispatch(msg) {
                            warn!("{} fell behind, disconnecting", viewer_id);
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!("Dropping {} after bad frame: {}", viewer_id, e);
                        break;
                    }
                    None => {
                        debug!("{} closed its connection", viewer_id);
                        break;
                    }
                }
            }
            queued = rx.recv() => {
                let Some(msg) = queued else {
                    warn!("{} dropped by the registry, disconnecting", viewer_id);
                    break;
                };
                if let Err(e) = writer.send(msg).await {
                    warn!("Failed to deliver to {}: {}", viewer_id, e);
                    break;
                }
            }
            _ = shutdown_rx.recv() => {
                debug!("Closing {} for shutdown", viewer_id);
                break;
            }
        }
    }

    state.registry.unregister_viewer(viewer_id);
    let released = state.center.lock().release_viewer(viewer_id);
    info!("{} disconnected, released {} claims", viewer_id, released);
}
