//! Unix socket IPC server for daemon communication

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::daemon::ipc::{
    deserialize_request, read_frame, serialize_response, write_frame, DaemonRequest,
    DaemonResponse,
};

/// A request paired with the channel its response goes back on
pub type Command = (DaemonRequest, oneshot::Sender<DaemonResponse>);

/// Command channel for the server
pub type CommandSender = mpsc::Sender<Command>;
pub type CommandReceiver = mpsc::Receiver<Command>;

/// IPC server that listens on a Unix socket
pub struct IpcServer {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
}

impl IpcServer {
    /// Create a new IPC server
    pub fn new(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            listener: None,
        }
    }

    /// Start listening on the socket
    pub async fn start(&mut self) -> Result<()> {
        // Remove stale socket file if it exists
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind {}", self.socket_path.display()))?;
        info!("IPC server listening on {:?}", self.socket_path);
        self.listener = Some(listener);

        Ok(())
    }

    /// Accept connections, forwarding each request to the command handler
    pub async fn run(&mut self, cmd_tx: CommandSender) -> Result<()> {
        let listener = self
            .listener
            .take()
            .context("IPC server must be started before it runs")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let tx = cmd_tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, tx).await {
                            error!("Connection error: {:#}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }

    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}

/// Serve requests from one client until it disconnects or asks for shutdown
async fn handle_connection(mut stream: UnixStream, cmd_tx: CommandSender) -> Result<()> {
    debug!("New client connection");

    while let Some(body) = read_frame(&mut stream).await? {
        let request = match deserialize_request(&body) {
            Ok(request) => request,
            Err(e) => {
                error!("Failed to deserialize request: {}", e);
                let response = DaemonResponse::Error {
                    message: format!("Invalid request: {}", e),
                };
                write_frame(&mut stream, &serialize_response(&response)?).await?;
                continue;
            }
        };

        debug!("Received request: {:?}", request);
        let is_shutdown = request == DaemonRequest::Shutdown;

        let (resp_tx, resp_rx) = oneshot::channel();
        cmd_tx
            .send((request, resp_tx))
            .await
            .context("Command handler has shut down")?;

        let response = resp_rx.await.unwrap_or(DaemonResponse::Error {
            message: "Handler closed".to_string(),
        });

        write_frame(&mut stream, &serialize_response(&response)?).await?;

        if is_shutdown {
            break;
        }
    }

    debug!("Client disconnected");
    Ok(())
}
