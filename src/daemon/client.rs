//! IPC client for communicating with the daemon

use anyhow::{Context, Result};
use tokio::net::UnixStream;

use crate::config::Settings;
use crate::daemon::ipc::{
    deserialize_response, read_frame, serialize_request, write_frame, DaemonRequest,
    DaemonResponse,
};

/// Client for communicating with the daemon
pub struct DaemonClient {
    stream: UnixStream,
}

impl DaemonClient {
    /// Connect to the daemon
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let socket_path = settings.socket_path();

        let stream = UnixStream::connect(&socket_path).await.with_context(|| {
            format!(
                "Failed to connect to daemon at {:?}. Is the daemon running? Try: audiotracer daemon start",
                socket_path
            )
        })?;

        Ok(Self { stream })
    }

    /// Send a request and wait for response
    pub async fn send(&mut self, request: DaemonRequest) -> Result<DaemonResponse> {
        let frame = serialize_request(&request)?;
        write_frame(&mut self.stream, &frame).await?;

        let body = read_frame(&mut self.stream)
            .await?
            .context("Daemon closed the connection without answering")?;

        deserialize_response(&body).context("Failed to parse response")
    }
}
