//! IPC protocol definitions for daemon communication
//!
//! Frames are a little-endian `u32` length followed by that many bytes of
//! JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::notification::Notification;
use crate::recorder::{SessionStatus, StopSummary};
use crate::storage::StorageSnapshot;

/// Largest frame either side will accept
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Request sent from CLI/TUI to daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DaemonRequest {
    /// Start recording to today's file
    Start,

    /// Pause the current recording
    Pause,

    /// Resume a paused recording
    Resume,

    /// Stop and finalize the current recording
    Stop,

    /// Get current session status and notification
    GetStatus,

    /// Get the latest storage snapshot
    GetStorage,

    /// Recompute the storage snapshot now
    RefreshStorage,

    /// Ping to check if daemon is alive
    Ping,

    /// Shutdown the daemon
    Shutdown,
}

/// Response sent from daemon to CLI/TUI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DaemonResponse {
    /// Session status, after a transition or on request
    Status {
        status: SessionStatus,
        notification: Option<Notification>,
    },

    /// The command was not legal in the current state; nothing changed
    Ignored { status: SessionStatus },

    /// Recording stopped
    Stopped(StopSummary),

    /// Free space and estimated recording time
    Storage(StorageSnapshot),

    /// Pong response to ping
    Pong,

    /// Acknowledgment (for shutdown, etc.)
    Ok,

    /// Error response
    Error { message: String },
}

/// Serialize a request into a length-prefixed frame
pub fn serialize_request(request: &DaemonRequest) -> serde_json::Result<Vec<u8>> {
    to_frame(request)
}

/// Serialize a response into a length-prefixed frame
pub fn serialize_response(response: &DaemonResponse) -> serde_json::Result<Vec<u8>> {
    to_frame(response)
}

/// Deserialize a request from a frame body
pub fn deserialize_request(data: &[u8]) -> serde_json::Result<DaemonRequest> {
    from_body(data)
}

/// Deserialize a response from a frame body
pub fn deserialize_response(data: &[u8]) -> serde_json::Result<DaemonResponse> {
    from_body(data)
}

fn to_frame<T: Serialize>(message: &T) -> serde_json::Result<Vec<u8>> {
    let json = serde_json::to_vec(message)?;
    let len = json.len() as u32;
    let mut bytes = len.to_le_bytes().to_vec();
    bytes.extend(json);
    Ok(bytes)
}

fn from_body<T: DeserializeOwned>(data: &[u8]) -> serde_json::Result<T> {
    serde_json::from_slice(data)
}

/// Read one frame body. `Ok(None)` means the peer closed the stream
/// cleanly between frames.
pub async fn read_frame<R>(stream: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Message too large: {} bytes", len),
        ));
    }

    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Write an already serialized frame
pub async fn write_frame<W>(stream: &mut W, frame: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    stream.write_all(frame).await?;
    stream.flush().await
}
