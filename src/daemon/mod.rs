//! Daemon module for audiotracer
//!
//! The daemon owns the recording session (the long-running service that
//! must stay up while audio is captured) and serves session commands over
//! a Unix socket.

pub mod client;
pub mod ipc;
pub mod server;
pub mod service;

use anyhow::Result;
use std::process::Command;
use std::time::{Duration, Instant};

use crate::config::Settings;
use crate::recorder::process_alive;

/// How long `start_daemon` waits for the socket and PID file
const READY_TIMEOUT: Duration = Duration::from_secs(2);

/// PID recorded in the daemon's PID file, if it names a live process
pub fn running_pid(settings: &Settings) -> Option<u32> {
    let pid = std::fs::read_to_string(settings.pid_path())
        .ok()?
        .trim()
        .parse::<u32>()
        .ok()?;
    process_alive(pid).then_some(pid)
}

/// Start the daemon as a background process
pub fn start_daemon(settings: &Settings) -> Result<()> {
    let pid_path = settings.pid_path();
    let socket_path = settings.socket_path();

    if let Some(pid) = running_pid(settings) {
        anyhow::bail!("Daemon is already running (PID: {})", pid);
    }

    // Stale PID file or socket from a daemon that died
    if pid_path.exists() {
        std::fs::remove_file(&pid_path)?;
    }
    if socket_path.exists() {
        let _ = std::fs::remove_file(&socket_path);
    }

    let exe = std::env::current_exe()?;
    let mut child = Command::new(exe)
        .args(["daemon", "start", "--foreground"])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()?;

    // Wait for daemon readiness so callers don't get a false positive start.
    let deadline = Instant::now() + READY_TIMEOUT;
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait()? {
            anyhow::bail!(
                "Daemon failed to start (exit: {}). Run `audiotracer daemon start --foreground` for details.",
                status
            );
        }

        if pid_path.exists() && socket_path.exists() {
            return Ok(());
        }

        std::thread::sleep(Duration::from_millis(50));
    }

    anyhow::bail!("Daemon start timed out. Run `audiotracer daemon start --foreground` for details.")
}

/// Run the daemon in the foreground
pub async fn run_foreground(settings: &Settings) -> Result<()> {
    service::run(settings).await
}
