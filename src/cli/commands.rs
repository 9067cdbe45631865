//! CLI command implementations
//!
//! Each session command is a thin relay: it sends one request to the daemon
//! and prints what came back.

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::args::{Cli, ConfigCommand, DaemonCommand};
use crate::config::Settings;
use crate::daemon::client::DaemonClient;
use crate::daemon::ipc::{DaemonRequest, DaemonResponse};
use crate::recorder::{probe_liveness, Evidence, RecordingStatus, SessionStatus};
use crate::storage::{StorageProvider, StorageSnapshot};

/// Start recording to today's file
pub async fn start_recording(settings: &Settings) -> Result<()> {
    match session_request(settings, DaemonRequest::Start).await? {
        DaemonResponse::Status { status, .. } => {
            println!("Recording started");
            print_file(&status);
        }
        DaemonResponse::Ignored { status } => {
            println!("Already {}", status.status.to_string().to_lowercase());
        }
        DaemonResponse::Error { message } => {
            anyhow::bail!("Failed to start recording: {}", message);
        }
        _ => anyhow::bail!("Unexpected response from daemon"),
    }

    Ok(())
}

/// Pause the current recording
pub async fn pause_recording(settings: &Settings) -> Result<()> {
    match session_request(settings, DaemonRequest::Pause).await? {
        DaemonResponse::Status { status, .. } => {
            println!("Recording paused at {}", status.elapsed);
        }
        DaemonResponse::Ignored { status } => {
            println!("Nothing to pause (status: {})", status.status);
        }
        DaemonResponse::Error { message } => {
            anyhow::bail!("Failed to pause recording: {}", message);
        }
        _ => anyhow::bail!("Unexpected response from daemon"),
    }

    Ok(())
}

/// Resume a paused recording
pub async fn resume_recording(settings: &Settings) -> Result<()> {
    match session_request(settings, DaemonRequest::Resume).await? {
        DaemonResponse::Status { status, .. } => {
            println!("Recording resumed at {}", status.elapsed);
        }
        DaemonResponse::Ignored { status } => {
            println!("Nothing to resume (status: {})", status.status);
        }
        DaemonResponse::Error { message } => {
            anyhow::bail!("Failed to resume recording: {}", message);
        }
        _ => anyhow::bail!("Unexpected response from daemon"),
    }

    Ok(())
}

/// Stop the current recording
pub async fn stop_recording(settings: &Settings) -> Result<()> {
    match session_request(settings, DaemonRequest::Stop).await? {
        DaemonResponse::Stopped(summary) => {
            println!(
                "Recording stopped: {} (duration: {})",
                summary.path.display(),
                summary.elapsed()
            );
            if let Some(error) = summary.finalize_error {
                println!("warning: the file may be incomplete: {}", error);
            }
        }
        DaemonResponse::Ignored { .. } => {
            println!("Not recording");
        }
        DaemonResponse::Error { message } => {
            anyhow::bail!("Failed to stop recording: {}", message);
        }
        _ => anyhow::bail!("Unexpected response from daemon"),
    }

    Ok(())
}

/// Show current recording status
pub async fn show_status(settings: &Settings) -> Result<()> {
    let mut client = match DaemonClient::connect(settings).await {
        Ok(c) => c,
        Err(_) => {
            println!("Daemon is not running");
            let storage = StorageProvider::from_settings(settings);
            let liveness = probe_liveness(&storage, settings.liveness_window());
            println!(
                "Status: {} ({})",
                liveness.status,
                describe_evidence(liveness.evidence)
            );
            return Ok(());
        }
    };

    match client.send(DaemonRequest::GetStatus).await? {
        DaemonResponse::Status {
            status,
            notification,
        } => {
            print_status(&status);
            if let Some(notification) = notification {
                let actions: Vec<&str> = notification
                    .actions
                    .iter()
                    .map(|a| a.label.as_str())
                    .collect();
                println!(
                    "  Notification: {} [{}]",
                    notification.text,
                    actions.join(" | ")
                );
            }
        }
        DaemonResponse::Error { message } => {
            anyhow::bail!("Failed to get status: {}", message);
        }
        _ => anyhow::bail!("Unexpected response from daemon"),
    }

    Ok(())
}

/// Show free storage and estimated recording time left
pub async fn show_storage(settings: &Settings) -> Result<()> {
    let snapshot = match DaemonClient::connect(settings).await {
        Ok(mut client) => match client.send(DaemonRequest::RefreshStorage).await? {
            DaemonResponse::Storage(snapshot) => snapshot,
            DaemonResponse::Error { message } => {
                anyhow::bail!("Failed to read storage: {}", message);
            }
            _ => anyhow::bail!("Unexpected response from daemon"),
        },
        Err(_) => StorageProvider::from_settings(settings).snapshot(),
    };

    print_storage(settings, &snapshot);
    Ok(())
}

/// List recordings, newest first
pub fn list_recordings(settings: &Settings, limit: usize) -> Result<()> {
    let storage = StorageProvider::from_settings(settings);
    let recordings = storage.list_recordings();

    if recordings.is_empty() {
        println!("No recordings found");
        return Ok(());
    }

    println!("{:<20} {:>10} {:<17}", "File", "Size", "Modified");
    println!("{}", "-".repeat(49));

    for recording in recordings.iter().take(limit) {
        println!(
            "{:<20} {:>10} {:<17}",
            recording.file_name(),
            format_size(recording.size_bytes),
            recording.modified.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

/// Show required permissions and their grant state
pub fn show_permissions(settings: &Settings) -> Result<()> {
    let gate = settings.permission_gate();
    let missing = gate.missing();

    println!("Platform: {}", gate.level());
    for permission in gate.required() {
        let state = if missing.contains(&permission) {
            "missing"
        } else {
            "granted"
        };
        println!("  {:<26} {}", permission.as_str(), state);
    }

    if missing.is_empty() {
        println!("All required permissions granted");
    } else {
        println!(
            "Recording is blocked until these are granted in {}",
            Settings::config_path()?.display()
        );
    }

    Ok(())
}

/// Handle daemon subcommands
pub async fn daemon_command(settings: &Settings, cmd: DaemonCommand) -> Result<()> {
    match cmd {
        DaemonCommand::Start { foreground } => {
            if foreground {
                crate::daemon::run_foreground(settings).await?;
            } else {
                crate::daemon::start_daemon(settings)?;
                println!("Daemon started");
            }
        }
        DaemonCommand::Stop => {
            let mut client = DaemonClient::connect(settings).await?;
            client.send(DaemonRequest::Shutdown).await?;
            println!("Daemon stopped");
        }
        DaemonCommand::Restart => {
            if let Ok(mut client) = DaemonClient::connect(settings).await {
                let _ = client.send(DaemonRequest::Shutdown).await;
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            }
            crate::daemon::start_daemon(settings)?;
            println!("Daemon restarted");
        }
        DaemonCommand::Status => match DaemonClient::connect(settings).await {
            Ok(mut client) => {
                let response = client.send(DaemonRequest::Ping).await?;
                if matches!(response, DaemonResponse::Pong) {
                    match crate::daemon::running_pid(settings) {
                        Some(pid) => println!("Daemon is running (PID: {})", pid),
                        None => println!("Daemon is running"),
                    }
                }
            }
            Err(_) => {
                println!("Daemon is not running");
            }
        },
    }

    Ok(())
}

/// Handle config subcommands
pub fn config_command(settings: &Settings, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let toml = toml::to_string_pretty(settings)?;
            println!("{}", toml);
        }
        ConfigCommand::Path => {
            let path = Settings::config_path()?;
            println!("{}", path.display());
        }
        ConfigCommand::Init { force } => {
            let path = Settings::config_path()?;
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }
            Settings::write_default(&path)?;
            println!("Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

/// Print completion script for the requested shell to stdout.
pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let command_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, command_name, &mut std::io::stdout());
}

// Helper functions

async fn session_request(settings: &Settings, request: DaemonRequest) -> Result<DaemonResponse> {
    let mut client = DaemonClient::connect(settings).await?;
    client.send(request).await
}

fn print_status(status: &SessionStatus) {
    println!("Status: {}", status.status);
    if status.status != RecordingStatus::Stopped {
        println!("  Elapsed: {}", status.elapsed);
        print_file(status);
        if let Some(started_at) = status.started_at {
            println!("  Started: {}", started_at.format("%Y-%m-%d %H:%M:%S"));
        }
    }
}

fn print_file(status: &SessionStatus) {
    if let Some(file) = &status.file {
        println!("  File: {}", file.display());
    }
}

fn print_storage(settings: &Settings, snapshot: &StorageSnapshot) {
    println!("Directory: {}", settings.recordings_dir().display());
    println!("Free: {} bytes", snapshot.formatted_bytes());
    println!(
        "Time left: {} at {} kbps",
        snapshot.time_remaining,
        settings.audio.bitrate / 1000
    );
}

fn describe_evidence(evidence: Evidence) -> &'static str {
    match evidence {
        Evidence::Marker => "from session marker",
        Evidence::StaleMarker => "previous session ended unexpectedly",
        Evidence::RecentWrite => "today's file was written recently",
        Evidence::NoEvidence => "no active session found",
    }
}

fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if b >= GB {
        format!("{:.1} GB", b / GB)
    } else if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_sizes() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn every_evidence_has_a_description() {
        for evidence in [
            Evidence::Marker,
            Evidence::StaleMarker,
            Evidence::RecentWrite,
            Evidence::NoEvidence,
        ] {
            assert!(!describe_evidence(evidence).is_empty());
        }
    }
}
