//! Main daemon service implementation

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::capture::{Encoding, FfmpegFactory};
use crate::config::Settings;
use crate::daemon::ipc::{DaemonRequest, DaemonResponse};
use crate::daemon::server::{Command, CommandReceiver, IpcServer};
use crate::recorder::{
    probe_liveness, Evidence, Recorder, RecorderError, RecordingStatus, Transition,
};
use crate::status::{StatusPublisher, StorageRefresh};
use crate::storage::StorageProvider;

/// How often the notification's elapsed time is refreshed while recording
const NOTIFICATION_TICK: Duration = Duration::from_secs(1);

/// Run the daemon service
pub async fn run(settings: &Settings) -> Result<()> {
    info!("Starting audiotracer daemon");

    let storage = StorageProvider::from_settings(settings);
    if let Err(e) = storage.ensure_dir() {
        warn!(
            "Recordings directory {} is not available yet: {}",
            storage.audio_dir().display(),
            e
        );
    }

    let liveness = probe_liveness(&storage, settings.liveness_window());
    match liveness.evidence {
        Evidence::Marker => warn!(
            "Session marker is held by another live process: {:?}",
            liveness.marker.map(|m| m.pid)
        ),
        Evidence::StaleMarker => info!("Cleared session marker left by a previous run"),
        Evidence::RecentWrite | Evidence::NoEvidence => {}
    }

    let publisher = StatusPublisher::new();
    let refresh =
        StorageRefresh::spawn(storage.clone(), publisher.clone(), settings.refresh_interval());

    let recorder = Recorder::new(
        storage,
        settings.permission_gate(),
        Box::new(FfmpegFactory::from_settings(settings)),
        Arc::new(publisher.clone()),
        publisher.clone(),
        Encoding::from_settings(settings),
    );

    // Create command channel
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(32);

    // Start IPC server
    let mut server = IpcServer::new(settings.socket_path());
    server.start().await?;

    // Write PID file once the socket is ready
    std::fs::write(settings.pid_path(), std::process::id().to_string())?;

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run(cmd_tx).await {
            error!("IPC server error: {:#}", e);
        }
    });

    let handler_result = command_handler(recorder, publisher, cmd_rx).await;

    // Cleanup
    info!("Shutting down daemon");
    refresh.cancel().await;
    let _ = std::fs::remove_file(settings.pid_path());
    server_handle.abort();

    handler_result
}

/// Own the recorder and apply commands one at a time until shutdown
pub async fn command_handler(
    mut recorder: Recorder,
    publisher: StatusPublisher,
    mut cmd_rx: CommandReceiver,
) -> Result<()> {
    let mut ticker = tokio::time::interval(NOTIFICATION_TICK);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            command = cmd_rx.recv() => {
                let Some((request, resp_tx)) = command else {
                    break;
                };
                let is_shutdown = request == DaemonRequest::Shutdown;
                let response = dispatch(&mut recorder, &publisher, request);
                let _ = resp_tx.send(response);
                if is_shutdown {
                    break;
                }
            }
            _ = ticker.tick() => {
                if recorder.status() == RecordingStatus::Recording {
                    recorder.refresh();
                }
            }
            _ = &mut shutdown => {
                info!("Termination signal received");
                break;
            }
        }
    }

    if let Some(summary) = recorder.stop() {
        info!(
            "Stopped active recording {} on shutdown ({})",
            summary.session_id,
            summary.elapsed()
        );
    }

    Ok(())
}

/// Apply one request to the recorder
pub fn dispatch(
    recorder: &mut Recorder,
    publisher: &StatusPublisher,
    request: DaemonRequest,
) -> DaemonResponse {
    match request {
        DaemonRequest::Start => {
            let outcome = recorder.start();
            transition_response(recorder, publisher, outcome)
        }
        DaemonRequest::Pause => {
            let outcome = recorder.pause();
            transition_response(recorder, publisher, outcome)
        }
        DaemonRequest::Resume => {
            let outcome = recorder.resume();
            transition_response(recorder, publisher, outcome)
        }
        DaemonRequest::Stop => match recorder.stop() {
            Some(summary) => DaemonResponse::Stopped(summary),
            None => DaemonResponse::Ignored {
                status: recorder.snapshot(),
            },
        },
        DaemonRequest::GetStatus => status_response(recorder, publisher),
        DaemonRequest::GetStorage => DaemonResponse::Storage(publisher.storage()),
        DaemonRequest::RefreshStorage => {
            let snapshot = recorder.storage().snapshot();
            publisher.publish_storage(snapshot.clone());
            DaemonResponse::Storage(snapshot)
        }
        DaemonRequest::Ping => DaemonResponse::Pong,
        DaemonRequest::Shutdown => DaemonResponse::Ok,
    }
}

fn transition_response(
    recorder: &Recorder,
    publisher: &StatusPublisher,
    outcome: Result<Transition, RecorderError>,
) -> DaemonResponse {
    match outcome {
        Ok(Transition::Applied(_)) => status_response(recorder, publisher),
        Ok(Transition::Ignored(_)) => DaemonResponse::Ignored {
            status: recorder.snapshot(),
        },
        Err(e) => DaemonResponse::Error {
            message: e.to_string(),
        },
    }
}

fn status_response(recorder: &Recorder, publisher: &StatusPublisher) -> DaemonResponse {
    DaemonResponse::Status {
        status: recorder.snapshot(),
        notification: publisher.notification(),
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("Could not listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
