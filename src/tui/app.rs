//! Dashboard application state and logic

use crossterm::event::KeyCode;
use ratatui::prelude::*;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::config::Settings;
use crate::daemon::client::DaemonClient;
use crate::daemon::ipc::{DaemonRequest, DaemonResponse};
use crate::recorder::{probe_liveness, RecordingStatus, SessionStatus};
use crate::status::{StatusPublisher, StorageRefresh};
use crate::storage::{StorageProvider, StorageSnapshot};
use crate::tui::screens::DashboardScreen;
use crate::tui::widgets::HelpPopup;

/// How often the session status is polled
const STATUS_POLL: Duration = Duration::from_secs(1);

/// How many recordings the dashboard lists
const RECENT_RECORDINGS: usize = 8;

/// Main application state
pub struct App {
    settings: Settings,
    storage: StorageProvider,
    show_help: bool,
    dashboard: DashboardScreen,

    // Session as last reported by the daemon, or by the probe when it is down
    status: SessionStatus,
    daemon_online: bool,
    last_status_update: Instant,

    storage_rx: watch::Receiver<StorageSnapshot>,
    refresh: Option<StorageRefresh>,
}

impl App {
    /// Create the app and start its storage refresh task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(settings: Settings) -> Self {
        let storage = StorageProvider::from_settings(&settings);
        let publisher = StatusPublisher::new();
        let storage_rx = publisher.subscribe_storage();
        let refresh =
            StorageRefresh::spawn(storage.clone(), publisher, settings.refresh_interval());

        let mut dashboard = DashboardScreen::new();
        dashboard.set_recordings(recent_recordings(&storage));

        Self {
            settings,
            storage,
            show_help: false,
            dashboard,
            status: SessionStatus::default(),
            daemon_online: false,
            last_status_update: Instant::now(),
            storage_rx,
            refresh: Some(refresh),
        }
    }

    /// Draw the dashboard and, on top of it, the help popup
    pub fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let storage = self.storage_rx.borrow().clone();

        self.dashboard
            .draw(frame, area, &self.status, &storage, self.daemon_online);

        if self.show_help {
            let supports_pause = self.settings.platform.level.capabilities().supports_pause;
            HelpPopup::draw(frame, area, supports_pause);
        }
    }

    /// Handle key input
    pub async fn handle_key(&mut self, key: KeyCode) {
        if self.show_help {
            self.show_help = false;
            return;
        }

        if let Some(request) = request_for_key(key, self.status.status) {
            self.send(request).await;
        }
    }

    async fn send(&mut self, request: DaemonRequest) {
        let response = match DaemonClient::connect(&self.settings).await {
            Ok(mut client) => client.send(request).await,
            Err(_) => {
                self.daemon_online = false;
                self.dashboard.set_message(
                    "Daemon is not running. Start it with: audiotracer daemon start",
                );
                return;
            }
        };

        match response {
            Ok(response) => {
                self.dashboard.set_message(describe_response(&response));
                if let DaemonResponse::Status { status, .. } | DaemonResponse::Ignored { status } =
                    response
                {
                    self.status = status;
                }
            }
            Err(e) => self.dashboard.set_message(format!("Request failed: {:#}", e)),
        }

        // A start or stop changes the file list and the free space
        self.dashboard.set_recordings(recent_recordings(&self.storage));
        if let Some(refresh) = &self.refresh {
            refresh.refresh_now();
        }
        self.poll_status().await;
    }

    pub fn should_quit(&self) -> bool {
        !self.show_help
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn close_help(&mut self) {
        self.show_help = false;
    }

    /// Periodic work between key presses
    pub async fn update(&mut self) {
        if self.last_status_update.elapsed() > STATUS_POLL {
            self.poll_status().await;
        }
    }

    /// Ask the daemon for the session status, falling back to the probe
    pub async fn poll_status(&mut self) {
        self.last_status_update = Instant::now();

        if let Ok(mut client) = DaemonClient::connect(&self.settings).await {
            if let Ok(DaemonResponse::Status { status, .. }) =
                client.send(DaemonRequest::GetStatus).await
            {
                self.status = status;
                self.daemon_online = true;
                return;
            }
        }

        self.daemon_online = false;
        let liveness = probe_liveness(&self.storage, self.settings.liveness_window());
        self.status = SessionStatus {
            status: liveness.status,
            file: liveness.marker.as_ref().map(|m| m.path.clone()),
            started_at: liveness.marker.as_ref().map(|m| m.started_at),
            session_id: liveness.marker.map(|m| m.session_id),
            ..SessionStatus::default()
        };
    }

    /// Cancel the storage refresh task
    pub async fn shutdown(&mut self) {
        if let Some(refresh) = self.refresh.take() {
            refresh.cancel().await;
        }
    }
}

/// Map a dashboard key to the session command it stands for.
///
/// `p` toggles between pause and resume based on the current status.
pub fn request_for_key(key: KeyCode, status: RecordingStatus) -> Option<DaemonRequest> {
    match key {
        KeyCode::Char('s') => Some(DaemonRequest::Start),
        KeyCode::Char('p') => match status {
            RecordingStatus::Recording => Some(DaemonRequest::Pause),
            RecordingStatus::Paused => Some(DaemonRequest::Resume),
            RecordingStatus::Stopped => None,
        },
        KeyCode::Char('x') => Some(DaemonRequest::Stop),
        _ => None,
    }
}

/// One-line summary of a daemon reply for the message bar
pub fn describe_response(response: &DaemonResponse) -> String {
    match response {
        DaemonResponse::Status { status, .. } => match status.status {
            RecordingStatus::Recording => format!("Recording ({})", status.elapsed),
            RecordingStatus::Paused => format!("Paused at {}", status.elapsed),
            RecordingStatus::Stopped => "Stopped".to_string(),
        },
        DaemonResponse::Ignored { status } => {
            format!("Nothing to do while {}", status.status.to_string().to_lowercase())
        }
        DaemonResponse::Stopped(summary) => match &summary.finalize_error {
            Some(e) => format!("Stopped at {} (file may be incomplete: {})", summary.elapsed(), e),
            None => format!("Saved {} ({})", summary.path.display(), summary.elapsed()),
        },
        DaemonResponse::Error { message } => format!("Error: {}", message),
        DaemonResponse::Storage(_) | DaemonResponse::Pong | DaemonResponse::Ok => String::new(),
    }
}

fn recent_recordings(storage: &StorageProvider) -> Vec<crate::storage::RecordingFile> {
    let mut recordings = storage.list_recordings();
    recordings.truncate(RECENT_RECORDINGS);
    recordings
}
