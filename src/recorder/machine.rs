//! The recording session state machine

use std::sync::Arc;
use tracing::{info, warn};

use crate::capture::{CaptureConfig, CaptureFactory, CaptureResource, Encoding};
use crate::clock::Clock;
use crate::notification::{Notification, NotificationSink};
use crate::permissions::PermissionGate;
use crate::platform::Capabilities;
use crate::status::StatusPublisher;
use crate::storage::{SessionMarker, StorageProvider};

use super::state::{
    RecordingStatus, Session, SessionState, SessionStatus, StopSummary, Transition,
};
use super::RecorderError;

/// Owns the capture resource and the session around it.
///
/// Entry points take `&mut self`; callers that share a recorder across tasks
/// must funnel every call through one owner (the daemon's command handler).
pub struct Recorder {
    storage: StorageProvider,
    gate: PermissionGate,
    capabilities: Capabilities,
    factory: Box<dyn CaptureFactory>,
    notifier: Arc<dyn NotificationSink>,
    publisher: StatusPublisher,
    encoding: Encoding,
    clock: Arc<dyn Clock>,
    state: SessionState,
}

impl Recorder {
    pub fn new(
        storage: StorageProvider,
        gate: PermissionGate,
        factory: Box<dyn CaptureFactory>,
        notifier: Arc<dyn NotificationSink>,
        publisher: StatusPublisher,
        encoding: Encoding,
    ) -> Self {
        let capabilities = gate.level().capabilities();
        let clock = storage.clock().clone();
        Self {
            storage,
            gate,
            capabilities,
            factory,
            notifier,
            publisher,
            encoding,
            clock,
            state: SessionState::Stopped,
        }
    }

    pub fn status(&self) -> RecordingStatus {
        self.state.status()
    }

    pub fn session(&self) -> Option<&Session> {
        self.state.session()
    }

    /// Status with elapsed time computed now
    pub fn snapshot(&self) -> SessionStatus {
        self.state.to_status(self.clock.now())
    }

    pub fn storage(&self) -> &StorageProvider {
        &self.storage
    }

    /// Start a session writing to today's file.
    ///
    /// Ignored unless stopped. Preconditions are checked before any capture
    /// resource is touched; a resource that fails to start is released and
    /// the recorder stays stopped.
    pub fn start(&mut self) -> Result<Transition, RecorderError> {
        if !matches!(self.state, SessionState::Stopped) {
            info!("Start ignored: already {}", self.status());
            return Ok(Transition::Ignored(self.status()));
        }

        let missing = self.gate.missing();
        if !missing.is_empty() {
            warn!("Start refused, missing permissions: {:?}", missing);
            return Err(RecorderError::PermissionsMissing(missing));
        }

        self.storage
            .ensure_dir()
            .map_err(|source| RecorderError::StorageUnavailable {
                path: self.storage.audio_dir().to_path_buf(),
                source,
            })?;

        let path = self.storage.resolve_today_file();
        let config = self.encoding.config_for(path.clone());

        let capture = match self.begin_capture(&config) {
            Ok(capture) => capture,
            Err(e) => {
                warn!("Failed to start capture: {:#}", e);
                self.publish();
                return Err(RecorderError::CaptureStart(format!("{:#}", e)));
            }
        };

        let session = Session::new(capture, path, self.clock.now());
        info!(
            "Recording started: {} -> {} ({})",
            session.id,
            session.path.display(),
            session.capture.backend_name()
        );
        self.state = SessionState::Recording(session);

        self.write_marker();
        self.refresh();
        Ok(Transition::Applied(RecordingStatus::Recording))
    }

    /// Suspend capture. Ignored unless recording on a pause-capable platform.
    pub fn pause(&mut self) -> Result<Transition, RecorderError> {
        if !self.capabilities.supports_pause {
            info!("Pause ignored: not supported on this platform");
            return Ok(Transition::Ignored(self.status()));
        }

        let now = self.clock.now();
        let (next, outcome) = match std::mem::take(&mut self.state) {
            SessionState::Recording(mut session) => match session.capture.pause() {
                Ok(()) => {
                    session.close_span(now);
                    info!("Recording paused: {}", session.id);
                    (
                        SessionState::Paused(session),
                        Ok(Transition::Applied(RecordingStatus::Paused)),
                    )
                }
                Err(e) => {
                    warn!("Failed to pause {}: {:#}", session.id, e);
                    (
                        SessionState::Recording(session),
                        Err(RecorderError::Pause(format!("{:#}", e))),
                    )
                }
            },
            other => {
                let status = other.status();
                (other, Ok(Transition::Ignored(status)))
            }
        };
        self.state = next;

        self.after_transition(&outcome);
        outcome
    }

    /// Continue a paused session. Ignored unless paused.
    pub fn resume(&mut self) -> Result<Transition, RecorderError> {
        if !self.capabilities.supports_pause {
            info!("Resume ignored: not supported on this platform");
            return Ok(Transition::Ignored(self.status()));
        }

        let now = self.clock.now();
        let (next, outcome) = match std::mem::take(&mut self.state) {
            SessionState::Paused(mut session) => match session.capture.resume() {
                Ok(()) => {
                    session.open_span(now);
                    info!("Recording resumed: {}", session.id);
                    (
                        SessionState::Recording(session),
                        Ok(Transition::Applied(RecordingStatus::Recording)),
                    )
                }
                Err(e) => {
                    warn!("Failed to resume {}: {:#}", session.id, e);
                    (
                        SessionState::Paused(session),
                        Err(RecorderError::Resume(format!("{:#}", e))),
                    )
                }
            },
            other => {
                let status = other.status();
                (other, Ok(Transition::Ignored(status)))
            }
        };
        self.state = next;

        self.after_transition(&outcome);
        outcome
    }

    /// End the session. Never fails: finalize errors are logged and reported
    /// in the summary, and the resource is released regardless. Returns
    /// `None` when already stopped.
    pub fn stop(&mut self) -> Option<StopSummary> {
        let session = match std::mem::take(&mut self.state) {
            SessionState::Recording(session) | SessionState::Paused(session) => session,
            SessionState::Stopped => return None,
        };

        let elapsed = session.elapsed(self.clock.now());
        let Session {
            id,
            mut capture,
            path,
            ..
        } = session;

        let finalize_error = match capture.stop() {
            Ok(()) => None,
            Err(e) => {
                warn!("Finalize failed for {}, file may be corrupt: {:#}", id, e);
                Some(format!("{:#}", e))
            }
        };
        capture.release();
        drop(capture);

        if let Err(e) = SessionMarker::remove(&self.storage.marker_path()) {
            warn!("Failed to remove session marker: {}", e);
        }
        self.notifier.remove();
        self.publish();

        info!("Recording stopped: {} ({}s)", id, elapsed.as_secs());
        Some(StopSummary {
            session_id: id,
            path,
            elapsed_secs: elapsed.as_secs(),
            finalize_error,
        })
    }

    /// Republish status and re-post the notification with a fresh elapsed
    /// time. Does nothing to the notification while stopped.
    pub fn refresh(&self) {
        let status = self.snapshot();
        if status.status != RecordingStatus::Stopped {
            self.notifier
                .post(&Notification::for_session(status.status, &status.elapsed));
        }
        self.publisher.publish_status(status);
    }

    fn begin_capture(&self, config: &CaptureConfig) -> anyhow::Result<Box<dyn CaptureResource>> {
        let mut capture = self.factory.acquire()?;
        let started = capture.prepare(config).and_then(|()| capture.start());
        match started {
            Ok(()) => Ok(capture),
            Err(e) => {
                capture.release();
                Err(e)
            }
        }
    }

    fn after_transition(&self, outcome: &Result<Transition, RecorderError>) {
        if let Ok(Transition::Applied(_)) = outcome {
            self.write_marker();
            self.refresh();
        }
    }

    fn publish(&self) {
        self.publisher.publish_status(self.snapshot());
    }

    fn write_marker(&self) {
        let Some(session) = self.state.session() else {
            return;
        };

        let marker = SessionMarker {
            session_id: session.id,
            pid: std::process::id(),
            path: session.path.clone(),
            started_at: session.started_at,
            status: self.status(),
        };
        if let Err(e) = marker.write(&self.storage.marker_path()) {
            warn!("Failed to write session marker: {:#}", e);
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.stop().is_some() {
            info!("Active session stopped on shutdown");
        }
    }
}
