//! Recording session state

use chrono::{DateTime, Duration as ChronoDuration, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::capture::CaptureResource;
use crate::storage::format_mm_ss;

/// The externally observed state of the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecordingStatus {
    #[default]
    Stopped,
    Recording,
    Paused,
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stopped => "Stopped",
            Self::Recording => "Recording",
            Self::Paused => "Paused",
        })
    }
}

/// An active recording session
pub struct Session {
    pub id: Uuid,
    pub capture: Box<dyn CaptureResource>,
    pub path: PathBuf,
    pub started_at: DateTime<Local>,

    /// Recording time from spans that have already ended
    accumulated: Duration,

    /// Start of the running span; `None` while paused
    span_started: Option<DateTime<Local>>,
}

impl Session {
    pub fn new(capture: Box<dyn CaptureResource>, path: PathBuf, now: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4(),
            capture,
            path,
            started_at: now,
            accumulated: Duration::ZERO,
            span_started: Some(now),
        }
    }

    /// Time spent recording, excluding pauses
    pub fn elapsed(&self, now: DateTime<Local>) -> Duration {
        match self.span_started {
            Some(since) => self.accumulated + non_negative(now - since),
            None => self.accumulated,
        }
    }

    /// End the running span (on pause)
    pub(crate) fn close_span(&mut self, now: DateTime<Local>) {
        if let Some(since) = self.span_started.take() {
            self.accumulated += non_negative(now - since);
        }
    }

    /// Begin a new span (on resume)
    pub(crate) fn open_span(&mut self, now: DateTime<Local>) {
        if self.span_started.is_none() {
            self.span_started = Some(now);
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("backend", &self.capture.backend_name())
            .field("path", &self.path)
            .field("started_at", &self.started_at)
            .field("accumulated", &self.accumulated)
            .field("span_started", &self.span_started)
            .finish()
    }
}

fn non_negative(delta: ChronoDuration) -> Duration {
    delta.to_std().unwrap_or(Duration::ZERO)
}

/// Recorder state; a session exists exactly when not stopped
#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    Stopped,
    Recording(Session),
    Paused(Session),
}

impl SessionState {
    pub fn status(&self) -> RecordingStatus {
        match self {
            Self::Stopped => RecordingStatus::Stopped,
            Self::Recording(_) => RecordingStatus::Recording,
            Self::Paused(_) => RecordingStatus::Paused,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Stopped => None,
            Self::Recording(session) | Self::Paused(session) => Some(session),
        }
    }

    /// Published view of this state at `now`
    pub fn to_status(&self, now: DateTime<Local>) -> SessionStatus {
        match self.session() {
            None => SessionStatus::default(),
            Some(session) => {
                let elapsed = session.elapsed(now);
                SessionStatus {
                    status: self.status(),
                    elapsed_secs: elapsed.as_secs(),
                    elapsed: format_mm_ss(elapsed.as_secs()),
                    session_id: Some(session.id),
                    file: Some(session.path.clone()),
                    started_at: Some(session.started_at),
                }
            }
        }
    }
}

/// Snapshot of the session as seen by observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub status: RecordingStatus,
    pub elapsed_secs: u64,

    /// `MM:SS`
    pub elapsed: String,

    pub session_id: Option<Uuid>,
    pub file: Option<PathBuf>,
    pub started_at: Option<DateTime<Local>>,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            status: RecordingStatus::Stopped,
            elapsed_secs: 0,
            elapsed: format_mm_ss(0),
            session_id: None,
            file: None,
            started_at: None,
        }
    }
}

/// What a stop left behind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopSummary {
    pub session_id: Uuid,
    pub path: PathBuf,
    pub elapsed_secs: u64,

    /// Finalize error that was swallowed; the file may be unusable
    pub finalize_error: Option<String>,
}

impl StopSummary {
    pub fn elapsed(&self) -> String {
        format_mm_ss(self.elapsed_secs)
    }
}

/// Result of an entry point that may legitimately do nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The state moved to the given status
    Applied(RecordingStatus),
    /// Not legal from the current status (or unsupported); nothing changed
    Ignored(RecordingStatus),
}

impl Transition {
    pub fn status(&self) -> RecordingStatus {
        match self {
            Self::Applied(status) | Self::Ignored(status) => *status,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}
