//! Liveness probe
//!
//! In-memory session state dies with its process. When the owner cannot be
//! asked, the probe reconstructs a best-effort status from disk: the session
//! marker first, then the modification time of today's file.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::storage::{SessionMarker, StorageProvider};

use super::RecordingStatus;

/// Which rule produced a probe result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    /// A marker owned by a live process
    Marker,
    /// A marker whose process is gone; it has been removed
    StaleMarker,
    /// No marker, but today's file was written to recently
    RecentWrite,
    NoEvidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Liveness {
    pub status: RecordingStatus,
    pub evidence: Evidence,
    pub marker: Option<SessionMarker>,
}

impl Liveness {
    fn stopped(evidence: Evidence) -> Self {
        Self {
            status: RecordingStatus::Stopped,
            evidence,
            marker: None,
        }
    }
}

/// Guess the session status without asking its owner.
///
/// The recent-write rule is only a heuristic: a file touched within `window`
/// is reported as recording even if nothing is writing to it any more.
pub fn probe_liveness(storage: &StorageProvider, window: Duration) -> Liveness {
    let marker_path = storage.marker_path();

    match SessionMarker::read(&marker_path) {
        Ok(Some(marker)) => {
            if owns_marker(&marker) {
                debug!("Session marker owned by live pid {}", marker.pid);
                return Liveness {
                    status: marker.status,
                    evidence: Evidence::Marker,
                    marker: Some(marker),
                };
            }

            debug!("Removing stale session marker from pid {}", marker.pid);
            if let Err(e) = SessionMarker::remove(&marker_path) {
                warn!("Failed to remove stale session marker: {}", e);
            }
            return Liveness::stopped(Evidence::StaleMarker);
        }
        Ok(None) => {}
        Err(e) => warn!("Ignoring unreadable session marker: {:#}", e),
    }

    let today = storage.resolve_today_file();
    let modified: Option<DateTime<Local>> = std::fs::metadata(&today)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::from);

    match modified {
        Some(modified) if written_within(modified, storage.clock().now(), window) => Liveness {
            status: RecordingStatus::Recording,
            evidence: Evidence::RecentWrite,
            marker: None,
        },
        _ => Liveness::stopped(Evidence::NoEvidence),
    }
}

fn written_within(modified: DateTime<Local>, now: DateTime<Local>, window: Duration) -> bool {
    match (now - modified).to_std() {
        Ok(age) => age < window,
        // Modified "in the future": clock skew, treat as fresh
        Err(_) => true,
    }
}

/// Slack for the one-second resolution of process start times
const START_TIME_SLACK_SECS: i64 = 2;

/// The marker's pid is alive and is not a later process that reused the id
fn owns_marker(marker: &SessionMarker) -> bool {
    if !process_alive(marker.pid) {
        return false;
    }
    match process_started_at(marker.pid) {
        Some(started) => {
            let latest = marker.started_at + chrono::Duration::seconds(START_TIME_SLACK_SECS);
            if started > latest {
                debug!(
                    "pid {} started at {}, after session start {}; id was reused",
                    marker.pid, started, marker.started_at
                );
                return false;
            }
            true
        }
        None => true,
    }
}

/// When the process with this id started, where the platform exposes it
#[cfg(target_os = "linux")]
pub fn process_started_at(pid: u32) -> Option<DateTime<Local>> {
    let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
    // comm may hold spaces or parens; field 3 starts after the last ')'
    let fields = &stat[stat.rfind(')')? + 1..];
    let ticks: i64 = fields.split_whitespace().nth(19)?.parse().ok()?;

    let boot: i64 = std::fs::read_to_string("/proc/stat")
        .ok()?
        .lines()
        .find_map(|line| line.strip_prefix("btime "))?
        .trim()
        .parse()
        .ok()?;

    let hz = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if hz <= 0 {
        return None;
    }
    let millis = boot * 1000 + ticks * 1000 / hz as i64;
    chrono::TimeZone::timestamp_millis_opt(&Local, millis).single()
}

#[cfg(not(target_os = "linux"))]
pub fn process_started_at(_pid: u32) -> Option<DateTime<Local>> {
    None
}

/// Whether a process with this id exists
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub fn process_alive(_pid: u32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn recent_write_window_is_exclusive() {
        let now = Local::now();
        let window = Duration::from_secs(60);
        assert!(written_within(now - ChronoDuration::seconds(59), now, window));
        assert!(!written_within(now - ChronoDuration::seconds(60), now, window));
        assert!(written_within(now + ChronoDuration::seconds(5), now, window));
    }

    #[test]
    fn own_process_is_alive() {
        assert!(process_alive(std::process::id()));
        assert!(!process_alive(0));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn own_start_time_is_in_the_past() {
        let started = process_started_at(std::process::id()).expect("procfs is readable");
        assert!(started <= Local::now() + ChronoDuration::seconds(1));
        assert!(process_started_at(u32::MAX).is_none());
    }
}
