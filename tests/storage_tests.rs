use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tempfile::TempDir;
use uuid::Uuid;

use audiotracer::clock::{ManualClock, SystemClock};
use audiotracer::recorder::{probe_liveness, Evidence, RecordingStatus};
use audiotracer::storage::{SessionMarker, StorageProvider};

const WINDOW: Duration = Duration::from_secs(60);

/// Well above any default pid_max, so no process can own it
const DEAD_PID: u32 = i32::MAX as u32;

fn provider(dir: &TempDir) -> StorageProvider {
    StorageProvider::new(dir.path(), 128_000, Arc::new(SystemClock))
}

fn marker(storage: &StorageProvider, pid: u32, status: RecordingStatus) -> SessionMarker {
    SessionMarker {
        session_id: Uuid::new_v4(),
        pid,
        path: storage.resolve_today_file(),
        started_at: Local::now(),
        status,
    }
}

#[test]
fn same_date_resolves_to_same_file() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).unwrap();
    let storage = StorageProvider::new(dir.path(), 128_000, Arc::new(clock.clone()));

    let morning = storage.resolve_today_file();
    clock.advance_secs(12 * 60 * 60);
    assert_eq!(storage.resolve_today_file(), morning);
    assert_eq!(morning, dir.path().join("2024-01-01.m4a"));

    clock.advance_secs(12 * 60 * 60);
    let next_day = storage.resolve_today_file();
    assert_ne!(next_day, morning);
    assert_eq!(next_day, dir.path().join("2024-01-02.m4a"));
}

#[test]
fn listing_is_newest_first_and_audio_only() {
    let dir = TempDir::new().unwrap();
    let storage = provider(&dir);

    let older = dir.path().join("2024-01-01.m4a");
    let newer = dir.path().join("2024-01-02.m4a");
    std::fs::write(&older, b"old").unwrap();
    std::fs::write(&newer, b"newer").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"skip").unwrap();
    std::fs::create_dir(dir.path().join("folder.m4a")).unwrap();

    let past = std::time::SystemTime::now() - Duration::from_secs(3600);
    std::fs::File::options()
        .write(true)
        .open(&older)
        .unwrap()
        .set_modified(past)
        .unwrap();

    let listed = storage.list_recordings();
    let names: Vec<String> = listed.iter().map(|r| r.file_name()).collect();
    assert_eq!(names, ["2024-01-02.m4a", "2024-01-01.m4a"]);
    assert_eq!(listed[0].size_bytes, 5);
}

#[test]
fn missing_directory_lists_nothing() {
    let dir = TempDir::new().unwrap();
    let storage = StorageProvider::new(
        dir.path().join("not-yet"),
        128_000,
        Arc::new(SystemClock),
    );

    assert!(storage.list_recordings().is_empty());
    storage.ensure_dir().unwrap();
    assert!(storage.audio_dir().is_dir());
}

#[test]
fn snapshot_reports_free_space_of_missing_directory() {
    let dir = TempDir::new().unwrap();
    let storage = StorageProvider::new(
        dir.path().join("a/b/c"),
        128_000,
        Arc::new(SystemClock),
    );

    let snapshot = storage.snapshot();
    assert!(snapshot.free_bytes > 0);
    assert!(snapshot.time_remaining.contains(':'));
}

#[test]
fn probe_trusts_marker_of_live_process() {
    let dir = TempDir::new().unwrap();
    let storage = provider(&dir);
    marker(&storage, std::process::id(), RecordingStatus::Paused)
        .write(&storage.marker_path())
        .unwrap();

    let liveness = probe_liveness(&storage, WINDOW);
    assert_eq!(liveness.status, RecordingStatus::Paused);
    assert_eq!(liveness.evidence, Evidence::Marker);
    assert!(storage.marker_path().exists());
}

#[test]
fn probe_clears_stale_marker() {
    let dir = TempDir::new().unwrap();
    let storage = provider(&dir);
    marker(&storage, DEAD_PID, RecordingStatus::Recording)
        .write(&storage.marker_path())
        .unwrap();
    // A fresh daily file does not override the stale marker
    std::fs::write(storage.resolve_today_file(), b"aac").unwrap();

    let liveness = probe_liveness(&storage, WINDOW);
    assert_eq!(liveness.status, RecordingStatus::Stopped);
    assert_eq!(liveness.evidence, Evidence::StaleMarker);
    assert!(!storage.marker_path().exists());
}

#[cfg(target_os = "linux")]
#[test]
fn reused_pid_makes_marker_stale() {
    let dir = TempDir::new().unwrap();
    let storage = provider(&dir);

    // Alive, but started long after the session the marker describes
    let mut newcomer = std::process::Command::new("sleep").arg("30").spawn().unwrap();
    let mut stale = marker(&storage, newcomer.id(), RecordingStatus::Recording);
    stale.started_at = Local::now() - chrono::Duration::hours(1);
    stale.write(&storage.marker_path()).unwrap();

    let liveness = probe_liveness(&storage, WINDOW);
    newcomer.kill().unwrap();
    newcomer.wait().unwrap();

    assert_eq!(liveness.status, RecordingStatus::Stopped);
    assert_eq!(liveness.evidence, Evidence::StaleMarker);
    assert!(!storage.marker_path().exists());
}

#[test]
fn probe_falls_back_to_recent_write() {
    let dir = TempDir::new().unwrap();
    let storage = provider(&dir);
    std::fs::write(storage.resolve_today_file(), b"aac").unwrap();

    let liveness = probe_liveness(&storage, WINDOW);
    assert_eq!(liveness.status, RecordingStatus::Recording);
    assert_eq!(liveness.evidence, Evidence::RecentWrite);

    let liveness = probe_liveness(&storage, Duration::ZERO);
    assert_eq!(liveness.status, RecordingStatus::Stopped);
}

#[test]
fn probe_without_evidence_reports_stopped() {
    let dir = TempDir::new().unwrap();
    let storage = provider(&dir);

    let liveness = probe_liveness(&storage, WINDOW);
    assert_eq!(liveness.status, RecordingStatus::Stopped);
    assert_eq!(liveness.evidence, Evidence::NoEvidence);
}

#[test]
fn probe_ignores_unreadable_marker() {
    let dir = TempDir::new().unwrap();
    let storage = provider(&dir);
    std::fs::write(storage.marker_path(), b"{ not json").unwrap();

    let liveness = probe_liveness(&storage, WINDOW);
    assert_eq!(liveness.evidence, Evidence::NoEvidence);
}
