//! Recordings directory, daily file paths and free space

use chrono::{DateTime, Local, NaiveDate};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capture::OutputFormat;
use crate::clock::{Clock, SystemClock};
use crate::config::Settings;

use super::models::{RecordingFile, StorageSnapshot, AUDIO_EXTENSIONS};

/// File name of the session marker kept beside the recordings
pub const MARKER_FILE_NAME: &str = ".session.json";

/// Extension of every daily recording
pub const RECORDING_EXTENSION: &str = OutputFormat::Mpeg4.extension();

/// Resolves where recordings live and how much room is left
#[derive(Clone)]
pub struct StorageProvider {
    dir: PathBuf,
    bitrate: u32,
    clock: Arc<dyn Clock>,
}

impl StorageProvider {
    pub fn new(dir: impl Into<PathBuf>, bitrate: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            bitrate,
            clock,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: &Settings, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            settings.recordings_dir(),
            settings.audio.bitrate,
            clock,
        )
    }

    pub fn audio_dir(&self) -> &Path {
        &self.dir
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Create the recordings directory if it does not exist
    pub fn ensure_dir(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    /// `{dir}/{YYYY-MM-DD}.m4a`
    pub fn file_for_date(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}.{}", date.format("%Y-%m-%d"), RECORDING_EXTENSION))
    }

    /// Today's recording file
    pub fn resolve_today_file(&self) -> PathBuf {
        self.file_for_date(self.clock.today())
    }

    pub fn marker_path(&self) -> PathBuf {
        self.dir.join(MARKER_FILE_NAME)
    }

    /// Free bytes on the volume holding the recordings; 0 when unknown
    pub fn available_space(&self) -> u64 {
        let probe = nearest_existing(&self.dir);
        match available_bytes(&probe) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Could not read free space under {}: {}", probe.display(), e);
                0
            }
        }
    }

    pub fn snapshot(&self) -> StorageSnapshot {
        StorageSnapshot::new(self.available_space(), self.bitrate)
    }

    /// Audio files in the recordings directory, newest first
    pub fn list_recordings(&self) -> Vec<RecordingFile> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("Could not list {}: {}", self.dir.display(), e);
                }
                return Vec::new();
            }
        };

        let mut files: Vec<RecordingFile> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| has_audio_extension(&entry.path()))
            .filter_map(|entry| {
                let metadata = entry.metadata().ok()?;
                if !metadata.is_file() {
                    return None;
                }
                let modified: DateTime<Local> = metadata.modified().ok()?.into();
                Some(RecordingFile {
                    path: entry.path(),
                    size_bytes: metadata.len(),
                    modified,
                })
            })
            .collect();

        files.sort_by(|a, b| b.modified.cmp(&a.modified));
        files
    }
}

impl fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageProvider")
            .field("dir", &self.dir)
            .field("bitrate", &self.bitrate)
            .finish()
    }
}

fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

// statvfs needs a path that exists; walk up until one does.
fn nearest_existing(path: &Path) -> PathBuf {
    let mut current = path;
    loop {
        if current.exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => current = parent,
            _ => return PathBuf::from("."),
        }
    }
}

#[cfg(unix)]
fn available_bytes(path: &Path) -> io::Result<u64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains null byte"))?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(stat.f_bavail as u64 * stat.f_frsize as u64)
}

#[cfg(not(unix))]
fn available_bytes(_path: &Path) -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "free space query not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn provider(dir: &Path) -> (StorageProvider, ManualClock) {
        let clock = ManualClock::at_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).unwrap();
        let provider = StorageProvider::new(dir, 128_000, Arc::new(clock.clone()));
        (provider, clock)
    }

    #[test]
    fn today_file_is_named_after_the_date() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _) = provider(dir.path());
        assert_eq!(provider.resolve_today_file(), dir.path().join("2024-01-01.m4a"));
    }

    #[test]
    fn daily_file_is_always_listed() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _) = provider(dir.path());
        let today = provider.resolve_today_file();
        assert!(has_audio_extension(&today));

        std::fs::write(&today, b"aac").unwrap();
        assert_eq!(provider.list_recordings()[0].path, today);
    }

    #[test]
    fn nearest_existing_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("a").join("b");
        assert_eq!(nearest_existing(&missing), dir.path());
    }

    #[test]
    fn recognises_audio_extensions_case_insensitively() {
        assert!(has_audio_extension(Path::new("x.M4A")));
        assert!(has_audio_extension(Path::new("x.wav")));
        assert!(!has_audio_extension(Path::new("x.txt")));
        assert!(!has_audio_extension(Path::new(".session.json")));
    }

    #[test]
    fn free_space_of_missing_dir_uses_parent_volume() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _) = provider(&dir.path().join("not-yet-created"));
        assert!(provider.available_space() > 0);
    }
}
