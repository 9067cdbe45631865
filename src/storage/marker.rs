//! Persisted session marker
//!
//! A small JSON record written beside the recordings when a session starts,
//! rewritten on pause/resume and removed on stop. It lets a restarted
//! process tell a live session from a leftover file.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::recorder::RecordingStatus;
use crate::{Result, TracerError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMarker {
    pub session_id: Uuid,

    /// Process that owns the session
    pub pid: u32,

    /// File being written
    pub path: PathBuf,

    pub started_at: DateTime<Local>,

    /// Status as of the last transition
    pub status: RecordingStatus,
}

impl SessionMarker {
    /// Write the marker atomically (temp file + rename)
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|source| TracerError::Marker {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, path).map_err(|source| TracerError::Marker {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Read the marker, `None` if there is none
    pub fn read(path: &Path) -> Result<Option<Self>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(TracerError::Marker {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let marker = serde_json::from_slice(&bytes)?;
        Ok(Some(marker))
    }

    /// Remove the marker; a missing marker is not an error
    pub fn remove(path: &Path) -> io::Result<()> {
        match std::fs::remove_file(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".session.json");
        let marker = SessionMarker {
            session_id: Uuid::new_v4(),
            pid: 42,
            path: dir.path().join("2024-01-01.m4a"),
            started_at: Local::now(),
            status: RecordingStatus::Paused,
        };

        marker.write(&path).unwrap();
        assert_eq!(SessionMarker::read(&path).unwrap(), Some(marker));

        SessionMarker::remove(&path).unwrap();
        assert_eq!(SessionMarker::read(&path).unwrap(), None);
        SessionMarker::remove(&path).unwrap();
    }

    #[test]
    fn corrupt_marker_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".session.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            SessionMarker::read(&path),
            Err(TracerError::Json(_))
        ));
    }
}
