//! Marker store - Durable single-slot storage for the instance record

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::record::InstanceRecord;

/// Single-slot storage for one [`InstanceRecord`] at a well-known path.
///
/// No locking guards concurrent readers and writers from different
/// processes; single-instance correctness comes from the arbiter's protocol,
/// not from atomicity here.
pub struct MarkerStore {
    path: PathBuf,
}

impl MarkerStore {
    /// Create a store over an explicit marker path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store at the conventional location for an application:
    /// `<data_dir>/<app_name>/.<app_name>.pid`.
    pub fn for_app(app_name: &str) -> Result<Self> {
        let data_dir = dirs::data_dir().ok_or(Error::NoDataDir)?.join(app_name);
        Ok(Self::new(data_dir.join(format!(".{app_name}.pid"))))
    }

    /// The marker file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current record, or `None` when no usable record exists.
    ///
    /// Missing directory, missing file, empty file, and unparseable content
    /// all read as absent. A corrupted marker must never block application
    /// startup, so parse failures are logged and swallowed.
    pub fn read(&self) -> Option<InstanceRecord> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No marker file at {:?}", self.path);
                return None;
            }
            Err(e) => {
                warn!("Failed to read marker file {:?}: {}", self.path, e);
                return None;
            }
        };

        let trimmed = contents.trim();
        if trimmed.is_empty() {
            debug!("Marker file {:?} is empty", self.path);
            return None;
        }

        match serde_json::from_str::<InstanceRecord>(trimmed) {
            Ok(record) => Some(record),
            Err(_) => {
                // Fallback for markers written by older versions that stored
                // only the bare PID.
                if let Ok(pid) = trimmed.parse::<i32>() {
                    debug!("Marker file {:?} holds a legacy bare PID", self.path);
                    return Some(InstanceRecord::legacy(pid));
                }
                warn!("Marker file {:?} is unparseable, treating as absent", self.path);
                None
            }
        }
    }

    /// Overwrite the marker with `record`.
    ///
    /// Write failures are fatal to the caller: a claim that was not durably
    /// recorded cannot be trusted.
    pub fn write(&self, record: &InstanceRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| Error::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string(record)?;

        // Write-then-rename so a concurrent reader sees either the previous
        // record or this one, never a torn write.
        let tmp = self.path.with_extension("pid.tmp");
        fs::write(&tmp, json).map_err(|source| Error::WriteMarker {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| Error::WriteMarker {
            path: self.path.clone(),
            source,
        })?;

        info!(
            "Wrote instance marker for PID {} to {:?}",
            record.process_id, self.path
        );
        Ok(())
    }

    /// Remove the marker file if present. Not part of the standard protocol;
    /// exit leaves a stale marker behind on purpose and staleness is
    /// detected, not prevented.
    pub fn delete(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Removed instance marker {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(Error::RemoveMarker {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
