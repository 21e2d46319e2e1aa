//! Instance record - The persisted identity of the slot owner

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::probe::ProcessIdentity;

/// Process identity stored in the marker file.
///
/// Field names are fixed by the wire format and must not change: older and
/// newer versions of an application read each other's markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    /// Operating system process ID. PIDs recycle, so this alone is never
    /// proof of identity.
    pub process_id: i32,
    /// Image name of the process, without path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,
    /// When the owning process started. Supplementary context only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Absolute path to the running binary's main module. The strongest
    /// identity check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_module_file_name: Option<String>,
}

impl InstanceRecord {
    /// Build the record describing a live process, used when claiming the
    /// running slot.
    pub fn for_identity(identity: &ProcessIdentity) -> Self {
        Self {
            process_id: identity.pid as i32,
            process_name: Some(identity.name.clone()),
            start_time: identity.started_at,
            main_module_file_name: identity
                .exe
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        }
    }

    /// Build a record from a bare PID, the pre-structured marker format.
    pub fn legacy(pid: i32) -> Self {
        Self {
            process_id: pid,
            process_name: None,
            start_time: None,
            main_module_file_name: None,
        }
    }

    /// A legacy marker carries no identity fields, so liveness of the PID is
    /// all that can be verified against it.
    pub fn is_legacy(&self) -> bool {
        self.process_name.is_none()
            && self.start_time.is_none()
            && self.main_module_file_name.is_none()
    }
}
