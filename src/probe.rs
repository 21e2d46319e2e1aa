//! Process table probing - Liveness and identity lookups via sysinfo

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::trace;

/// Identity details of a live process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    /// Operating system process ID
    pub pid: u32,
    /// Image name, without path
    pub name: String,
    /// Absolute path to the main executable. `None` when the platform or
    /// sandbox denies access to another process's module information.
    pub exe: Option<PathBuf>,
    /// Process start time, when the platform reports one
    pub started_at: Option<DateTime<Utc>>,
}

/// Read access to the live process table.
///
/// This is the seam between the arbiter and the operating system: production
/// code uses [`SystemProcessTable`], tests drive the arbiter with an
/// in-memory implementation.
pub trait ProcessTable {
    /// Resync with the operating system's process table.
    fn refresh(&mut self);

    /// Look up a live process by PID. Returns `None` when no such process
    /// exists (never an error; a vanished process is an answer, not a
    /// failure).
    fn find(&self, pid: u32) -> Option<ProcessIdentity>;

    /// The calling process's own identity.
    fn current(&self) -> ProcessIdentity;
}

/// Process table backed by [`sysinfo`].
pub struct SystemProcessTable {
    system: System,
}

impl SystemProcessTable {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::everything(),
        );
        Self { system }
    }
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SystemProcessTable {
    fn refresh(&mut self) {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::everything(),
        );
        trace!("Process table refreshed");
    }

    fn find(&self, pid: u32) -> Option<ProcessIdentity> {
        let process = self.system.process(Pid::from_u32(pid))?;
        Some(ProcessIdentity {
            pid,
            name: process.name().to_string_lossy().into_owned(),
            exe: process.exe().map(|p| p.to_path_buf()),
            started_at: DateTime::from_timestamp(process.start_time() as i64, 0),
        })
    }

    fn current(&self) -> ProcessIdentity {
        let pid = std::process::id();
        if let Some(identity) = self.find(pid) {
            return identity;
        }

        // Sandboxes can hide even our own process table entry. Fall back to
        // what the standard library knows about this process.
        let exe = std::env::current_exe().ok();
        let name = exe
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        ProcessIdentity {
            pid,
            name,
            exe,
            started_at: None,
        }
    }
}
