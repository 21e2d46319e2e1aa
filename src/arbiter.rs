//! Instance arbiter - The detection and claim protocol

use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::probe::{ProcessTable, SystemProcessTable};
use crate::record::InstanceRecord;
use crate::store::MarkerStore;

/// Delay between the first ownership check and the post-claim recheck,
/// giving a racing peer's marker write time to become visible.
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// The arbiter's verdict on a launch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchDecision {
    /// This process now owns the running slot and should proceed.
    Granted,
    /// A conflicting instance owns the slot; this process should exit.
    ExitRequested,
}

/// The ownership-check and launch-decision capability.
///
/// [`Arbiter`] is the standard implementation; hosts that need different
/// behavior (or tests) inject their own.
pub trait LaunchGate {
    /// Whether a conflicting live instance currently owns the slot.
    fn is_already_running(&mut self) -> bool;

    /// Run the full claim protocol. On the path to a `true` verdict this
    /// writes a marker record for the current process.
    fn should_launch(&mut self) -> Result<bool>;

    /// The interceptable form of the verdict.
    fn check(&mut self) -> Result<LaunchDecision> {
        Ok(if self.should_launch()? {
            LaunchDecision::Granted
        } else {
            LaunchDecision::ExitRequested
        })
    }
}

/// Decides whether this launch may proceed.
///
/// The protocol is check, claim, settle, recheck: a first
/// [`is_already_running`](LaunchGate::is_already_running) pass, a marker
/// write claiming the slot, a blocking settle sleep, and a second pass to
/// catch a peer that raced the first one. Two processes that overwrite each
/// other's markers within the same instant can still both proceed; the
/// design accepts that best-effort outcome rather than reach for OS-level
/// mutual exclusion.
pub struct Arbiter<P = SystemProcessTable> {
    store: MarkerStore,
    table: P,
    settle_delay: Duration,
}

impl Arbiter<SystemProcessTable> {
    /// Create an arbiter over the given marker store and the live OS
    /// process table.
    pub fn new(store: MarkerStore) -> Self {
        Self::with_table(store, SystemProcessTable::new())
    }

    /// Create an arbiter at the conventional marker location for `app_name`.
    pub fn for_app(app_name: &str) -> Result<Self> {
        Ok(Self::new(MarkerStore::for_app(app_name)?))
    }
}

impl<P: ProcessTable> Arbiter<P> {
    /// Create an arbiter over a specific process table implementation.
    pub fn with_table(store: MarkerStore, table: P) -> Self {
        Self {
            store,
            table,
            settle_delay: SETTLE_DELAY,
        }
    }

    /// Override the settle delay. Tests shorten it; production code has no
    /// reason to.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// The marker file path this arbiter checks.
    pub fn marker_path(&self) -> &Path {
        self.store.path()
    }

    /// Exit the process (status 0) if a conflicting instance is already
    /// running; otherwise return normally with the slot claimed.
    ///
    /// Hosts that must not terminate abruptly should call
    /// [`check`](LaunchGate::check) instead and handle
    /// [`LaunchDecision::ExitRequested`] themselves.
    pub fn exit_if_already_running(&mut self) -> Result<()> {
        if self.check()? == LaunchDecision::ExitRequested {
            info!("Another instance is already running, exiting");
            std::process::exit(0);
        }
        Ok(())
    }

    fn evaluate(&mut self) -> bool {
        let Some(record) = self.store.read() else {
            return false;
        };

        self.table.refresh();
        let me = self.table.current();

        // Our own marker, from an earlier phase of this invocation or a
        // previous run of this same process.
        if record.process_id == me.pid as i32 {
            debug!("Marker belongs to this process (PID {})", me.pid);
            return false;
        }

        let Ok(pid) = u32::try_from(record.process_id) else {
            debug!("Marker PID {} is not a valid OS PID", record.process_id);
            return false;
        };

        if record.is_legacy() {
            // Bare-PID marker: liveness is all that can be checked. Weaker
            // identity verification is the accepted compatibility trade-off.
            let running = self.table.find(pid).is_some();
            if running {
                info!("Legacy marker PID {} is alive, treating as running", pid);
            }
            return running;
        }

        let Some(live) = self.table.find(pid) else {
            debug!("Marker PID {} is not in the process table", pid);
            return false;
        };

        match &live.exe {
            Some(exe) => {
                let name_matches = record.process_name.as_deref() == Some(live.name.as_str());
                let path_matches = record
                    .main_module_file_name
                    .as_deref()
                    .is_some_and(|recorded| paths_match(exe, recorded));
                if name_matches && path_matches {
                    info!("Instance PID {} ({}) is already running", pid, live.name);
                    true
                } else {
                    // The PID was recycled by an unrelated process.
                    debug!(
                        "PID {} is alive but identity differs ({:?} vs {:?})",
                        pid, live.name, record.process_name
                    );
                    false
                }
            }
            None => {
                // Module info is inaccessible, so full verification is
                // impossible. A name match is treated as running: better to
                // refuse a launch than to allow a duplicate instance.
                let name_matches = record.process_name.as_deref() == Some(live.name.as_str());
                if name_matches {
                    warn!(
                        "Cannot read module info for PID {}, assuming instance is running",
                        pid
                    );
                }
                name_matches
            }
        }
    }

    fn claim(&mut self) -> Result<()> {
        self.table.refresh();
        let me = self.table.current();
        self.store.write(&InstanceRecord::for_identity(&me))
    }
}

impl<P: ProcessTable> LaunchGate for Arbiter<P> {
    fn is_already_running(&mut self) -> bool {
        self.evaluate()
    }

    fn should_launch(&mut self) -> Result<bool> {
        if self.is_already_running() {
            return Ok(false);
        }

        // No conflicting owner seen: claim the slot, then wait out the race
        // window in case another instance was starting at the same moment
        // and recheck.
        self.claim()?;
        thread::sleep(self.settle_delay);
        Ok(!self.is_already_running())
    }
}

/// Main-module paths compare case-insensitively; image names do not.
fn paths_match(live: &Path, recorded: &str) -> bool {
    live.to_string_lossy().eq_ignore_ascii_case(recorded)
}

/// Convenience wrapper over [`Arbiter::for_app`] and
/// [`LaunchGate::should_launch`].
pub fn should_launch(app_name: &str) -> Result<bool> {
    let mut arbiter = Arbiter::for_app(app_name)?;
    arbiter.should_launch()
}

/// Convenience wrapper over [`Arbiter::for_app`] and
/// [`Arbiter::exit_if_already_running`].
pub fn exit_if_already_running(app_name: &str) -> Result<()> {
    let mut arbiter = Arbiter::for_app(app_name)?;
    arbiter.exit_if_already_running()
}
