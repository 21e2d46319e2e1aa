//! solo-instance - Ensure only one instance of an application runs at a time
//!
//! A launching process reads a marker file naming the presumed current
//! owner of the "running" slot, cross-references it against the live OS
//! process table (PIDs recycle, so the marker's image name and executable
//! path corroborate the PID), and claims the slot with a
//! check-write-recheck sequence that closes the near-simultaneous-launch
//! race window. No OS-level advisory locking is involved; a crashed owner
//! leaves a stale marker behind and staleness is detected, not prevented.
//!
//! Typical use, first thing in `main`:
//!
//! ```no_run
//! fn main() -> Result<(), solo_instance::Error> {
//!     solo_instance::exit_if_already_running("myapp")?;
//!     // ... this process now owns the running slot
//!     Ok(())
//! }
//! ```
//!
//! Hosts that must not terminate abruptly ask for the verdict instead:
//!
//! ```no_run
//! use solo_instance::{Arbiter, LaunchDecision, LaunchGate};
//!
//! # fn run() -> Result<(), solo_instance::Error> {
//! let mut arbiter = Arbiter::for_app("myapp")?;
//! match arbiter.check()? {
//!     LaunchDecision::Granted => { /* proceed */ }
//!     LaunchDecision::ExitRequested => { /* shut down gracefully */ }
//! }
//! # Ok(())
//! # }
//! ```

mod arbiter;
mod error;
mod probe;
mod record;
mod store;

pub use arbiter::{
    exit_if_already_running, should_launch, Arbiter, LaunchDecision, LaunchGate, SETTLE_DELAY,
};
pub use error::{Error, Result};
pub use probe::{ProcessIdentity, ProcessTable, SystemProcessTable};
pub use record::InstanceRecord;
pub use store::MarkerStore;
