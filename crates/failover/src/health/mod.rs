//! Endpoint health tracking.
//!
//! - [`HealthRegistry`] holds one [`HealthRecord`] per endpoint and owns the
//!   state machine (`unknown → working → unstable → offline`, any state back
//!   to `working` on success).
//! - [`Prober`] performs a single reachability check; [`HttpProber`] is the
//!   default `HEAD`-based implementation.
//! - [`HealthMonitor`] ties the two together with timeouts, recovery
//!   detection and periodic scheduling.

mod monitor;
mod prober;
mod registry;
mod status;

pub use monitor::{DEFAULT_PROBE_TIMEOUT, DEFAULT_RECOVERY_STALENESS, HealthMonitor, ProbeTarget};
pub use prober::{HttpProber, Prober};
pub use registry::{DEFAULT_OFFLINE_THRESHOLD, HealthRegistry};
pub use status::{HealthRecord, HealthStatus};
