//! Stream failover: keep playback pointed at the best working endpoint.
//!
//! A live event is usually offered by several redundant providers. This crate
//! tracks the health of every endpoint, ranks candidates and switches a
//! playback slot over to the next best endpoint when the current one fails.
//!
//! ## Core Types
//!
//! - [`HealthRegistry`] - Per-endpoint health state machine
//! - [`HealthMonitor`] - Active probing, recovery checks and periodic scheduling
//! - [`StreamSelector`] - Ranks candidates by health, language and quality
//! - [`SessionManager`] - View slots with independent failover and background sweeps
//!
//! ## Collaborators
//!
//! Match and stream metadata come from outside through [`CandidateResolver`];
//! the crate never fetches catalogs itself.

pub mod config;
pub mod domain;
pub mod error;
pub mod health;
pub mod http;
pub mod resolver;
pub mod selector;
pub mod session;
mod task;

pub use config::{DEFAULT_MAX_SLOTS, FailoverConfig};
pub use domain::{EndpointId, Match, MatchSource, Stream};
pub use error::{Error, ProbeError, Result};
pub use health::{
    HealthMonitor, HealthRecord, HealthRegistry, HealthStatus, HttpProber, ProbeTarget, Prober,
};
pub use resolver::{CandidateResolver, resolve_candidates};
pub use selector::{RankedStream, SelectionConfig, StreamSelector};
pub use session::{FailoverOutcome, LayoutMode, SessionEvent, SessionManager, SlotView};
