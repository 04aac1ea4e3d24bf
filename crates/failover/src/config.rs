//! Session and health configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::health::DEFAULT_OFFLINE_THRESHOLD;
use crate::selector::SelectionConfig;
use crate::{Error, Result};

/// Default maximum number of view slots in a session.
pub const DEFAULT_MAX_SLOTS: usize = 4;

/// Tunables for a failover session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailoverConfig {
    /// Maximum number of concurrent view slots.
    pub max_slots: usize,
    /// Interval of the sweep probing every endpoint of every slot.
    pub probe_interval_secs: u64,
    /// Interval of the sweep re-probing offline endpoints.
    pub recovery_interval_secs: u64,
    /// Cap on a single probe.
    pub probe_timeout_secs: u64,
    /// Minimum time without a working report for a success to count as recovery.
    pub recovery_staleness_secs: u64,
    /// Consecutive failures after which an endpoint goes offline.
    pub offline_threshold: u32,
    /// Ranking preferences.
    pub selection: SelectionConfig,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            max_slots: DEFAULT_MAX_SLOTS,
            probe_interval_secs: 30,
            recovery_interval_secs: 60,
            probe_timeout_secs: 5,
            recovery_staleness_secs: 60,
            offline_threshold: DEFAULT_OFFLINE_THRESHOLD,
            selection: SelectionConfig::default(),
        }
    }
}

impl FailoverConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn recovery_interval(&self) -> Duration {
        Duration::from_secs(self.recovery_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn recovery_staleness(&self) -> Duration {
        Duration::from_secs(self.recovery_staleness_secs)
    }

    /// Reject values that would make a session unusable.
    pub fn validate(&self) -> Result<()> {
        if self.max_slots == 0 {
            return Err(Error::config("max_slots must be at least 1"));
        }
        if self.probe_interval_secs == 0 {
            return Err(Error::config("probe_interval_secs must be greater than 0"));
        }
        if self.recovery_interval_secs == 0 {
            return Err(Error::config(
                "recovery_interval_secs must be greater than 0",
            ));
        }
        if self.probe_timeout_secs == 0 {
            return Err(Error::config("probe_timeout_secs must be greater than 0"));
        }
        if self.offline_threshold == 0 {
            return Err(Error::config("offline_threshold must be at least 1"));
        }
        Ok(())
    }
}
