use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reachability classification of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Last probe or playback report succeeded.
    Working,
    /// Recently failed, not yet considered down.
    Unstable,
    /// Never observed.
    #[default]
    Unknown,
    /// Failed repeatedly.
    Offline,
}

impl HealthStatus {
    /// Ranking priority used by the selector (lower is better).
    pub fn priority(self) -> u8 {
        match self {
            HealthStatus::Working => 0,
            HealthStatus::Unstable => 1,
            HealthStatus::Unknown => 2,
            HealthStatus::Offline => 3,
        }
    }

    /// Whether the endpoint has been seen failing since it last worked.
    pub fn is_failing(self) -> bool {
        matches!(self, HealthStatus::Unstable | HealthStatus::Offline)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Working => "working",
            HealthStatus::Unstable => "unstable",
            HealthStatus::Unknown => "unknown",
            HealthStatus::Offline => "offline",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health bookkeeping for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HealthRecord {
    pub status: HealthStatus,
    /// Time of the last report of any kind.
    pub last_checked: Option<DateTime<Utc>>,
    /// Time of the last report that marked the endpoint working.
    pub last_working: Option<DateTime<Utc>>,
    /// Consecutive non-working reports since the last working one.
    pub error_count: u32,
}

impl HealthRecord {
    /// Apply one observation made at `at`.
    pub(crate) fn apply(&mut self, status: HealthStatus, is_working: bool, at: DateTime<Utc>) {
        self.status = status;
        self.last_checked = Some(at);
        if is_working {
            self.last_working = Some(at);
            self.error_count = 0;
        } else {
            self.error_count = self.error_count.saturating_add(1);
        }
    }

    /// Whether the endpoint ever reported working.
    pub fn has_worked(&self) -> bool {
        self.last_working.is_some()
    }
}
