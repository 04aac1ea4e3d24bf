//! In-memory health registry.
//!
//! The registry is the single owner of [`HealthRecord`]s. Records are created
//! lazily on first write, mutated only through [`HealthRegistry::report`] (or
//! the degrade policy built on top of it) and never removed.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

use super::status::{HealthRecord, HealthStatus};
use crate::domain::EndpointId;

/// Consecutive failures (including the current one) after which a
/// non-working endpoint is declared offline.
pub const DEFAULT_OFFLINE_THRESHOLD: u32 = 2;

/// Per-endpoint health state shared by every slot of a session.
#[derive(Debug)]
pub struct HealthRegistry {
    records: DashMap<EndpointId, HealthRecord>,
    offline_threshold: u32,
}

impl HealthRegistry {
    /// Create an empty registry with the default offline threshold.
    pub fn new() -> Self {
        Self::with_offline_threshold(DEFAULT_OFFLINE_THRESHOLD)
    }

    /// Create an empty registry with a custom offline threshold.
    pub fn with_offline_threshold(offline_threshold: u32) -> Self {
        Self {
            records: DashMap::new(),
            offline_threshold: offline_threshold.max(1),
        }
    }

    /// Current record for `id`; the default unknown record if never seen.
    pub fn status(&self, id: &EndpointId) -> HealthRecord {
        self.records
            .get(id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Unconditionally record an observation made now.
    pub fn report(&self, id: &EndpointId, status: HealthStatus, is_working: bool) {
        self.report_at(id, status, is_working, Utc::now());
    }

    /// Unconditionally record an observation made at `at`.
    pub fn report_at(
        &self,
        id: &EndpointId,
        status: HealthStatus,
        is_working: bool,
        at: DateTime<Utc>,
    ) {
        let mut entry = self.records.entry(id.clone()).or_default();
        let previous = entry.status;
        entry.apply(status, is_working, at);

        if previous != status {
            debug!(
                endpoint = %id,
                from = %previous,
                to = %status,
                error_count = entry.error_count,
                "Endpoint health changed"
            );
        }
    }

    /// Record a failed probe or playback attempt and return the new status.
    ///
    /// A working endpoint is only downgraded to unstable; otherwise it goes
    /// offline once the consecutive failure count reaches the threshold.
    pub fn record_failure(&self, id: &EndpointId) -> HealthStatus {
        self.record_failure_at(id, Utc::now())
    }

    pub(crate) fn record_failure_at(&self, id: &EndpointId, at: DateTime<Utc>) -> HealthStatus {
        // Hold the entry guard across read and write so concurrent failures
        // for the same endpoint are counted one after another.
        let mut entry = self.records.entry(id.clone()).or_default();
        let previous = entry.status;
        let next = degraded_status(&entry, self.offline_threshold);
        entry.apply(next, false, at);

        if next == HealthStatus::Offline && previous != HealthStatus::Offline {
            info!(
                endpoint = %id,
                failures = entry.error_count,
                "Endpoint marked offline"
            );
        } else {
            debug!(
                endpoint = %id,
                status = %next,
                failures = entry.error_count,
                "Endpoint failure recorded"
            );
        }

        next
    }

    /// Number of endpoints with a record.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy of every record, sorted by endpoint id.
    pub fn snapshot(&self) -> Vec<(EndpointId, HealthRecord)> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        records.sort_by(|a, b| a.0.cmp(&b.0));
        records
    }

    pub fn offline_threshold(&self) -> u32 {
        self.offline_threshold
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Status an endpoint moves to after one more failure.
fn degraded_status(record: &HealthRecord, offline_threshold: u32) -> HealthStatus {
    if record.status == HealthStatus::Working {
        return HealthStatus::Unstable;
    }
    if record.error_count.saturating_add(1) >= offline_threshold {
        HealthStatus::Offline
    } else {
        HealthStatus::Unstable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(value: &str) -> EndpointId {
        EndpointId::from(value)
    }

    #[test]
    fn test_unseen_endpoint_is_unknown() {
        let registry = HealthRegistry::new();
        let record = registry.status(&id("a"));
        assert_eq!(record, HealthRecord::default());
        // Reading does not create a record.
        assert!(registry.is_empty());
    }

    #[test]
    fn test_report_working() {
        let registry = HealthRegistry::new();
        registry.report(&id("a"), HealthStatus::Working, true);

        let record = registry.status(&id("a"));
        assert_eq!(record.status, HealthStatus::Working);
        assert_eq!(record.error_count, 0);
        assert!(record.last_working.is_some());
        assert_eq!(record.last_checked, record.last_working);
    }

    #[test]
    fn test_report_non_working_keeps_last_working() {
        let registry = HealthRegistry::new();
        registry.report(&id("a"), HealthStatus::Working, true);
        let worked_at = registry.status(&id("a")).last_working;

        registry.report(&id("a"), HealthStatus::Offline, false);
        let record = registry.status(&id("a"));
        assert_eq!(record.status, HealthStatus::Offline);
        assert_eq!(record.error_count, 1);
        assert_eq!(record.last_working, worked_at);
    }

    #[test]
    fn test_three_failures_from_unknown() {
        let registry = HealthRegistry::new();
        let a = id("a");

        let sequence: Vec<_> = (0..3).map(|_| registry.record_failure(&a)).collect();
        assert_eq!(
            sequence,
            vec![
                HealthStatus::Unstable,
                HealthStatus::Offline,
                HealthStatus::Offline
            ]
        );
        assert_eq!(registry.status(&a).error_count, 3);
    }

    #[test]
    fn test_working_endpoint_only_degrades_to_unstable() {
        let registry = HealthRegistry::new();
        let a = id("a");
        registry.report(&a, HealthStatus::Working, true);

        assert_eq!(registry.record_failure(&a), HealthStatus::Unstable);
        assert_eq!(registry.record_failure(&a), HealthStatus::Offline);
    }

    #[test]
    fn test_success_recovers_offline() {
        let registry = HealthRegistry::new();
        let a = id("a");
        registry.record_failure(&a);
        registry.record_failure(&a);
        assert_eq!(registry.status(&a).status, HealthStatus::Offline);

        registry.report(&a, HealthStatus::Working, true);
        let record = registry.status(&a);
        assert_eq!(record.status, HealthStatus::Working);
        assert_eq!(record.error_count, 0);
    }

    #[test]
    fn test_custom_threshold() {
        let registry = HealthRegistry::with_offline_threshold(3);
        let a = id("a");
        assert_eq!(registry.record_failure(&a), HealthStatus::Unstable);
        assert_eq!(registry.record_failure(&a), HealthStatus::Unstable);
        assert_eq!(registry.record_failure(&a), HealthStatus::Offline);
    }

    #[test]
    fn test_one_record_per_endpoint() {
        let registry = HealthRegistry::new();
        registry.report(&id("a"), HealthStatus::Working, true);
        registry.report(&id("a"), HealthStatus::Unstable, false);
        registry.report(&id("b"), HealthStatus::Unknown, false);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].0, id("a"));
        assert_eq!(snapshot[1].0, id("b"));
    }

    #[derive(Debug, Clone)]
    enum Observation {
        Report(HealthStatus, bool),
        Failure,
    }

    fn observation() -> impl Strategy<Value = Observation> {
        let status = prop_oneof![
            Just(HealthStatus::Working),
            Just(HealthStatus::Unstable),
            Just(HealthStatus::Unknown),
            Just(HealthStatus::Offline),
        ];
        prop_oneof![
            (status, any::<bool>()).prop_map(|(s, w)| Observation::Report(s, w)),
            Just(Observation::Failure),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_error_count_resets_on_working_and_counts_otherwise(
            observations in prop::collection::vec(observation(), 1..40),
        ) {
            let registry = HealthRegistry::new();
            let a = id("a");

            for observation in observations {
                let before = registry.status(&a).error_count;
                let working = match observation {
                    Observation::Report(status, is_working) => {
                        registry.report(&a, status, is_working);
                        is_working
                    }
                    Observation::Failure => {
                        registry.record_failure(&a);
                        false
                    }
                };
                let after = registry.status(&a).error_count;

                if working {
                    prop_assert_eq!(after, 0);
                } else {
                    prop_assert_eq!(after, before + 1);
                }
            }
        }
    }
}
