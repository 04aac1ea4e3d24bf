//! Active health probing on top of the registry.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashSet;
use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::prober::Prober;
use super::registry::HealthRegistry;
use super::status::HealthStatus;
use crate::domain::{EndpointId, Stream};
use crate::error::ProbeError;
use crate::task::spawn_interval;

/// Default cap on a single probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long an endpoint must have gone without a working report for a
/// successful probe to count as a recovery.
pub const DEFAULT_RECOVERY_STALENESS: Duration = Duration::from_secs(60);

/// An endpoint and the url to probe it at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProbeTarget {
    pub id: EndpointId,
    pub url: String,
}

impl ProbeTarget {
    pub fn new(id: EndpointId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
        }
    }
}

impl From<&Stream> for ProbeTarget {
    fn from(stream: &Stream) -> Self {
        Self::new(EndpointId::for_stream(stream), stream.playable_url())
    }
}

/// Runs probes through a [`Prober`] and records the outcome in the registry.
///
/// Probing never fails from the caller's point of view: errors and timeouts
/// only move the endpoint through the health state machine.
pub struct HealthMonitor {
    registry: Arc<HealthRegistry>,
    prober: Arc<dyn Prober>,
    probe_timeout: Duration,
    recovery_staleness: Duration,
    /// Endpoints with a probe currently running.
    in_flight: DashSet<EndpointId>,
    /// Token of the active periodic schedule, if any.
    schedule: Mutex<Option<CancellationToken>>,
}

impl HealthMonitor {
    /// Create a monitor with default timeouts.
    pub fn new(registry: Arc<HealthRegistry>, prober: Arc<dyn Prober>) -> Self {
        Self::with_timeouts(
            registry,
            prober,
            DEFAULT_PROBE_TIMEOUT,
            DEFAULT_RECOVERY_STALENESS,
        )
    }

    /// Create a monitor with custom probe timeout and recovery staleness.
    pub fn with_timeouts(
        registry: Arc<HealthRegistry>,
        prober: Arc<dyn Prober>,
        probe_timeout: Duration,
        recovery_staleness: Duration,
    ) -> Self {
        Self {
            registry,
            prober,
            probe_timeout,
            recovery_staleness,
            in_flight: DashSet::new(),
            schedule: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<HealthRegistry> {
        &self.registry
    }

    /// Probe `url` and record the result under `id`.
    ///
    /// An empty url marks the endpoint offline without issuing a request. If a
    /// probe for `id` is already running, the current status is returned
    /// instead of starting a second one.
    pub async fn probe(&self, url: &str, id: &EndpointId) -> HealthStatus {
        if url.is_empty() {
            self.registry.report(id, HealthStatus::Offline, false);
            return HealthStatus::Offline;
        }

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, id) else {
            debug!(endpoint = %id, "Probe already in flight, skipping");
            return self.registry.status(id).status;
        };

        match self.check_within_timeout(url).await {
            Ok(()) => {
                self.registry.report(id, HealthStatus::Working, true);
                HealthStatus::Working
            }
            Err(e) => {
                debug!(endpoint = %id, error = %e, "Probe failed");
                self.registry.record_failure(id)
            }
        }
    }

    async fn check_within_timeout(&self, url: &str) -> Result<(), ProbeError> {
        tokio::time::timeout(self.probe_timeout, self.prober.check(url))
            .await
            .map_err(|_| ProbeError::Timeout(self.probe_timeout))?
    }

    /// Probe `url` and report whether the endpoint genuinely recovered.
    ///
    /// True only when the probe succeeds and the endpoint either never worked
    /// before or had not worked for longer than the recovery staleness.
    pub async fn check_recovery(&self, url: &str, id: &EndpointId) -> bool {
        let before = self.registry.status(id);
        if self.probe(url, id).await != HealthStatus::Working {
            return false;
        }

        let recovered = match before.last_working {
            None => true,
            Some(last_working) => {
                let since = Utc::now().signed_duration_since(last_working);
                since.to_std().unwrap_or_default() > self.recovery_staleness
            }
        };

        if recovered {
            info!(endpoint = %id, "Endpoint recovered");
        }
        recovered
    }

    /// Probe every target concurrently and wait for all of them.
    pub async fn probe_all(&self, targets: &[ProbeTarget]) -> Vec<(EndpointId, HealthStatus)> {
        join_all(targets.iter().map(|target| async move {
            let status = self.probe(&target.url, &target.id).await;
            (target.id.clone(), status)
        }))
        .await
    }

    /// Start one probe task per target; returns immediately.
    ///
    /// Each probe is independent: a slow endpoint never delays another.
    pub fn spawn_probes(
        self: &Arc<Self>,
        targets: impl IntoIterator<Item = ProbeTarget>,
        token: &CancellationToken,
    ) {
        for target in targets {
            let monitor = Arc::clone(self);
            let token = token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = monitor.probe(&target.url, &target.id) => {}
                }
            });
        }
    }

    /// Probe every target every `interval`, replacing any running schedule.
    pub fn start_periodic(self: &Arc<Self>, targets: Vec<ProbeTarget>, interval: Duration) {
        let token = CancellationToken::new();
        if let Some(previous) = self.schedule.lock().replace(token.clone()) {
            debug!("Replacing existing periodic probe schedule");
            previous.cancel();
        }

        info!(
            targets = targets.len(),
            interval = ?interval,
            "Starting periodic probing"
        );

        let monitor: Weak<Self> = Arc::downgrade(self);
        let probe_token = token.child_token();
        spawn_interval("periodic-probe", interval, token, move || {
            let Some(monitor) = monitor.upgrade() else {
                return false;
            };
            monitor.spawn_probes(targets.iter().cloned(), &probe_token);
            true
        });
    }

    /// Stop the periodic schedule, if any. In-flight probes are abandoned.
    pub fn stop(&self) {
        if let Some(token) = self.schedule.lock().take() {
            info!("Stopping periodic probing");
            token.cancel();
        }
    }

    /// Whether a periodic schedule is active.
    pub fn is_running(&self) -> bool {
        self.schedule
            .lock()
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        if let Some(token) = self.schedule.get_mut().take() {
            token.cancel();
        }
    }
}

/// Marks an endpoint as being probed for the guard's lifetime.
struct InFlightGuard<'a> {
    set: &'a DashSet<EndpointId>,
    id: EndpointId,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a DashSet<EndpointId>, id: &EndpointId) -> Option<Self> {
        set.insert(id.clone()).then(|| Self {
            set,
            id: id.clone(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::health::HealthRecord;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Prober answering from a fixed table; unknown urls fail.
    #[derive(Default)]
    struct FakeProber {
        reachable: parking_lot::RwLock<HashMap<String, bool>>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl FakeProber {
        fn set(&self, url: &str, reachable: bool) {
            self.reachable.write().insert(url.to_string(), reachable);
        }
    }

    #[async_trait]
    impl Prober for FakeProber {
        async fn check(&self, url: &str) -> Result<(), ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match self.reachable.read().get(url) {
                Some(true) => Ok(()),
                _ => Err(ProbeError::Other("unreachable".into())),
            }
        }
    }

    fn monitor_with(prober: Arc<FakeProber>) -> Arc<HealthMonitor> {
        Arc::new(HealthMonitor::new(Arc::new(HealthRegistry::new()), prober))
    }

    #[tokio::test]
    async fn test_probe_success_marks_working() {
        let prober = Arc::new(FakeProber::default());
        prober.set("https://ok", true);
        let monitor = monitor_with(prober);
        let id = EndpointId::from("a");

        assert_eq!(monitor.probe("https://ok", &id).await, HealthStatus::Working);
        let record = monitor.registry().status(&id);
        assert_eq!(record.error_count, 0);
        assert!(record.last_working.is_some());
    }

    #[tokio::test]
    async fn test_probe_empty_url_is_offline() {
        let prober = Arc::new(FakeProber::default());
        let monitor = monitor_with(prober.clone());
        let id = EndpointId::from("a");

        assert_eq!(monitor.probe("", &id).await, HealthStatus::Offline);
        assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
        assert_eq!(monitor.registry().status(&id).error_count, 1);
    }

    #[tokio::test]
    async fn test_three_failed_probes() {
        let monitor = monitor_with(Arc::new(FakeProber::default()));
        let id = EndpointId::from("a");

        let mut sequence = Vec::new();
        for _ in 0..3 {
            sequence.push(monitor.probe("https://down", &id).await);
        }
        assert_eq!(
            sequence,
            vec![
                HealthStatus::Unstable,
                HealthStatus::Offline,
                HealthStatus::Offline
            ]
        );
    }

    #[tokio::test]
    async fn test_working_then_failure_is_unstable() {
        let prober = Arc::new(FakeProber::default());
        prober.set("https://flaky", true);
        let monitor = monitor_with(prober.clone());
        let id = EndpointId::from("a");

        monitor.probe("https://flaky", &id).await;
        prober.set("https://flaky", false);
        assert_eq!(
            monitor.probe("https://flaky", &id).await,
            HealthStatus::Unstable
        );
        prober.set("https://flaky", true);
        assert_eq!(
            monitor.probe("https://flaky", &id).await,
            HealthStatus::Working
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout_counts_as_failure() {
        let prober = Arc::new(FakeProber {
            delay: Some(Duration::from_secs(30)),
            ..Default::default()
        });
        prober.set("https://slow", true);
        let monitor = monitor_with(prober);
        let id = EndpointId::from("a");

        assert_eq!(monitor.probe("https://slow", &id).await, HealthStatus::Unstable);
        assert_eq!(monitor.registry().status(&id).error_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_check_reports_timeout() {
        let prober = Arc::new(FakeProber {
            delay: Some(Duration::from_secs(30)),
            ..Default::default()
        });
        prober.set("https://slow", true);
        let monitor = monitor_with(prober);

        let err = monitor.check_within_timeout("https://slow").await.unwrap_err();
        assert!(matches!(err, ProbeError::Timeout(limit) if limit == DEFAULT_PROBE_TIMEOUT));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_probe_for_same_endpoint_is_coalesced() {
        let prober = Arc::new(FakeProber {
            delay: Some(Duration::from_secs(1)),
            ..Default::default()
        });
        prober.set("https://ok", true);
        let monitor = monitor_with(prober.clone());
        let id = EndpointId::from("a");

        let (first, second) = tokio::join!(
            monitor.probe("https://ok", &id),
            monitor.probe("https://ok", &id)
        );
        assert_eq!(first, HealthStatus::Working);
        assert_eq!(second, HealthStatus::Unknown);
        assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_check_recovery_after_stale_working() {
        let prober = Arc::new(FakeProber::default());
        prober.set("https://back", true);
        let monitor = monitor_with(prober);
        let id = EndpointId::from("a");

        let two_minutes_ago = Utc::now() - chrono::Duration::minutes(2);
        let registry = monitor.registry();
        registry.report_at(&id, HealthStatus::Working, true, two_minutes_ago);
        registry.report_at(&id, HealthStatus::Unstable, false, two_minutes_ago);
        registry.report_at(&id, HealthStatus::Offline, false, two_minutes_ago);

        assert!(monitor.check_recovery("https://back", &id).await);
        assert_eq!(registry.status(&id).status, HealthStatus::Working);
    }

    #[tokio::test]
    async fn test_check_recovery_never_failed() {
        let prober = Arc::new(FakeProber::default());
        prober.set("https://fresh", true);
        let monitor = monitor_with(prober);

        assert!(
            monitor
                .check_recovery("https://fresh", &EndpointId::from("a"))
                .await
        );
    }

    #[tokio::test]
    async fn test_check_recovery_failed_probe() {
        let monitor = monitor_with(Arc::new(FakeProber::default()));
        assert!(
            !monitor
                .check_recovery("https://down", &EndpointId::from("a"))
                .await
        );
    }

    #[tokio::test]
    async fn test_check_recovery_recently_working_is_not_recovery() {
        let prober = Arc::new(FakeProber::default());
        prober.set("https://ok", true);
        let monitor = monitor_with(prober);
        let id = EndpointId::from("a");

        monitor.probe("https://ok", &id).await;
        assert!(!monitor.check_recovery("https://ok", &id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_periodic_probes_on_interval() {
        let prober = Arc::new(FakeProber::default());
        prober.set("https://ok", true);
        let monitor = monitor_with(prober.clone());
        let target = ProbeTarget::new(EndpointId::from("a"), "https://ok");

        monitor.start_periodic(vec![target.clone()], Duration::from_secs(30));
        assert!(monitor.is_running());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            monitor.registry().status(&target.id).status,
            HealthStatus::Working
        );

        monitor.stop();
        assert!(!monitor.is_running());
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_periodic_replaces_schedule() {
        let prober = Arc::new(FakeProber::default());
        let monitor = monitor_with(prober.clone());
        let first = ProbeTarget::new(EndpointId::from("a"), "https://a");
        let second = ProbeTarget::new(EndpointId::from("b"), "https://b");

        monitor.start_periodic(vec![first.clone()], Duration::from_secs(10));
        monitor.start_periodic(vec![second.clone()], Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(monitor.registry().status(&first.id), HealthRecord::default());
        assert_eq!(monitor.registry().status(&second.id).error_count, 1);
        assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
    }
}
