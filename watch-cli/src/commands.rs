use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use match_catalog::CatalogClient;
use stream_failover::{
    FailoverOutcome, HealthMonitor, HealthRegistry, HttpProber, ProbeTarget, SessionManager,
    StreamSelector,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::output::OutputManager;

pub struct CommandExecutor {
    config: AppConfig,
    client: CatalogClient,
    output: OutputManager,
}

impl CommandExecutor {
    pub fn new(config: AppConfig, output: OutputManager) -> Result<Self> {
        let client =
            CatalogClient::new(&config.catalog).context("Failed to create catalog client")?;
        Ok(Self {
            config,
            client,
            output,
        })
    }

    fn health_monitor(&self) -> Result<Arc<HealthMonitor>> {
        let failover = &self.config.failover;
        let registry = Arc::new(HealthRegistry::with_offline_threshold(
            failover.offline_threshold,
        ));
        let prober = HttpProber::new(failover.probe_timeout())
            .context("Failed to create stream prober")?;
        Ok(Arc::new(HealthMonitor::with_timeouts(
            registry,
            Arc::new(prober),
            failover.probe_timeout(),
            failover.recovery_staleness(),
        )))
    }

    pub async fn sports(&self) -> Result<()> {
        let sports = self
            .client
            .fetch_sports()
            .await
            .context("Failed to fetch sports")?;
        self.output.print_sports(&sports)
    }

    pub async fn matches(&self, sport: Option<&str>, live_only: bool) -> Result<()> {
        let mut matches = self
            .client
            .fetch_matches(sport)
            .await
            .context("Failed to fetch matches")?;
        if live_only {
            matches.retain(|m| m.is_live);
        }
        self.output.print_matches(&matches)
    }

    pub async fn streams(&self, source: &str, id: &str) -> Result<()> {
        let streams = self
            .client
            .fetch_streams(source, id)
            .await
            .with_context(|| format!("Failed to fetch streams for {source}/{id}"))?;

        let monitor = self.health_monitor()?;
        let targets: Vec<ProbeTarget> = streams.iter().map(ProbeTarget::from).collect();
        monitor.probe_all(&targets).await;

        let selector = StreamSelector::with_config(
            Arc::clone(monitor.registry()),
            self.config.failover.selection.clone(),
        );
        self.output.print_ranked(&selector.rank(&streams))
    }

    pub async fn watch(&self, match_ids: &[String], duration: Option<u64>) -> Result<()> {
        let session = self.start_session(match_ids).await?;
        let mut events = session.subscribe();
        self.output.print_slots(&session.snapshot())?;

        let deadline = async {
            match duration {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);

        let mut check = tokio::time::interval(self.config.failover.probe_interval());
        check.tick().await;

        info!(slots = session.len(), "Watching, press Ctrl-C to stop");
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
                _ = &mut deadline => break,
                _ = check.tick() => {
                    fail_over_dead_slots(&session);
                }
                event = events.recv() => match event {
                    Ok(event) => self.output.print_event(&event)?,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Dropped session events");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        session.shutdown();
        if !self.output.is_json() {
            println!();
        }
        self.output.print_slots(&session.snapshot())
    }

    /// Build a session over the requested matches and run one probe round
    /// so every slot starts on a stream that answered.
    async fn start_session(&self, match_ids: &[String]) -> Result<SessionManager> {
        let catalog = self
            .client
            .fetch_matches(None)
            .await
            .context("Failed to fetch matches")?;

        let mut selected = Vec::with_capacity(match_ids.len());
        for id in match_ids {
            match catalog.iter().find(|m| &m.id == id) {
                Some(m) => selected.push(m.clone()),
                None => warn!(match_id = %id, "Match not found in catalog"),
            }
        }
        let mut selected = selected.into_iter();
        let Some(first) = selected.next() else {
            bail!("None of the requested matches are in the catalog");
        };

        let monitor = self.health_monitor()?;
        let session = SessionManager::create(
            first,
            Arc::new(self.client.clone()),
            Arc::clone(&monitor),
            self.config.failover.clone(),
        )
        .await
        .context("Failed to start session")?;

        for m in selected {
            let id = m.id.clone();
            if !session.add_match(m).await {
                warn!(match_id = %id, capacity = session.capacity(), "Could not add match to session");
            }
        }

        let targets: Vec<ProbeTarget> = session
            .snapshot()
            .iter()
            .filter_map(|slot| session.ranked(&slot.match_info.id))
            .flatten()
            .map(|ranked| ProbeTarget::new(ranked.endpoint, ranked.stream.playable_url()))
            .collect();
        monitor.probe_all(&targets).await;
        fail_over_dead_slots(&session);
        Ok(session)
    }
}

/// Stand in for a player: move slots off streams the probes found failing.
///
/// Probes have already recorded those failures, so this only re-runs the
/// selection and never degrades health itself. Returns how many slots moved.
fn fail_over_dead_slots(session: &SessionManager) -> usize {
    let mut switched = 0;
    for slot in session.snapshot() {
        if !slot.status.is_failing() {
            continue;
        }
        if let FailoverOutcome::Switched { from, to, .. } = session.reselect(&slot.match_info.id) {
            debug!(
                match_id = %slot.match_info.id,
                from = ?from.as_ref().map(|id| id.as_str()),
                to = %to,
                "Replaced failing stream"
            );
            switched += 1;
        }
    }
    switched
}
