//! Background probe and recovery sweeps of a session.

use std::sync::{Arc, Weak};

use chrono::Utc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use super::events::SessionEvent;
use super::manager::SessionInner;
use crate::task::spawn_interval;

/// Handle on the two sweep tasks of a session. Dropping it stops both.
pub(super) struct SessionSweeps {
    _guard: DropGuard,
}

impl SessionSweeps {
    pub(super) fn start(inner: &Arc<SessionInner>) -> Self {
        let token = CancellationToken::new();
        let config = inner.config();

        info!(
            probe_interval = ?config.probe_interval(),
            recovery_interval = ?config.recovery_interval(),
            "Starting session sweeps"
        );

        let session: Weak<SessionInner> = Arc::downgrade(inner);
        let probe_token = token.child_token();
        let spawn_token = probe_token.clone();
        spawn_interval(
            "probe-sweep",
            config.probe_interval(),
            probe_token,
            move || {
                let Some(session) = session.upgrade() else {
                    return false;
                };
                let targets = session.probe_targets();
                debug!(endpoints = targets.len(), "Probe sweep");
                session.monitor().spawn_probes(targets, &spawn_token);
                true
            },
        );

        let session: Weak<SessionInner> = Arc::downgrade(inner);
        let recovery_token = token.child_token();
        let spawn_token = recovery_token.clone();
        spawn_interval(
            "recovery-sweep",
            config.recovery_interval(),
            recovery_token,
            move || {
                let Some(session) = session.upgrade() else {
                    return false;
                };
                let targets = session.offline_targets();
                if targets.is_empty() {
                    return true;
                }
                debug!(endpoints = targets.len(), "Recovery sweep");

                for (target, match_ids) in targets {
                    let session = Arc::clone(&session);
                    let token = spawn_token.clone();
                    tokio::spawn(async move {
                        let recovered = tokio::select! {
                            _ = token.cancelled() => return,
                            recovered = session.monitor().check_recovery(&target.url, &target.id) => recovered,
                        };
                        if recovered {
                            session.publish(SessionEvent::EndpointRecovered {
                                endpoint: target.id,
                                match_ids,
                                timestamp: Utc::now(),
                            });
                        }
                    });
                }
                true
            },
        );

        Self {
            _guard: token.drop_guard(),
        }
    }
}
