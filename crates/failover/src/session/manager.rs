use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::events::{SessionEvent, SessionEventBroadcaster};
use super::slot::{LayoutMode, SlotView, ViewSlot};
use super::sweeps::SessionSweeps;
use crate::Result;
use crate::config::FailoverConfig;
use crate::domain::{EndpointId, Match, Stream};
use crate::health::{HealthMonitor, HealthRegistry, HealthStatus, ProbeTarget};
use crate::resolver::{CandidateResolver, resolve_candidates};
use crate::selector::{RankedStream, StreamSelector};

/// Result of reporting a playback failure on a slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FailoverOutcome {
    /// The slot now plays another candidate.
    Switched {
        from: Option<EndpointId>,
        to: EndpointId,
        stream: Stream,
    },
    /// No other candidate is left; the slot keeps its stream.
    Exhausted,
    /// The current stream is not failing; nothing was changed.
    Unchanged,
    /// No slot is bound to the match.
    NotFound,
    /// The slot has neither a stream nor candidates.
    NoSelection,
}

impl FailoverOutcome {
    pub fn is_switched(&self) -> bool {
        matches!(self, Self::Switched { .. })
    }
}

struct SessionState {
    slots: Vec<ViewSlot>,
    layout: LayoutMode,
}

impl SessionState {
    fn find(&self, match_id: &str) -> Option<&ViewSlot> {
        self.slots.iter().find(|s| s.match_id() == match_id)
    }

    fn find_mut(&mut self, match_id: &str) -> Option<&mut ViewSlot> {
        self.slots.iter_mut().find(|s| s.match_id() == match_id)
    }

    fn contains(&self, match_id: &str) -> bool {
        self.find(match_id).is_some()
    }

    fn has_focus(&self) -> bool {
        self.slots.iter().any(|s| s.focused)
    }

    /// Move focus to the first slot if nothing is focused.
    fn ensure_focus(&mut self) {
        if !self.has_focus()
            && let Some(first) = self.slots.first_mut()
        {
            first.focused = true;
        }
    }

    /// Fall back to the grid when the slot set no longer supports the layout.
    fn normalize_layout(&mut self) {
        if !self.layout_allowed(self.layout) {
            debug!(layout = %self.layout, slots = self.slots.len(), "Layout no longer applies, using grid");
            self.layout = LayoutMode::Grid;
        }
    }

    fn layout_allowed(&self, layout: LayoutMode) -> bool {
        match layout {
            LayoutMode::Grid => true,
            LayoutMode::SideBySide => self.slots.len() == 2,
            LayoutMode::Focus => self.has_focus(),
        }
    }
}

/// State shared between the manager and its background sweeps.
pub(super) struct SessionInner {
    state: RwLock<SessionState>,
    monitor: Arc<HealthMonitor>,
    selector: StreamSelector,
    resolver: Arc<dyn CandidateResolver>,
    config: FailoverConfig,
    events: SessionEventBroadcaster,
}

impl SessionInner {
    pub(super) fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    pub(super) fn config(&self) -> &FailoverConfig {
        &self.config
    }

    pub(super) fn publish(&self, event: SessionEvent) {
        self.events.publish(event);
    }

    /// Every distinct endpoint among the candidates of every slot.
    pub(super) fn probe_targets(&self) -> Vec<ProbeTarget> {
        let state = self.state.read();
        let mut seen = HashSet::new();
        state
            .slots
            .iter()
            .flat_map(|slot| slot.candidates.iter())
            .map(ProbeTarget::from)
            .filter(|target| seen.insert(target.id.clone()))
            .collect()
    }

    /// Offline endpoints with the matches that list them.
    pub(super) fn offline_targets(&self) -> Vec<(ProbeTarget, Vec<String>)> {
        let registry = self.monitor.registry();
        let state = self.state.read();
        let mut targets: Vec<(ProbeTarget, Vec<String>)> = Vec::new();
        for slot in &state.slots {
            for stream in &slot.candidates {
                let target = ProbeTarget::from(stream);
                if registry.status(&target.id).status != HealthStatus::Offline {
                    continue;
                }
                match targets.iter_mut().find(|(t, _)| t.id == target.id) {
                    Some((_, match_ids)) => {
                        if !match_ids.iter().any(|id| id == slot.match_id()) {
                            match_ids.push(slot.match_id().to_string());
                        }
                    }
                    None => targets.push((target, vec![slot.match_id().to_string()])),
                }
            }
        }
        targets
    }

    /// Resolve candidates and pick the initial selection. No lock is held.
    async fn build_slot(&self, match_info: Match) -> ViewSlot {
        let candidates = resolve_candidates(self.resolver.as_ref(), &match_info).await;
        let selected = self.selector.select_best(&candidates).cloned();
        if selected.is_none() {
            warn!(match_id = %match_info.id, "No playable stream for match");
        }
        ViewSlot::new(match_info, candidates, selected)
    }

    fn slot_added(slot: &ViewSlot) -> SessionEvent {
        SessionEvent::SlotAdded {
            match_id: slot.match_id().to_string(),
            selected: slot.selected().cloned(),
            timestamp: Utc::now(),
        }
    }

    fn slot_removed(match_id: &str) -> SessionEvent {
        SessionEvent::SlotRemoved {
            match_id: match_id.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Owns the view slots of one playback session.
///
/// Each slot tracks its own selection and fails over independently. All
/// slots share the monitor's health registry, so a failure seen by one slot
/// lowers that endpoint's rank for every other slot listing it.
///
/// While the session is alive two sweeps run in the background: one probing
/// every candidate endpoint, one re-checking offline endpoints for recovery.
/// Dropping the manager stops both.
pub struct SessionManager {
    inner: Arc<SessionInner>,
    sweeps: Mutex<Option<SessionSweeps>>,
}

impl SessionManager {
    /// Start a session around `initial`.
    ///
    /// The first slot is unmuted and focused. Must be called from within a
    /// tokio runtime since the sweeps are spawned immediately.
    pub async fn create(
        initial: Match,
        resolver: Arc<dyn CandidateResolver>,
        monitor: Arc<HealthMonitor>,
        config: FailoverConfig,
    ) -> Result<Self> {
        config.validate()?;

        let selector =
            StreamSelector::with_config(Arc::clone(monitor.registry()), config.selection.clone());
        let inner = Arc::new(SessionInner {
            state: RwLock::new(SessionState {
                slots: Vec::with_capacity(config.max_slots),
                layout: LayoutMode::default(),
            }),
            monitor,
            selector,
            resolver,
            config,
            events: SessionEventBroadcaster::default(),
        });

        let mut slot = inner.build_slot(initial).await;
        slot.muted = false;
        slot.focused = true;
        let event = SessionInner::slot_added(&slot);
        info!(
            match_id = %slot.match_id(),
            candidates = slot.candidates.len(),
            "Session created"
        );
        inner.state.write().slots.push(slot);
        inner.publish(event);

        let sweeps = SessionSweeps::start(&inner);
        Ok(Self {
            inner,
            sweeps: Mutex::new(Some(sweeps)),
        })
    }

    /// Bind another match to a new slot.
    ///
    /// Returns false when the session is full or already shows the match.
    pub async fn add_match(&self, match_info: Match) -> bool {
        if !self.can_add(&match_info.id) {
            return false;
        }

        // Resolution awaits network I/O, so the lock is released meanwhile
        // and both checks are repeated before committing.
        let mut slot = self.inner.build_slot(match_info).await;

        let event = {
            let mut state = self.inner.state.write();
            if state.slots.len() >= self.inner.config.max_slots
                || state.contains(slot.match_id())
            {
                debug!(match_id = %slot.match_id(), "Session changed during resolution, dropping slot");
                return false;
            }
            if state.slots.is_empty() {
                slot.muted = false;
                slot.focused = true;
            }
            let event = SessionInner::slot_added(&slot);
            info!(
                match_id = %slot.match_id(),
                candidates = slot.candidates.len(),
                slots = state.slots.len() + 1,
                "Added match to session"
            );
            state.slots.push(slot);
            state.normalize_layout();
            event
        };
        self.inner.publish(event);
        true
    }

    fn can_add(&self, match_id: &str) -> bool {
        let state = self.inner.state.read();
        if state.slots.len() >= self.inner.config.max_slots {
            debug!(match_id, max_slots = self.inner.config.max_slots, "Session is full");
            return false;
        }
        if state.contains(match_id) {
            debug!(match_id, "Match already in session");
            return false;
        }
        true
    }

    /// Drop the slot bound to `match_id`. An empty session stays valid.
    pub fn remove_match(&self, match_id: &str) -> bool {
        {
            let mut state = self.inner.state.write();
            let Some(index) = state.slots.iter().position(|s| s.match_id() == match_id) else {
                return false;
            };
            state.slots.remove(index);
            state.ensure_focus();
            state.normalize_layout();
        }
        info!(match_id, "Removed match from session");
        self.inner.publish(SessionInner::slot_removed(match_id));
        true
    }

    /// Keep only the first slot.
    pub fn retain_first(&self) -> usize {
        let removed: Vec<ViewSlot> = {
            let mut state = self.inner.state.write();
            let removed = if state.slots.len() > 1 {
                state.slots.split_off(1)
            } else {
                Vec::new()
            };
            state.ensure_focus();
            state.normalize_layout();
            removed
        };
        for slot in &removed {
            self.inner.publish(SessionInner::slot_removed(slot.match_id()));
        }
        if !removed.is_empty() {
            info!(removed = removed.len(), "Cleared session down to one slot");
        }
        removed.len()
    }

    /// Flip the mute flag of a slot, returning the new value.
    pub fn toggle_mute(&self, match_id: &str) -> Option<bool> {
        let mut state = self.inner.state.write();
        let slot = state.find_mut(match_id)?;
        slot.muted = !slot.muted;
        Some(slot.muted)
    }

    /// Make `match_id` the only focused slot.
    pub fn focus(&self, match_id: &str) -> bool {
        let mut state = self.inner.state.write();
        if !state.contains(match_id) {
            return false;
        }
        for slot in &mut state.slots {
            slot.focused = slot.match_id() == match_id;
        }
        true
    }

    /// Switch layout. Side-by-side needs exactly two slots, focus a focused slot.
    pub fn set_layout(&self, layout: LayoutMode) -> bool {
        let mut state = self.inner.state.write();
        if !state.layout_allowed(layout) {
            debug!(%layout, slots = state.slots.len(), "Layout rejected");
            return false;
        }
        state.layout = layout;
        true
    }

    pub fn layout(&self) -> LayoutMode {
        self.inner.state.read().layout
    }

    /// Select `stream` for a slot by hand. It must be one of the slot's candidates.
    pub fn set_stream(&self, match_id: &str, stream: &Stream) -> bool {
        {
            let mut state = self.inner.state.write();
            let Some(slot) = state.find_mut(match_id) else {
                return false;
            };
            if !slot.bind(stream) {
                debug!(match_id, url = %stream.playable_url(), "Stream is not a candidate of this slot");
                return false;
            }
        }
        self.inner.publish(SessionEvent::StreamChanged {
            match_id: match_id.to_string(),
            stream: stream.clone(),
            timestamp: Utc::now(),
        });
        true
    }

    /// Playback of the slot's stream failed: degrade it and fail over.
    pub fn report_failure(&self, match_id: &str) -> FailoverOutcome {
        let registry = self.inner.monitor.registry();
        let (outcome, event) = {
            let mut state = self.inner.state.write();
            let Some(slot) = state.find_mut(match_id) else {
                return FailoverOutcome::NotFound;
            };

            let from = slot.endpoint().cloned();
            let next = match &from {
                Some(current) => {
                    let status = registry.record_failure(current);
                    warn!(match_id, endpoint = %current, %status, "Stream failed");
                    self.inner
                        .selector
                        .select_best_excluding(&slot.candidates, current)
                        .cloned()
                }
                None => self.inner.selector.select_best(&slot.candidates).cloned(),
            };
            settle(slot, from, next)
        };

        if let Some(event) = event {
            self.inner.publish(event);
        }
        outcome
    }

    /// Re-run the selector for a slot whose stream health already shows
    /// failures, without recording another one.
    ///
    /// For callers that learn about failures from probes rather than from
    /// playback: the probe has already degraded the endpoint, so this only
    /// moves the slot to a candidate ranked strictly better than the current
    /// one. A slot whose stream is not failing is left `Unchanged`.
    pub fn reselect(&self, match_id: &str) -> FailoverOutcome {
        let registry = self.inner.monitor.registry();
        let (outcome, event) = {
            let mut state = self.inner.state.write();
            let Some(slot) = state.find_mut(match_id) else {
                return FailoverOutcome::NotFound;
            };

            let from = slot.endpoint().cloned();
            let next = match &from {
                Some(current) => {
                    let current_status = registry.status(current).status;
                    if !current_status.is_failing() {
                        slot.exhausted = false;
                        return FailoverOutcome::Unchanged;
                    }
                    self.inner
                        .selector
                        .select_best_excluding(&slot.candidates, current)
                        .filter(|stream| {
                            registry.status(&EndpointId::for_stream(stream)).status.priority()
                                < current_status.priority()
                        })
                        .cloned()
                }
                None => self.inner.selector.select_best(&slot.candidates).cloned(),
            };
            settle(slot, from, next)
        };

        if let Some(event) = event {
            self.inner.publish(event);
        }
        outcome
    }

    /// Playback of the slot's stream loaded.
    pub fn report_success(&self, match_id: &str) -> bool {
        let endpoint = {
            let mut state = self.inner.state.write();
            state.find_mut(match_id).and_then(|slot| {
                slot.exhausted = false;
                slot.endpoint().cloned()
            })
        };
        match endpoint {
            Some(endpoint) => {
                self.inner
                    .monitor
                    .registry()
                    .report(&endpoint, HealthStatus::Working, true);
                true
            }
            None => false,
        }
    }

    /// Copies of every slot in order, with the health of each selection.
    pub fn snapshot(&self) -> Vec<SlotView> {
        let registry = self.inner.monitor.registry();
        self.inner
            .state
            .read()
            .slots
            .iter()
            .map(|slot| {
                let status = slot
                    .endpoint()
                    .map(|id| registry.status(id).status)
                    .unwrap_or_default();
                slot.view(status)
            })
            .collect()
    }

    /// The slot's candidates, best first, with their health.
    pub fn ranked(&self, match_id: &str) -> Option<Vec<RankedStream>> {
        let state = self.inner.state.read();
        state
            .find(match_id)
            .map(|slot| self.inner.selector.rank(&slot.candidates))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn contains(&self, match_id: &str) -> bool {
        self.inner.state.read().contains(match_id)
    }

    pub fn len(&self) -> usize {
        self.inner.state.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.config.max_slots
    }

    pub fn registry(&self) -> &Arc<HealthRegistry> {
        self.inner.monitor.registry()
    }

    /// Restart the background sweeps after a [`shutdown`](Self::shutdown).
    pub fn start_sweeps(&self) {
        let mut sweeps = self.sweeps.lock();
        if sweeps.is_none() {
            *sweeps = Some(SessionSweeps::start(&self.inner));
        }
    }

    /// Stop the background sweeps. Slots are kept.
    pub fn shutdown(&self) {
        if self.sweeps.lock().take().is_some() {
            info!("Session sweeps stopped");
        }
    }

    pub fn sweeps_running(&self) -> bool {
        self.sweeps.lock().is_some()
    }
}

/// Bind `next` to the slot, or mark it exhausted when there is nothing left.
///
/// Exhaustion is logged and published only when the slot enters it; repeated
/// reports on an exhausted slot stay quiet until a stream is bound again.
fn settle(
    slot: &mut ViewSlot,
    from: Option<EndpointId>,
    next: Option<Stream>,
) -> (FailoverOutcome, Option<SessionEvent>) {
    let match_id = slot.match_id().to_string();
    match next {
        Some(stream) => {
            slot.bind(&stream);
            let to = EndpointId::for_stream(&stream);
            info!(
                match_id = %match_id,
                from = ?from.as_ref().map(EndpointId::as_str),
                to = %to,
                "Failed over to next stream"
            );
            let event = SessionEvent::FailedOver {
                match_id,
                from: from.clone(),
                to: to.clone(),
                timestamp: Utc::now(),
            };
            (FailoverOutcome::Switched { from, to, stream }, Some(event))
        }
        None if from.is_none() => (FailoverOutcome::NoSelection, None),
        None if slot.exhausted => {
            debug!(match_id = %match_id, "Slot is still out of streams");
            (FailoverOutcome::Exhausted, None)
        }
        None => {
            slot.exhausted = true;
            warn!(match_id = %match_id, "No more streams available");
            let event = SessionEvent::Exhausted {
                match_id,
                endpoint: from,
                timestamp: Utc::now(),
            };
            (FailoverOutcome::Exhausted, Some(event))
        }
    }
}
