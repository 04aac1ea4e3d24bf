use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{EndpointId, Match, Stream};
use crate::health::HealthStatus;

/// Arrangement of the slots on the playback surface.
///
/// Informational only: the session validates transitions but does not
/// render anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    #[default]
    Grid,
    SideBySide,
    Focus,
}

impl LayoutMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::SideBySide => "side-by-side",
            Self::Focus => "focus",
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One playback position bound to a match.
#[derive(Debug, Clone)]
pub(crate) struct ViewSlot {
    pub(crate) match_info: Match,
    pub(crate) candidates: Vec<Stream>,
    selected: Option<Stream>,
    endpoint: Option<EndpointId>,
    pub(crate) muted: bool,
    pub(crate) focused: bool,
    /// Set once failover found no other candidate; cleared by the next bind.
    pub(crate) exhausted: bool,
}

impl ViewSlot {
    pub(crate) fn new(match_info: Match, candidates: Vec<Stream>, selected: Option<Stream>) -> Self {
        let endpoint = selected.as_ref().map(EndpointId::for_stream);
        Self {
            match_info,
            candidates,
            selected,
            endpoint,
            muted: true,
            focused: false,
            exhausted: false,
        }
    }

    pub(crate) fn match_id(&self) -> &str {
        &self.match_info.id
    }

    pub(crate) fn selected(&self) -> Option<&Stream> {
        self.selected.as_ref()
    }

    pub(crate) fn endpoint(&self) -> Option<&EndpointId> {
        self.endpoint.as_ref()
    }

    /// Bind `stream` as the selection. Refused unless it is one of the candidates.
    pub(crate) fn bind(&mut self, stream: &Stream) -> bool {
        if !self.candidates.contains(stream) {
            return false;
        }
        self.endpoint = Some(EndpointId::for_stream(stream));
        self.selected = Some(stream.clone());
        self.exhausted = false;
        true
    }

    pub(crate) fn view(&self, status: HealthStatus) -> SlotView {
        SlotView {
            match_info: self.match_info.clone(),
            selected: self.selected.clone(),
            endpoint: self.endpoint.clone(),
            status,
            candidates: self.candidates.len(),
            muted: self.muted,
            focused: self.focused,
        }
    }
}

/// Read-only copy of a slot for presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotView {
    #[serde(rename = "match")]
    pub match_info: Match,
    pub selected: Option<Stream>,
    pub endpoint: Option<EndpointId>,
    /// Health of the selected endpoint; `Unknown` without a selection.
    pub status: HealthStatus,
    /// Number of candidates the slot can fail over between.
    pub candidates: usize,
    pub muted: bool,
    pub focused: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<Stream> {
        vec![
            Stream::new("https://a/1").with_source("alpha"),
            Stream::new("https://b/1").with_source("bravo"),
        ]
    }

    #[test]
    fn test_new_slot_derives_endpoint() {
        let streams = candidates();
        let slot = ViewSlot::new(Match::new("m"), streams.clone(), Some(streams[1].clone()));
        assert_eq!(slot.endpoint(), Some(&EndpointId::for_stream(&streams[1])));
        assert!(slot.muted);
        assert!(!slot.focused);
    }

    #[test]
    fn test_bind_rejects_foreign_stream() {
        let streams = candidates();
        let mut slot = ViewSlot::new(Match::new("m"), streams.clone(), Some(streams[0].clone()));

        assert!(!slot.bind(&Stream::new("https://elsewhere")));
        assert_eq!(slot.selected(), Some(&streams[0]));

        slot.exhausted = true;
        assert!(slot.bind(&streams[1]));
        assert!(!slot.exhausted);
        assert_eq!(slot.selected(), Some(&streams[1]));
        assert_eq!(slot.endpoint(), Some(&EndpointId::for_stream(&streams[1])));
    }

    #[test]
    fn test_layout_serde_names() {
        assert_eq!(
            serde_json::to_string(&LayoutMode::SideBySide).unwrap(),
            "\"side-by-side\""
        );
        assert_eq!(LayoutMode::default(), LayoutMode::Grid);
    }
}
