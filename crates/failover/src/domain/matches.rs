use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a match on one provider, used to resolve its streams.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchSource {
    pub source: String,
    pub id: String,
}

impl MatchSource {
    pub fn new(source: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            id: id.into(),
        }
    }
}

/// A live event as handed over by the metadata collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    #[serde(default)]
    pub sport: String,
    #[serde(default)]
    pub league: String,
    #[serde(default)]
    pub team1: String,
    #[serde(default)]
    pub team2: String,
    /// Start time as reported upstream (RFC 3339 once normalized).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub sources: Vec<MatchSource>,
    // Image paths are carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
}

impl Match {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_teams(mut self, team1: impl Into<String>, team2: impl Into<String>) -> Self {
        self.team1 = team1.into();
        self.team2 = team2.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>, id: impl Into<String>) -> Self {
        self.sources.push(MatchSource::new(source, id));
        self
    }

    /// "Team1 vs Team2", or whichever side is known.
    pub fn title(&self) -> String {
        match (self.team1.is_empty(), self.team2.is_empty()) {
            (false, false) => format!("{} vs {}", self.team1, self.team2),
            (false, true) => self.team1.clone(),
            (true, false) => self.team2.clone(),
            (true, true) => self.id.clone(),
        }
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())?;
        if !self.league.is_empty() {
            write!(f, " ({})", self.league)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title() {
        assert_eq!(Match::new("m").with_teams("A", "B").title(), "A vs B");
        assert_eq!(Match::new("m").with_teams("Solo", "").title(), "Solo");
        assert_eq!(Match::new("m").title(), "m");
    }

    #[test]
    fn test_deserialize_defaults() {
        let m: Match = serde_json::from_str(r#"{"id":"x","isLive":true}"#).unwrap();
        assert!(m.is_live);
        assert!(m.sources.is_empty());
        assert_eq!(m.start_time, None);
    }
}
