//! Stream selector for choosing the best endpoint among a match's candidates.
//!
//! Candidates are ranked by current health first, then by the configured
//! language and quality preferences. Ranking reads the health registry once
//! per call, so a single call always sees one consistent snapshot.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::{EndpointId, Stream};
use crate::health::{HealthRegistry, HealthStatus};

/// Default quality preference, best first.
pub const DEFAULT_QUALITY_PREFERENCE: [&str; 6] = ["hd", "720p", "1080p", "sd", "480p", "360p"];

/// Default preferred language tag.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Configuration for stream selection preferences.
///
/// Quality matching is a case-insensitive substring test, so "720p" matches
/// "720p60" and "hd" matches "HD+" as well as "FullHD".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Preferred language tag (case-insensitive exact match).
    /// None disables the language criterion.
    pub preferred_language: Option<String>,
    /// Preferred quality tags in order of preference.
    /// Empty means quality does not affect ranking.
    pub preferred_qualities: Vec<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            preferred_language: Some(DEFAULT_LANGUAGE.to_string()),
            preferred_qualities: DEFAULT_QUALITY_PREFERENCE
                .iter()
                .map(|q| q.to_string())
                .collect(),
        }
    }
}

impl SelectionConfig {
    /// Merge another config into this one, with the other config taking precedence.
    ///
    /// Values set in `other` win; an empty quality list in `other` keeps ours.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            preferred_language: other
                .preferred_language
                .clone()
                .or_else(|| self.preferred_language.clone()),
            preferred_qualities: if other.preferred_qualities.is_empty() {
                self.preferred_qualities.clone()
            } else {
                other.preferred_qualities.clone()
            },
        }
    }
}

/// A candidate together with the data it was ranked on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedStream {
    pub stream: Stream,
    pub endpoint: EndpointId,
    pub status: HealthStatus,
}

/// Ranks candidate streams best-first.
#[derive(Debug, Clone)]
pub struct StreamSelector {
    registry: Arc<HealthRegistry>,
    config: SelectionConfig,
}

/// Precomputed sort key of one candidate.
struct Scored<'a> {
    stream: &'a Stream,
    endpoint: EndpointId,
    status: HealthStatus,
    language_rank: u8,
    quality_rank: usize,
}

impl StreamSelector {
    /// Create a selector with default preferences.
    pub fn new(registry: Arc<HealthRegistry>) -> Self {
        Self::with_config(registry, SelectionConfig::default())
    }

    /// Create a selector with custom preferences.
    pub fn with_config(registry: Arc<HealthRegistry>, config: SelectionConfig) -> Self {
        let config = SelectionConfig {
            preferred_language: config.preferred_language.map(|l| l.to_lowercase()),
            preferred_qualities: config
                .preferred_qualities
                .iter()
                .map(|q| q.to_lowercase())
                .collect(),
        };
        Self { registry, config }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<HealthRegistry> {
        &self.registry
    }

    /// Select the best stream from the available streams.
    ///
    /// Returns None only for an empty candidate list.
    pub fn select_best<'a>(&self, streams: &'a [Stream]) -> Option<&'a Stream> {
        self.sort_candidates(streams)
            .first()
            .copied()
            .or_else(|| streams.first())
    }

    /// Select the best stream other than the endpoint `exclude`.
    pub fn select_best_excluding<'a>(
        &self,
        streams: &'a [Stream],
        exclude: &EndpointId,
    ) -> Option<&'a Stream> {
        let remaining: Vec<&Stream> = streams
            .iter()
            .filter(|s| EndpointId::for_stream(s) != *exclude)
            .collect();
        self.sort_candidates(remaining)
            .first()
            .copied()
            .or_else(|| streams.iter().find(|s| EndpointId::for_stream(s) != *exclude))
    }

    /// Sort candidates by preference. Ties keep input order.
    pub fn sort_candidates<'a, I>(&self, streams: I) -> Vec<&'a Stream>
    where
        I: IntoIterator<Item = &'a Stream>,
    {
        self.score(streams).into_iter().map(|s| s.stream).collect()
    }

    /// Full ranking with the endpoint id and health status of every candidate.
    pub fn rank(&self, streams: &[Stream]) -> Vec<RankedStream> {
        self.score(streams)
            .into_iter()
            .map(|s| RankedStream {
                stream: s.stream.clone(),
                endpoint: s.endpoint,
                status: s.status,
            })
            .collect()
    }

    fn score<'a, I>(&self, streams: I) -> Vec<Scored<'a>>
    where
        I: IntoIterator<Item = &'a Stream>,
    {
        let mut scored: Vec<Scored<'a>> = streams
            .into_iter()
            .map(|stream| {
                let endpoint = EndpointId::for_stream(stream);
                let status = self.registry.status(&endpoint).status;
                Scored {
                    stream,
                    endpoint,
                    status,
                    language_rank: self.language_rank(stream),
                    quality_rank: self.quality_rank(stream),
                }
            })
            .collect();

        // `sort_by` is stable, so equal candidates keep their input order.
        scored.sort_by(compare_scored);

        if let Some(best) = scored.first() {
            trace!(
                endpoint = %best.endpoint,
                status = %best.status,
                candidates = scored.len(),
                "Ranked candidates"
            );
        }
        scored
    }

    /// 0 for the preferred language, 1 otherwise (lower is better).
    fn language_rank(&self, stream: &Stream) -> u8 {
        match (&self.config.preferred_language, &stream.language) {
            (Some(preferred), Some(language)) if language.to_lowercase() == *preferred => 0,
            (None, _) => 0,
            _ => 1,
        }
    }

    /// Index of the first matching quality preference (lower is better).
    ///
    /// Uses case-insensitive substring matching; no match ranks last.
    fn quality_rank(&self, stream: &Stream) -> usize {
        if self.config.preferred_qualities.is_empty() {
            return 0;
        }

        let quality = stream.quality.as_deref().unwrap_or_default().to_lowercase();
        self.config
            .preferred_qualities
            .iter()
            .position(|preferred| quality.contains(preferred.as_str()))
            .unwrap_or(usize::MAX)
    }
}

/// Compare two scored streams (lower is better).
fn compare_scored(a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
    // Priority Order:
    // 1. Health status
    // 2. Language preference
    // 3. Quality preference
    a.status
        .priority()
        .cmp(&b.status.priority())
        .then(a.language_rank.cmp(&b.language_rank))
        .then(a.quality_rank.cmp(&b.quality_rank))
}
