//! Candidate resolution seam towards the metadata collaborator.

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::Result;
use crate::domain::{Match, Stream};

/// Resolves the streams a provider offers for one of its match ids.
#[async_trait]
pub trait CandidateResolver: Send + Sync {
    async fn resolve(&self, source: &str, id: &str) -> Result<Vec<Stream>>;
}

/// Resolve the candidate list of a match.
///
/// Every source is resolved concurrently. A failing source contributes no
/// candidates instead of failing the whole match; results keep source order.
pub async fn resolve_candidates(resolver: &dyn CandidateResolver, m: &Match) -> Vec<Stream> {
    if m.sources.is_empty() {
        debug!(match_id = %m.id, "Match has no sources");
        return Vec::new();
    }

    let results = join_all(
        m.sources
            .iter()
            .map(|source| resolver.resolve(&source.source, &source.id)),
    )
    .await;

    let mut candidates = Vec::new();
    for (source, result) in m.sources.iter().zip(results) {
        match result {
            Ok(streams) => candidates.extend(streams),
            Err(e) => {
                warn!(
                    match_id = %m.id,
                    source = %source.source,
                    error = %e,
                    "Failed to resolve streams, continuing without this source"
                );
            }
        }
    }

    debug!(
        match_id = %m.id,
        candidates = candidates.len(),
        "Resolved candidates"
    );
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct TableResolver;

    #[async_trait]
    impl CandidateResolver for TableResolver {
        async fn resolve(&self, source: &str, id: &str) -> Result<Vec<Stream>> {
            match source {
                "alpha" => Ok(vec![
                    Stream::new(format!("https://alpha/{id}/1")).with_source("alpha"),
                    Stream::new(format!("https://alpha/{id}/2")).with_source("alpha"),
                ]),
                "bravo" => Ok(vec![
                    Stream::new(format!("https://bravo/{id}")).with_source("bravo"),
                ]),
                _ => Err(Error::resolution(source, id, "unavailable")),
            }
        }
    }

    #[tokio::test]
    async fn test_resolve_flattens_in_source_order() {
        let m = Match::new("m")
            .with_source("bravo", "x")
            .with_source("alpha", "y");
        let streams = resolve_candidates(&TableResolver, &m).await;
        let urls: Vec<_> = streams.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://bravo/x", "https://alpha/y/1", "https://alpha/y/2"]
        );
    }

    #[tokio::test]
    async fn test_failed_source_is_skipped() {
        let m = Match::new("m")
            .with_source("broken", "x")
            .with_source("bravo", "y");
        let streams = resolve_candidates(&TableResolver, &m).await;
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].source_label(), "bravo");
    }

    #[tokio::test]
    async fn test_no_sources() {
        let streams = resolve_candidates(&TableResolver, &Match::new("m")).await;
        assert!(streams.is_empty());
    }
}
