use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde_json::Value;
use stream_failover::http::{DEFAULT_USER_AGENT, client_builder};
use stream_failover::{CandidateResolver, Match, Stream};
use tracing::{debug, warn};
use url::Url;

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::models::Sport;
use crate::normalize::{normalize_matches, normalize_streams};

/// HTTP client for the match catalog.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: Url,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let user_agent = config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        let client = client_builder(user_agent, config.timeout()).build()?;
        Self::with_client(client, &config.base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| CatalogError::invalid_base_url(base_url, e))?;
        if base_url.cannot_be_a_base() {
            return Err(CatalogError::invalid_base_url(
                base_url.as_str(),
                "cannot be a base",
            ));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base_url` extended by `segments`, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json(&self, url: Url) -> Result<Value> {
        debug!(%url, "Fetching catalog");
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json::<Value>().await?)
    }

    pub async fn fetch_sports(&self) -> Result<Vec<Sport>> {
        let value = self.get_json(self.endpoint(&["sports"])).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Matches of one sport, or of every sport when `sport` is None.
    ///
    /// When fetching every sport, a sport that fails to load contributes no
    /// matches instead of failing the whole listing.
    pub async fn fetch_matches(&self, sport: Option<&str>) -> Result<Vec<Match>> {
        if let Some(sport) = sport {
            return self.fetch_sport_matches(sport).await;
        }

        let sports = self.fetch_sports().await?;
        if sports.is_empty() {
            warn!("Catalog lists no sports");
            return Ok(Vec::new());
        }

        let results = join_all(
            sports
                .iter()
                .map(|sport| self.fetch_sport_matches(&sport.id)),
        )
        .await;

        let mut matches = Vec::new();
        for (sport, result) in sports.iter().zip(results) {
            match result {
                Ok(found) => matches.extend(found),
                Err(e) => warn!(sport = %sport.name, error = %e, "Failed to fetch matches"),
            }
        }
        Ok(matches)
    }

    async fn fetch_sport_matches(&self, sport: &str) -> Result<Vec<Match>> {
        let value = self.get_json(self.endpoint(&["matches", sport])).await?;
        match value {
            Value::Array(items) => Ok(normalize_matches(items)),
            _ => {
                debug!(sport, "Match listing is not an array");
                Ok(Vec::new())
            }
        }
    }

    /// Look a match up by id across every sport.
    pub async fn find_match(&self, id: &str) -> Result<Option<Match>> {
        let matches = self.fetch_matches(None).await?;
        Ok(matches.into_iter().find(|m| m.id == id))
    }

    pub async fn fetch_streams(&self, source: &str, id: &str) -> Result<Vec<Stream>> {
        let value = self.get_json(self.endpoint(&["stream", source, id])).await?;
        let streams = normalize_streams(value, source);
        debug!(source, id, streams = streams.len(), "Fetched streams");
        Ok(streams)
    }
}

#[async_trait]
impl CandidateResolver for CatalogClient {
    async fn resolve(&self, source: &str, id: &str) -> stream_failover::Result<Vec<Stream>> {
        self.fetch_streams(source, id)
            .await
            .map_err(|e| stream_failover::Error::resolution(source, id, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stream_failover::resolve_candidates;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> CatalogClient {
        let config = CatalogConfig {
            base_url: format!("{}/api", server.uri()),
            ..Default::default()
        };
        CatalogClient::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        stream_failover::http::install_rustls_provider();
        let client = CatalogClient::with_client(Client::new(), "https://example.com/api/").unwrap();
        assert_eq!(
            client.endpoint(&["stream", "alpha", "a b/c"]).as_str(),
            "https://example.com/api/stream/alpha/a%20b%2Fc"
        );
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        stream_failover::http::install_rustls_provider();
        assert!(matches!(
            CatalogClient::with_client(Client::new(), "not a url"),
            Err(CatalogError::InvalidBaseUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_sports() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sports"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "football", "name": "Football"},
                {"id": "basketball", "name": "Basketball"}
            ])))
            .mount(&server)
            .await;

        let sports = client_for(&server).await.fetch_sports().await.unwrap();
        assert_eq!(sports.len(), 2);
        assert_eq!(sports[0].id, "football");
    }

    #[tokio::test]
    async fn test_fetch_all_matches_tolerates_failing_sport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sports"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "football", "name": "Football"},
                {"id": "darts", "name": "Darts"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/matches/football"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "m1", "title": "Arsenal - Chelsea", "sources": [{"source": "alpha", "id": "ars-che"}]}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/matches/darts"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let matches = client.fetch_matches(None).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].team1, "Arsenal");

        let err = client.fetch_matches(Some("darts")).await.unwrap_err();
        assert!(matches!(err, CatalogError::Status { status: 503, .. }));

        assert!(client.find_match("m1").await.unwrap().is_some());
        assert!(client.find_match("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_streams_single_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stream/alpha/ars-che"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embedUrl": "https://embed/alpha/1",
                "language": "en",
                "hd": false
            })))
            .mount(&server)
            .await;

        let streams = client_for(&server)
            .await
            .fetch_streams("alpha", "ars-che")
            .await
            .unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].source.as_deref(), Some("alpha"));
        assert_eq!(streams[0].quality.as_deref(), Some("SD"));
    }

    #[tokio::test]
    async fn test_resolver_skips_failing_source() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stream/alpha/x"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"embedUrl": "https://embed/alpha/1", "hd": true},
                {"embedUrl": "https://embed/alpha/2"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/stream/bravo/x"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let m = Match::new("x").with_source("bravo", "x").with_source("alpha", "x");
        let streams = resolve_candidates(&client, &m).await;
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].quality.as_deref(), Some("HD"));

        let err = client.resolve("bravo", "x").await.unwrap_err();
        assert!(matches!(err, stream_failover::Error::Resolution { .. }));
    }
}
