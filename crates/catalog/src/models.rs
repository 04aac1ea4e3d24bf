//! Wire types of the catalog API.
//!
//! Upstream payloads are loosely typed and field names vary between
//! endpoints, so every field is optional and aliases are kept as separate
//! fields; [`crate::normalize`] picks the first one that carries a value.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stream_failover::MatchSource;

/// A sport category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sport {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

/// A match as returned by `/matches/{sport}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMatch {
    /// String or number.
    pub id: Option<Value>,
    pub title: Option<String>,
    pub team1: Option<String>,
    pub team2: Option<String>,
    /// Epoch milliseconds or a preformatted date string.
    pub date: Option<Value>,
    pub start_time: Option<String>,
    #[serde(rename = "start_time")]
    pub start_time_snake: Option<String>,
    pub time: Option<String>,
    pub is_live: Option<bool>,
    #[serde(rename = "is_live")]
    pub is_live_snake: Option<bool>,
    pub live: Option<bool>,
    pub sport: Option<String>,
    pub category: Option<String>,
    pub league: Option<String>,
    pub tournament: Option<String>,
    pub competition: Option<String>,
    #[serde(default)]
    pub sources: Vec<MatchSource>,
    pub image1: Option<String>,
    pub home_image: Option<String>,
    pub team1_image: Option<String>,
    pub image2: Option<String>,
    pub away_image: Option<String>,
    pub team2_image: Option<String>,
    pub poster: Option<String>,
    pub poster_image: Option<String>,
    pub poster_url: Option<String>,
}

/// A stream as returned by `/stream/{source}/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStream {
    pub url: Option<String>,
    pub embed_url: Option<String>,
    pub language: Option<String>,
    pub quality: Option<String>,
    pub hd: Option<bool>,
    pub source: Option<String>,
    pub stream_no: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_match_aliases() {
        let raw: RawMatch = serde_json::from_value(serde_json::json!({
            "id": 42,
            "title": "Arsenal - Chelsea",
            "date": 1_700_000_000_000u64,
            "start_time": "later",
            "is_live": true,
            "category": "football",
            "homeImage": "/h.png",
            "posterUrl": "/p",
            "sources": [{"source": "alpha", "id": "ars-che"}],
            "popular": true
        }))
        .unwrap();

        assert_eq!(raw.id, Some(serde_json::json!(42)));
        assert_eq!(raw.start_time_snake.as_deref(), Some("later"));
        assert_eq!(raw.is_live_snake, Some(true));
        assert_eq!(raw.category.as_deref(), Some("football"));
        assert_eq!(raw.home_image.as_deref(), Some("/h.png"));
        assert_eq!(raw.poster_url.as_deref(), Some("/p"));
        assert_eq!(raw.sources.len(), 1);
    }

    #[test]
    fn test_raw_stream_fields() {
        let raw: RawStream = serde_json::from_value(serde_json::json!({
            "id": "x",
            "streamNo": 2,
            "language": "English",
            "hd": true,
            "embedUrl": "https://embed/x/2",
            "source": "alpha"
        }))
        .unwrap();

        assert_eq!(raw.stream_no, Some(2));
        assert_eq!(raw.hd, Some(true));
        assert_eq!(raw.url, None);
        assert_eq!(raw.embed_url.as_deref(), Some("https://embed/x/2"));
    }
}
