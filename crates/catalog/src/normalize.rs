//! Conversion of catalog payloads into core records.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde_json::Value;
use stream_failover::{Match, Stream};
use tracing::warn;

use crate::models::{RawMatch, RawStream};

/// Separators tried in order when splitting a title into teams.
pub const TITLE_SEPARATORS: [&str; 5] = [" - ", " vs ", " VS ", " v ", " V "];

/// A match counts as live for this many hours after its start.
const LIVE_WINDOW_HOURS: i64 = 3;

/// Stable id of a match.
///
/// Uses the upstream id when present. Otherwise hashes the descriptive
/// fields so the same match maps to the same id on every fetch.
pub fn generate_match_id(raw: &RawMatch) -> String {
    if let Some(id) = raw.id.as_ref().and_then(id_string) {
        return id;
    }

    let mut parts: Vec<&str> = [
        raw.sport.as_deref(),
        raw.league.as_deref(),
        raw.team1.as_deref(),
        raw.team2.as_deref(),
        raw.start_time.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect();

    if let Some(first) = raw.sources.first() {
        parts.push(&first.id);
    }

    hash_base36(&sanitize_id(&parts.join("-")))
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// Lowercase, then replace everything outside `[a-z0-9-]` with `-`.
///
/// Characters outside the basic multilingual plane become two dashes so the
/// hash matches ids generated from UTF-16 strings.
fn sanitize_id(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            out.push(c);
        } else {
            for _ in 0..c.len_utf16() {
                out.push('-');
            }
        }
    }
    out
}

/// 32-bit rolling string hash (`h * 31 + c`), absolute value in base 36.
fn hash_base36(input: &str) -> String {
    let mut hash: i32 = 0;
    for unit in input.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    to_base36(i64::from(hash).unsigned_abs())
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}

/// Split `"Team1 - Team2"` style titles. Without a separator the whole title
/// is the first team.
pub fn parse_teams_from_title(title: &str) -> (String, String) {
    for separator in TITLE_SEPARATORS {
        if title.contains(separator) {
            let mut parts = title.split(separator);
            let team1 = parts.next().unwrap_or_default().trim().to_string();
            let team2 = parts.next().unwrap_or_default().trim().to_string();
            return (team1, team2);
        }
    }
    (title.to_string(), String::new())
}

/// Normalize a catalog match relative to the current time.
pub fn normalize_match(raw: RawMatch) -> Match {
    normalize_match_at(raw, Utc::now())
}

/// Normalize a catalog match relative to `now`.
pub fn normalize_match_at(raw: RawMatch, now: DateTime<Utc>) -> Match {
    let id = generate_match_id(&raw);

    let (team1, team2) = match non_empty(&raw.title) {
        Some(title) => parse_teams_from_title(title),
        None => (
            non_empty(&raw.team1).unwrap_or_default().to_string(),
            non_empty(&raw.team2).unwrap_or_default().to_string(),
        ),
    };

    let date = raw.date.as_ref().filter(|d| is_truthy(d));
    let epoch = date.and_then(epoch_millis);

    let start_time = match date {
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => epoch.map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => first_non_empty([&raw.start_time, &raw.start_time_snake, &raw.time])
            .map(str::to_string),
    };

    let is_live = match (date, epoch) {
        (Some(Value::Number(_)), Some(started)) => {
            let elapsed = now.signed_duration_since(started);
            elapsed >= TimeDelta::zero() && elapsed <= TimeDelta::hours(LIVE_WINDOW_HOURS)
        }
        (Some(Value::Number(_)), None) => false,
        _ => raw
            .is_live
            .unwrap_or_else(|| raw.is_live_snake.unwrap_or(false) || raw.live.unwrap_or(false)),
    };

    Match {
        id,
        sport: first_non_empty([&raw.sport, &raw.category])
            .unwrap_or_default()
            .to_string(),
        league: first_non_empty([&raw.league, &raw.tournament, &raw.competition])
            .unwrap_or_default()
            .to_string(),
        team1,
        team2,
        start_time,
        is_live,
        image1: first_non_empty([&raw.image1, &raw.home_image, &raw.team1_image])
            .map(str::to_string),
        image2: first_non_empty([&raw.image2, &raw.away_image, &raw.team2_image])
            .map(str::to_string),
        poster: first_non_empty([&raw.poster, &raw.poster_image, &raw.poster_url])
            .map(str::to_string),
        sources: raw.sources,
    }
}

/// Normalize every element of a match list; malformed entries are skipped.
pub fn normalize_matches(values: Vec<Value>) -> Vec<Match> {
    let now = Utc::now();
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<RawMatch>(value) {
            Ok(raw) => Some(normalize_match_at(raw, now)),
            Err(e) => {
                warn!(error = %e, "Skipping malformed match entry");
                None
            }
        })
        .collect()
}

/// Normalize a catalog stream, defaulting its source to `requested_source`.
pub fn normalize_stream(raw: RawStream, requested_source: &str) -> Stream {
    let url = first_non_empty([&raw.url, &raw.embed_url]).unwrap_or_default();
    let embed_url = first_non_empty([&raw.embed_url, &raw.url]);
    let quality = if raw.hd.unwrap_or(false) {
        "HD"
    } else {
        non_empty(&raw.quality).unwrap_or("SD")
    };
    let source = non_empty(&raw.source).unwrap_or(requested_source);

    let mut stream = Stream::new(url)
        .with_quality(quality)
        .with_source(source);
    if let Some(embed_url) = embed_url {
        stream = stream.with_embed_url(embed_url);
    }
    if let Some(language) = non_empty(&raw.language) {
        stream = stream.with_language(language);
    }
    stream
}

/// Normalize a stream response, which is either a list or a single object.
pub fn normalize_streams(value: Value, requested_source: &str) -> Vec<Stream> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(_) => vec![value],
        _ => return Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<RawStream>(item) {
            Ok(raw) => Some(normalize_stream(raw, requested_source)),
            Err(e) => {
                warn!(source = requested_source, error = %e, "Skipping malformed stream entry");
                None
            }
        })
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn first_non_empty<const N: usize>(candidates: [&Option<String>; N]) -> Option<&str> {
    candidates.into_iter().find_map(non_empty)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn epoch_millis(value: &Value) -> Option<DateTime<Utc>> {
    let millis = value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))?;
    DateTime::from_timestamp_millis(millis)
}
