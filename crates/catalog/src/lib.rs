//! Match catalog client.
//!
//! Fetches sports, matches and stream lists from a catalog API and turns the
//! loosely typed payloads into [`stream_failover`] records. [`CatalogClient`]
//! implements [`stream_failover::CandidateResolver`], so it can back a
//! session directly.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;

pub use client::CatalogClient;
pub use config::{CatalogConfig, DEFAULT_BASE_URL};
pub use error::{CatalogError, Result};
pub use models::{RawMatch, RawStream, Sport};
pub use normalize::{
    generate_match_id, normalize_match, normalize_match_at, normalize_stream,
    parse_teams_from_title,
};
