//! Crate-wide error types.

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by collaborators and configuration.
///
/// None of these escape the session manager: resolution failures degrade
/// to an empty candidate list and probe failures drive the health state
/// machine instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to resolve streams for {source_name}/{id}: {reason}")]
    Resolution {
        source_name: String,
        id: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    pub fn resolution(
        source_name: impl Into<String>,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Resolution {
            source_name: source_name.into(),
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Why a reachability probe did not complete.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("empty probe url")]
    EmptyUrl,

    #[error("invalid probe url `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("probe timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("probe request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("probe failed: {0}")]
    Other(String),
}

impl ProbeError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
