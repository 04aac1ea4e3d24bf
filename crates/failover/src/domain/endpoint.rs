//! Endpoint identity.
//!
//! Health is tracked per endpoint, so two `Stream` records must map to the
//! same key exactly when they point at the same target. The key is derived
//! from the stable content of the stream (source label and url) rather than
//! from its position in a candidate list, so reordering or filtering a list
//! never moves health history from one endpoint to another.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::Stream;

/// Bytes of the SHA-256 digest kept in the key.
const DIGEST_PREFIX_LEN: usize = 8;

/// Stable key of a candidate endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(String);

impl EndpointId {
    /// Content-derived identity: `"{source}-{hash(source, url)}"`.
    pub fn for_stream(stream: &Stream) -> Self {
        let source = stream.source_label();
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update(b"\n");
        hasher.update(stream.playable_url().as_bytes());
        let digest = hasher.finalize();
        Self(format!(
            "{}-{}",
            source,
            hex::encode(&digest[..DIGEST_PREFIX_LEN])
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Stream> for EndpointId {
    fn from(stream: &Stream) -> Self {
        Self::for_stream(stream)
    }
}

impl From<String> for EndpointId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for EndpointId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for EndpointId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
