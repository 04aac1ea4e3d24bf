//! Reachability probes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::trace;
use url::Url;

use crate::error::ProbeError;
use crate::http::{DEFAULT_USER_AGENT, client_builder};

/// Performs a lightweight reachability check against an endpoint url.
///
/// Implementations only report whether the attempt completed; the response
/// content is never interpreted. Timeouts are enforced by the caller.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn check(&self, url: &str) -> Result<(), ProbeError>;
}

/// `HEAD` request prober. Any HTTP response, whatever its status, counts as
/// reachable; only transport errors fail the probe.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    /// Create a prober whose client gives up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = client_builder(DEFAULT_USER_AGENT, timeout).build()?;
        Ok(Self { client })
    }

    /// Create a prober sharing an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn check(&self, url: &str) -> Result<(), ProbeError> {
        if url.is_empty() {
            return Err(ProbeError::EmptyUrl);
        }
        let parsed = Url::parse(url).map_err(|e| ProbeError::invalid_url(url, e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProbeError::invalid_url(url, "unsupported scheme"));
        }

        let response = self.client.request(Method::HEAD, parsed).send().await?;
        trace!(url = %url, status = %response.status(), "Probe response");
        Ok(())
    }
}
