//! Shared `reqwest` client construction.

use std::{sync::OnceLock, time::Duration};

use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Install the process-wide rustls crypto provider once.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Safe to ignore: can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Client builder with the defaults used for probes and catalog requests.
///
/// A zero `timeout` leaves the request timeout unset.
pub fn client_builder(user_agent: &str, timeout: Duration) -> reqwest::ClientBuilder {
    install_rustls_provider();

    let mut builder = reqwest::Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(30));

    if timeout > Duration::ZERO {
        builder = builder.timeout(timeout);
    }

    builder
}
