//! Production [`Fetcher`] over HTTPS.

use std::{io::Read, time::Duration};

use vendroll_core::Fetcher;

const USER_AGENT: &str = concat!("vendroll/", env!("CARGO_PKG_VERSION"));

/// Blocking HTTP client with a fixed timeout.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    /// Client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { agent: ureq::AgentBuilder::new().timeout(timeout).build() }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl Fetcher for HttpFetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>, String> {
        tracing::debug!(url, "GET");
        let resp = self
            .agent
            .get(url)
            .set("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| e.to_string())?;

        let mut body = Vec::new();
        resp.into_reader()
            .read_to_end(&mut body)
            .map_err(|e| format!("failed to read response body: {e}"))?;
        tracing::debug!(url, bytes = body.len(), "fetched");
        Ok(body)
    }
}
