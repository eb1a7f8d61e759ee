//! In-memory [`Fetcher`].

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use vendroll_core::Fetcher;

/// Serves fixed bodies per URL and records every request.
#[derive(Default)]
pub struct StaticFetcher {
    routes: HashMap<String, Result<Vec<u8>, String>>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    /// Fetcher with no routes; every request fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`.
    #[must_use]
    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.routes.insert(url.to_string(), Ok(body.into()));
        self
    }

    /// Fail requests for `url` with `reason`.
    #[must_use]
    pub fn failing(mut self, url: &str, reason: &str) -> Self {
        self.routes.insert(url.to_string(), Err(reason.to_string()));
        self
    }

    /// URLs requested so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Fetcher for StaticFetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>, String> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(url.to_string());
        match self.routes.get(url) {
            Some(route) => route.clone(),
            None => Err(format!("404 Not Found: {url}")),
        }
    }
}
