//! Fetching the published CSV, with a short-lived in-memory cache.

use log::{debug, info};

use std::collections::HashMap;
use std::fs;
use std::time::{Duration, Instant};

use crate::dashboard::*;

/// How long a fetched copy stays valid. Matches the refresh cadence of the
/// published sheet; --refresh bypasses it.
pub const CACHE_TTL: Duration = Duration::from_secs(300);

struct CacheEntry {
    fetched_at: Instant,
    body: String,
}

/// A time-bounded cache of fetched sources, keyed by their address.
///
/// The dashboard recomputes on every interaction; the cache keeps those
/// recomputations from hammering the sheet host.
pub struct SheetCache {
    ttl: Duration,
    client: reqwest::blocking::Client,
    entries: HashMap<String, CacheEntry>,
}

impl SheetCache {
    pub fn new() -> SheetCache {
        SheetCache::with_ttl(CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> SheetCache {
        SheetCache {
            ttl,
            client: reqwest::blocking::Client::new(),
            entries: HashMap::new(),
        }
    }

    /// Drops the cached copy of one source, forcing the next fetch to hit
    /// the network again.
    pub fn invalidate(&mut self, source: &str) {
        if self.entries.remove(source).is_some() {
            info!("invalidate: dropped cached copy of {}", source);
        }
    }

    /// Returns the body of the source, from cache when a fresh enough copy
    /// is held.
    pub fn fetch(&mut self, source: &str) -> DashResult<String> {
        if let Some(entry) = self.entries.get(source) {
            if entry.fetched_at.elapsed() < self.ttl {
                debug!("fetch: cache hit for {}", source);
                return Ok(entry.body.clone());
            }
        }
        let body = self.fetch_uncached(source)?;
        self.entries.insert(
            source.to_string(),
            CacheEntry {
                fetched_at: Instant::now(),
                body: body.clone(),
            },
        );
        Ok(body)
    }

    fn fetch_uncached(&self, source: &str) -> DashResult<String> {
        if source.starts_with("http://") || source.starts_with("https://") {
            debug!("fetch_uncached: requesting {}", source);
            let response = match self.client.get(source).send() {
                Ok(r) => r,
                Err(e) => {
                    return SourceUnavailableSnafu {
                        url: source,
                        message: e.to_string(),
                    }
                    .fail()
                }
            };
            if !response.status().is_success() {
                return SourceUnavailableSnafu {
                    url: source,
                    message: format!("HTTP error: {}", response.status()),
                }
                .fail();
            }
            match response.text() {
                Ok(t) => Ok(t),
                Err(e) => SourceUnavailableSnafu {
                    url: source,
                    message: e.to_string(),
                }
                .fail(),
            }
        } else {
            debug!("fetch_uncached: reading local file {}", source);
            match fs::read_to_string(source) {
                Ok(t) => Ok(t),
                Err(e) => SourceUnavailableSnafu {
                    url: source,
                    message: e.to_string(),
                }
                .fail(),
            }
        }
    }
}

impl Default for SheetCache {
    fn default() -> Self {
        SheetCache::new()
    }
}
