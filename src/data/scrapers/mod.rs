//! Web scrapers for box-score data

pub mod basketball_reference;

pub use basketball_reference::{BasketballReference, ScrapeReport};

use crate::{Result, StatsError};
use reqwest::StatusCode;
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Anything that can hand back the HTML of a page
pub trait PageSource {
    /// Fetch a page body. `Ok(None)` means the page does not exist (HTTP 404).
    fn fetch(&self, url: &str) -> Result<Option<String>>;
}

/// Enforces a fixed minimum interval between network requests
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    last_request: Cell<Option<Instant>>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Throttle {
            delay,
            last_request: Cell::new(None),
        }
    }

    /// Build from a delay in seconds; negative or non-finite values mean no delay
    pub fn from_secs_f64(secs: f64) -> Self {
        let delay = if secs.is_finite() && secs > 0.0 {
            Duration::from_secs_f64(secs)
        } else {
            Duration::ZERO
        };
        Self::new(delay)
    }

    /// Time left before the next request may go out
    pub fn remaining(&self) -> Duration {
        match self.last_request.get() {
            Some(last) => self.delay.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Block until the interval has passed, then mark a request as sent
    pub fn wait(&self) {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
        self.last_request.set(Some(Instant::now()));
    }
}

/// Blocking HTTP page source with an optional on-disk HTML cache
pub struct HttpSource {
    client: reqwest::blocking::Client,
    throttle: Throttle,
    /// Optional cache directory for HTML files
    cache_dir: Option<PathBuf>,
    /// If true, only use cache (no network requests)
    offline_only: bool,
}

impl HttpSource {
    pub fn new(user_agent: &str, timeout: Duration, delay_secs: f64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(HttpSource {
            client,
            throttle: Throttle::from_secs_f64(delay_secs),
            cache_dir: None,
            offline_only: false,
        })
    }

    /// Create source with a cache directory
    pub fn with_cache<P: AsRef<Path>>(mut self, cache_dir: P) -> Self {
        self.cache_dir = Some(cache_dir.as_ref().to_path_buf());
        self
    }

    /// Set offline-only mode (no network requests, cache must exist)
    pub fn offline_only(mut self, offline: bool) -> Self {
        self.offline_only = offline;
        self
    }

    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(cache_file_name(url)))
    }

    /// Marker recording that a URL answered HTTP 404
    fn missing_marker_path(&self, url: &str) -> Option<PathBuf> {
        self.cache_path(url).map(|path| path.with_extension("404"))
    }

    fn load_from_cache(&self, url: &str) -> Option<Cached> {
        if let Some(marker) = self.missing_marker_path(url) {
            if marker.exists() {
                log::debug!("Cached 404: {}", marker.display());
                return Some(Cached::Missing);
            }
        }

        let path = self.cache_path(url)?;
        if !path.exists() {
            return None;
        }
        log::debug!("Loading from cache: {}", path.display());
        match std::fs::read_to_string(&path) {
            Ok(html) => Some(Cached::Page(html)),
            Err(e) => {
                log::warn!("Unreadable cache file {}: {}", path.display(), e);
                None
            }
        }
    }

    fn save_to_cache(&self, url: &str, html: &str) -> Result<()> {
        if let Some(path) = self.cache_path(url) {
            write_cache_file(&path, html)?;
            log::debug!("Saved to cache: {}", path.display());
        }
        Ok(())
    }

    fn save_missing_marker(&self, url: &str) -> Result<()> {
        if let Some(path) = self.missing_marker_path(url) {
            write_cache_file(&path, "")?;
            log::debug!("Saved 404 marker: {}", path.display());
        }
        Ok(())
    }
}

enum Cached {
    Page(String),
    /// The page returned HTTP 404 when it was last fetched
    Missing,
}

fn write_cache_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

impl PageSource for HttpSource {
    fn fetch(&self, url: &str) -> Result<Option<String>> {
        match self.load_from_cache(url) {
            Some(Cached::Page(html)) => return Ok(Some(html)),
            Some(Cached::Missing) => return Ok(None),
            None => {}
        }

        if self.offline_only {
            return Err(StatsError::Scraper {
                url: url.to_string(),
                message: "No cached page (offline mode)".to_string(),
            });
        }

        self.throttle.wait();
        log::info!("Fetching: {}", url);

        let response = self.client.get(url).send()?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            log::debug!("Not found: {}", url);
            if let Err(e) = self.save_missing_marker(url) {
                log::warn!("Failed to cache 404 for {}: {}", url, e);
            }
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StatsError::Scraper {
                url: url.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let html = response.text()?;
        if let Err(e) = self.save_to_cache(url, &html) {
            log::warn!("Failed to cache {}: {}", url, e);
        }
        Ok(Some(html))
    }
}

/// Safe file name for a cached URL
fn cache_file_name(url: &str) -> String {
    url.replace("https://", "")
        .replace("http://", "")
        .replace(['/', '?'], "_")
        + ".html"
}
