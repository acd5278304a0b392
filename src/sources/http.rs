//! Blocking HTTP page fetcher with retry, backoff and politeness delay

use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};

use super::SourceError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const MAX_ATTEMPTS: u32 = 3;
const MAX_BACKOFF_SECS: u64 = 10;
const JITTER_MAX_MILLIS: u64 = 1500;

/// Markers of bot-check interstitials served with a 200 status
const BLOCK_MARKERS: &[&str] = &["Pardon Our Interruption", "captcha-container", "Access Denied"];

/// Something that can fetch an HTML page by URL
///
/// Adapters depend on this rather than on [`HttpFetcher`] so parsing can be
/// exercised against fixture pages.
pub trait PageFetcher {
    fn get_html(&self, url: &str) -> Result<String, SourceError>;

    /// Waits between requests to the same site
    fn pause(&self) {}
}

/// Network settings shared by all sources
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub user_agent: String,
    pub timeout: Duration,
    pub delay: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            delay: Duration::from_millis(1500),
        }
    }
}

pub struct HttpFetcher {
    client: Client,
    delay: Duration,
}

impl HttpFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            client,
            delay: settings.delay,
        })
    }

    fn try_get(&self, url: &str) -> Result<String, SourceError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = resp.status();
        if status.as_u16() == 403 || status.as_u16() == 429 {
            return Err(SourceError::Blocked(format!("HTTP {} from {}", status.as_u16(), url)));
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp.text().map_err(|e| SourceError::Network(e.to_string()))?;
        if let Some(marker) = BLOCK_MARKERS.iter().find(|m| body.contains(*m)) {
            return Err(SourceError::Blocked(format!("{} ({})", url, marker)));
        }

        Ok(body)
    }
}

impl PageFetcher for HttpFetcher {
    fn get_html(&self, url: &str) -> Result<String, SourceError> {
        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let start = Instant::now();

            match self.try_get(url) {
                Ok(html) => {
                    tracing::debug!(url, attempt, elapsed = ?start.elapsed(), "Fetched page");
                    return Ok(html);
                }
                Err(e) => {
                    tracing::debug!(url, attempt, error = %e, "Fetch attempt failed");
                    let retryable = !matches!(e, SourceError::Status { status, .. } if status == 404 || status == 410);
                    last_err = Some(e);
                    if !retryable || attempt == MAX_ATTEMPTS {
                        break;
                    }

                    let base = std::cmp::min(2 * u64::from(attempt), MAX_BACKOFF_SECS);
                    let jitter = rand::thread_rng().gen_range(0..=JITTER_MAX_MILLIS);
                    std::thread::sleep(Duration::from_secs(base) + Duration::from_millis(jitter));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| SourceError::Network(format!("No attempt made for {url}"))))
    }

    fn pause(&self) {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }
}
