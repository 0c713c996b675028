pub mod error;
pub mod types;

pub use error::{FirecrawlError, Result};
pub use types::{FetchOptions, ScrapedPage};

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use types::{ScrapeRequest, ScrapeResponse};

const BASE_URL: &str = "https://api.firecrawl.dev/v1";

/// Consecutive failures per host before the breaker trips.
const CIRCUIT_THRESHOLD: u32 = 2;
/// How long a tripped breaker stays open, in seconds.
const CIRCUIT_COOLDOWN_SECS: i64 = 10 * 60;

#[derive(Debug, Default)]
struct HostState {
    consecutive_failures: u32,
    open_until: Option<DateTime<Utc>>,
}

pub struct FirecrawlClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    hosts: Mutex<HashMap<String, HostState>>,
}

impl FirecrawlClient {
    pub fn new(api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.to_string(),
            base_url: BASE_URL.to_string(),
            hosts: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Fetch a page. Tries the cheap path first; escalates to stealth only
    /// after the cheap path fails. Per-host circuit breaker: after
    /// `CIRCUIT_THRESHOLD` consecutive failures the host is skipped until
    /// cooldown elapses.
    pub async fn fetch(&self, url: &str, opts: &FetchOptions) -> Result<ScrapedPage> {
        let host = host_of(url)?;
        self.check_circuit(&host).await?;

        let result = if opts.stealth {
            self.scrape(url, opts, true).await
        } else {
            match self.scrape(url, opts, false).await {
                Ok(page) => Ok(page),
                Err(e) => {
                    warn!(url, error = %e, "Cheap scrape failed, escalating to stealth");
                    self.scrape(url, opts, true).await
                }
            }
        };

        match &result {
            Ok(_) => self.record_success(&host).await,
            Err(_) => self.record_failure(&host).await,
        }

        result
    }

    async fn scrape(&self, url: &str, opts: &FetchOptions, stealth: bool) -> Result<ScrapedPage> {
        let request = ScrapeRequest {
            url: url.to_string(),
            formats: vec!["markdown".to_string(), "html".to_string()],
            only_main_content: opts.main_content_only,
            wait_for: opts.wait_ms,
            proxy: stealth.then(|| "stealth".to_string()),
        };

        let path = if stealth { "stealth" } else { "basic" };
        info!(url, path, "Scraping page");

        let resp = self
            .client
            .post(format!("{}/scrape", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FirecrawlError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ScrapeResponse = resp.json().await?;
        if !parsed.success {
            return Err(FirecrawlError::Api {
                status: 200,
                message: parsed.error.unwrap_or_else(|| "scrape failed".to_string()),
            });
        }

        let data = parsed.data.ok_or(FirecrawlError::EmptyContent {
            url: url.to_string(),
        })?;

        let content_text = data.markdown.unwrap_or_default();
        let content_html = data.html.unwrap_or_default();
        if content_text.is_empty() && content_html.is_empty() {
            return Err(FirecrawlError::EmptyContent {
                url: url.to_string(),
            });
        }

        let (page_status, title, og_site_name) = match data.metadata {
            Some(m) => (m.status_code.unwrap_or(200), m.title, m.og_site_name),
            None => (200, None, None),
        };

        info!(url, path, bytes = content_text.len(), "Scraped successfully");

        Ok(ScrapedPage {
            url: url.to_string(),
            content_html,
            content_text,
            status: page_status,
            title,
            og_site_name,
        })
    }

    async fn check_circuit(&self, host: &str) -> Result<()> {
        let mut hosts = self.hosts.lock().await;
        if let Some(state) = hosts.get_mut(host) {
            if let Some(until) = state.open_until {
                if Utc::now() < until {
                    return Err(FirecrawlError::CircuitOpen {
                        host: host.to_string(),
                        until,
                    });
                }
                // Cooldown elapsed - half-open: allow one attempt through.
                state.open_until = None;
                state.consecutive_failures = 0;
            }
        }
        Ok(())
    }

    async fn record_failure(&self, host: &str) {
        let mut hosts = self.hosts.lock().await;
        let state = hosts.entry(host.to_string()).or_default();
        state.consecutive_failures += 1;
        if state.consecutive_failures >= CIRCUIT_THRESHOLD {
            let until = Utc::now() + chrono::Duration::seconds(CIRCUIT_COOLDOWN_SECS);
            state.open_until = Some(until);
            warn!(host, until = %until, "Circuit breaker tripped");
        }
    }

    async fn record_success(&self, host: &str) {
        let mut hosts = self.hosts.lock().await;
        if let Some(state) = hosts.get_mut(host) {
            state.consecutive_failures = 0;
            state.open_until = None;
        }
    }
}

fn host_of(raw: &str) -> Result<String> {
    let parsed = url::Url::parse(raw).map_err(|_| FirecrawlError::InvalidUrl(raw.to_string()))?;
    parsed
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or_else(|| FirecrawlError::InvalidUrl(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_extraction() {
        assert_eq!(
            host_of("https://www.psychologytoday.com/us/therapists/dc").unwrap(),
            "www.psychologytoday.com"
        );
        assert!(host_of("not a url").is_err());
    }

    #[tokio::test]
    async fn circuit_trips_after_threshold_failures() {
        let client = FirecrawlClient::new("test-key");
        client.record_failure("example.com").await;
        assert!(client.check_circuit("example.com").await.is_ok());
        client.record_failure("example.com").await;
        let err = client.check_circuit("example.com").await.unwrap_err();
        assert!(matches!(err, FirecrawlError::CircuitOpen { .. }));
    }

    #[tokio::test]
    async fn success_resets_circuit() {
        let client = FirecrawlClient::new("test-key");
        client.record_failure("example.com").await;
        client.record_success("example.com").await;
        client.record_failure("example.com").await;
        // Only one consecutive failure after the reset - still closed.
        assert!(client.check_circuit("example.com").await.is_ok());
    }
}
