pub mod error;
pub mod types;

pub use error::{Result, SerperError};
pub use types::{SearchHit, SearchOptions};

use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use types::{SearchRequest, SearchResponse};

const BASE_URL: &str = "https://google.serper.dev";

/// Max retry attempts on rate-limit / transient 5xx.
const MAX_ATTEMPTS: u32 = 3;
/// Backoff cap. Actual delay is 2^attempt seconds + jitter, capped here.
const BACKOFF_CAP: Duration = Duration::from_secs(30);

pub struct SerperClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SerperClient {
    pub fn new(api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .gzip(true)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.to_string(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Run a Google search. Retries transient failures with exponential
    /// backoff; quota exhaustion is surfaced as a distinct error so callers
    /// can degrade instead of hammering the API.
    pub async fn search(&self, query: &str, opts: &SearchOptions) -> Result<Vec<SearchHit>> {
        let q = match &opts.site {
            Some(site) => format!("site:{site} {query}"),
            None => query.to_string(),
        };

        let request = SearchRequest {
            q: q.clone(),
            num: opts.num,
            location: opts.location.clone(),
            gl: None,
        };

        for attempt in 0..MAX_ATTEMPTS {
            let resp = self
                .client
                .post(format!("{}/search", self.base_url))
                .header("X-API-KEY", &self.api_key)
                .json(&request)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.as_u16() == 403 {
                        let body = response.text().await.unwrap_or_default();
                        if body.contains("credits") || body.contains("quota") {
                            warn!(query = %q, "Serper quota exhausted");
                            return Err(SerperError::QuotaExhausted);
                        }
                        return Err(SerperError::Api {
                            status: 403,
                            message: body,
                        });
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        if attempt + 1 < MAX_ATTEMPTS {
                            let delay = backoff_delay(attempt);
                            warn!(
                                query = %q,
                                status = status.as_u16(),
                                attempt = attempt + 1,
                                delay_ms = delay.as_millis() as u64,
                                "Serper transient failure, backing off"
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        if status.as_u16() == 429 {
                            return Err(SerperError::RateLimited {
                                attempts: MAX_ATTEMPTS,
                            });
                        }
                        let body = response.text().await.unwrap_or_default();
                        return Err(SerperError::Api {
                            status: status.as_u16(),
                            message: body,
                        });
                    }

                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(SerperError::Api {
                            status: status.as_u16(),
                            message: body,
                        });
                    }

                    let parsed: SearchResponse = response.json().await?;
                    let hits: Vec<SearchHit> =
                        parsed.organic.into_iter().map(SearchHit::from).collect();
                    info!(query = %q, count = hits.len(), "Serper search complete");
                    return Ok(hits);
                }
                Err(e) => {
                    if attempt + 1 < MAX_ATTEMPTS {
                        let delay = backoff_delay(attempt);
                        warn!(query = %q, error = %e, attempt = attempt + 1, "Serper request failed, backing off");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(SerperError::RateLimited {
            attempts: MAX_ATTEMPTS,
        })
    }
}

/// 2^attempt seconds + up to 1s jitter, capped at BACKOFF_CAP.
fn backoff_delay(attempt: u32) -> Duration {
    let base = Duration::from_secs(2u64.pow(attempt));
    let jitter = Duration::from_millis(rand::rng().random_range(0..1000));
    std::cmp::min(base + jitter, BACKOFF_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_exponential_and_capped() {
        assert!(backoff_delay(0) >= Duration::from_secs(1));
        assert!(backoff_delay(0) < Duration::from_secs(2) + Duration::from_secs(1));
        assert!(backoff_delay(2) >= Duration::from_secs(4));
        assert!(backoff_delay(10) <= BACKOFF_CAP);
    }

    #[test]
    fn transient_classification() {
        assert!(SerperError::Network("reset".into()).is_transient());
        assert!(SerperError::Api {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(!SerperError::QuotaExhausted.is_transient());
        assert!(!SerperError::Api {
            status: 400,
            message: String::new()
        }
        .is_transient());
    }
}
