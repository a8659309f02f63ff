//! Rate-limited, retrying HTTP fetcher.
//!
//! Concurrency is bounded process-wide by a semaphore, independent of how
//! many logical queries are in flight. Every attempt sleeps a throttle
//! delay plus jitter, rotates the user agent and optionally routes through
//! a credentialed proxy. Transient failures retry with linearly increasing
//! backoff; once the budget is spent the page is dropped with a `None`.

use std::sync::RwLock;
use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use tokio::sync::Semaphore;
use tokio::time::sleep;

use crate::scraper::PageFetcher;

/// Browser user agents rotated across attempts.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:126.0) Gecko/20100101 Firefox/126.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
];

/// Tunables for the fetcher. Defaults mirror a polite scraping profile.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Target request rate; the per-attempt throttle delay is
    /// `60s / requests_per_minute`.
    pub requests_per_minute: u32,
    /// Process-wide concurrent request bound.
    pub max_concurrent: usize,
    /// Attempts before a page is dropped.
    pub retries: u32,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Upper bound of the random jitter added to each throttle delay.
    pub max_jitter: Duration,
    /// Optional credentialed proxy URL.
    pub proxy: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 1000,
            max_concurrent: 10,
            retries: 10,
            timeout: Duration::from_secs(600),
            max_jitter: Duration::from_secs(5),
            proxy: None,
        }
    }
}

/// HTTP fetcher shared by all (query, page) fetch tasks of a worker.
pub struct Fetcher {
    config: FetcherConfig,
    semaphore: Semaphore,
    // Replaced wholesale when a timeout suggests the session went stale.
    client: RwLock<Client>,
}

impl Fetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, reqwest::Error> {
        let client = build_client(&config)?;
        Ok(Self {
            semaphore: Semaphore::new(config.max_concurrent),
            client: RwLock::new(client),
            config,
        })
    }

    /// Fetch a page with a form-encoded POST body instead of a GET.
    pub async fn fetch_with_payload(&self, url: &str, form: &[(&str, &str)]) -> Option<String> {
        self.fetch_content(url, Some(form)).await
    }

    async fn fetch_content(&self, url: &str, form: Option<&[(&str, &str)]>) -> Option<String> {
        for attempt in 0..self.config.retries {
            let Ok(_permit) = self.semaphore.acquire().await else {
                return None;
            };

            sleep(self.throttle_delay()).await;

            let client = match self.client.read() {
                Ok(client) => client.clone(),
                Err(_) => return None,
            };
            let request = match form {
                Some(form) => client.post(url).form(form),
                None => client.get(url),
            };
            let result = request
                .header(USER_AGENT, pick_user_agent())
                .send()
                .await
                .and_then(|response| response.error_for_status());

            let err = match result {
                Ok(response) => match response.text().await {
                    Ok(body) => return Some(body),
                    Err(err) => err,
                },
                Err(err) => err,
            };

            // A timeout usually means the session itself went bad; start
            // the next attempt on a fresh client.
            if err.is_timeout() {
                self.replace_client();
            }
            log::debug!("attempt {} failed for {url}: {err}", attempt + 1);

            // No backoff after the last attempt; the page is dropped anyway.
            if attempt + 1 < self.config.retries {
                sleep(Duration::from_secs(u64::from(attempt))).await;
            }
        }

        log::warn!(
            "dropping page after {} attempts: {url}",
            self.config.retries
        );
        None
    }

    /// Throttle delay before each attempt: base rate pacing plus jitter so
    /// concurrent tasks do not fire in synchronized bursts.
    fn throttle_delay(&self) -> Duration {
        let base = 60.0 / f64::from(self.config.requests_per_minute.max(1));
        let max_jitter = self.config.max_jitter.as_secs_f64();
        let jitter = if max_jitter > 0.0 {
            rand::thread_rng().gen_range(0.0..max_jitter)
        } else {
            0.0
        };
        Duration::from_secs_f64(base + jitter)
    }

    fn replace_client(&self) {
        match build_client(&self.config) {
            Ok(client) => {
                if let Ok(mut slot) = self.client.write() {
                    *slot = client;
                }
            }
            Err(err) => log::error!("failed to rebuild HTTP client: {err}"),
        }
    }
}

impl PageFetcher for Fetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        self.fetch_content(url, None).await
    }
}

fn build_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .timeout(config.timeout)
        .cookie_store(true)
        .danger_accept_invalid_certs(true);
    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }
    builder.build()
}

fn pick_user_agent() -> &'static str {
    let index = rand::thread_rng().gen_range(0..USER_AGENTS.len());
    USER_AGENTS[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_polite_profile() {
        let config = FetcherConfig::default();
        assert_eq!(config.max_concurrent, 10);
        assert_eq!(config.retries, 10);
        assert_eq!(config.timeout, Duration::from_secs(600));
    }

    #[test]
    fn throttle_delay_includes_rate_pacing() {
        let fetcher = Fetcher::new(FetcherConfig {
            requests_per_minute: 60,
            ..FetcherConfig::default()
        })
        .unwrap();

        // 60 rpm -> 1s base, plus up to 5s jitter.
        let delay = fetcher.throttle_delay();
        assert!(delay >= Duration::from_secs(1));
        assert!(delay < Duration::from_secs(6));
    }

    #[test]
    fn zero_jitter_leaves_only_the_base_delay() {
        let fetcher = Fetcher::new(FetcherConfig {
            requests_per_minute: 60,
            max_jitter: Duration::ZERO,
            ..FetcherConfig::default()
        })
        .unwrap();

        assert_eq!(fetcher.throttle_delay(), Duration::from_secs(1));
    }

    #[test]
    fn user_agent_pool_only_serves_known_agents() {
        for _ in 0..32 {
            assert!(USER_AGENTS.contains(&pick_user_agent()));
        }
    }

    #[tokio::test]
    async fn exhausted_retries_drop_the_page() {
        // Bind then drop, so the port refuses connections.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let fetcher = Fetcher::new(FetcherConfig {
            requests_per_minute: 60_000,
            retries: 2,
            max_jitter: Duration::ZERO,
            ..FetcherConfig::default()
        })
        .unwrap();

        let body = fetcher.fetch(&format!("http://127.0.0.1:{port}/")).await;

        assert!(body.is_none());
    }
}
