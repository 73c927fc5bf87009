// src/fetch.rs

//! Dual-channel fetch orchestration.
//!
//! The primary channel is the structured query endpoint; it gets the full
//! retry budget with linear backoff. Only when every primary attempt has
//! failed is the secondary channel (a full listing-page scrape) tried, and
//! then exactly once. Attempts are strictly sequential.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::extract::{ApiExtractor, ContentExtractor, PageExtractor};
use crate::models::{Config, Item};

/// One retrieval channel: fetch raw content and extract the latest item.
#[async_trait]
pub trait SourceChannel: Send + Sync {
    /// Channel name for logging.
    fn name(&self) -> &str;

    async fn retrieve(&self) -> Result<Item>;
}

/// Primary channel: structured query endpoint.
pub struct ApiChannel {
    client: Client,
    url: String,
    extractor: ApiExtractor,
}

impl ApiChannel {
    pub fn new(client: Client, url: String, extractor: ApiExtractor) -> Self {
        Self {
            client,
            url,
            extractor,
        }
    }
}

#[async_trait]
impl SourceChannel for ApiChannel {
    fn name(&self) -> &str {
        "api"
    }

    async fn retrieve(&self) -> Result<Item> {
        let raw = fetch_text(&self.client, &self.url)
            .await
            .map_err(|e| AppError::fetch(self.name(), e))?;
        self.extractor.extract(&raw)
    }
}

/// Secondary channel: full listing-page retrieval.
pub struct PageChannel {
    client: Client,
    url: String,
    extractor: PageExtractor,
}

impl PageChannel {
    pub fn new(client: Client, url: String, extractor: PageExtractor) -> Self {
        Self {
            client,
            url,
            extractor,
        }
    }
}

#[async_trait]
impl SourceChannel for PageChannel {
    fn name(&self) -> &str {
        "page"
    }

    async fn retrieve(&self) -> Result<Item> {
        let raw = fetch_text(&self.client, &self.url)
            .await
            .map_err(|e| AppError::fetch(self.name(), e))?;
        self.extractor.extract(&raw)
    }
}

/// Fetch a URL's body, treating HTTP error statuses as failures.
async fn fetch_text(client: &Client, url: &str) -> std::result::Result<String, reqwest::Error> {
    client.get(url).send().await?.error_for_status()?.text().await
}

/// Seam for the poll loop: produce the latest item or nothing.
#[async_trait]
pub trait FetchLatest: Send + Sync {
    async fn fetch_latest(&self) -> Option<Item>;
}

/// Drives the channels with bounded retries and fallback promotion.
pub struct FetchOrchestrator {
    primary: Box<dyn SourceChannel>,
    secondary: Box<dyn SourceChannel>,
    max_retries: u32,
    retry_delay: Duration,
}

impl FetchOrchestrator {
    pub fn new(
        primary: Box<dyn SourceChannel>,
        secondary: Box<dyn SourceChannel>,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            primary,
            secondary,
            max_retries,
            retry_delay,
        }
    }

    /// Build the orchestrator and both channels from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = create_client(config)?;

        let page_extractor =
            PageExtractor::new(&config.source.selectors, &config.source.base_url)?;
        let api_extractor = ApiExtractor::new(
            config.source.api_fields.clone(),
            PageExtractor::new(&config.source.selectors, &config.source.base_url)?,
        );

        let primary = Box::new(ApiChannel::new(
            client.clone(),
            config.source.api_url.clone(),
            api_extractor,
        ));
        let secondary = Box::new(PageChannel::new(
            client,
            config.source.page_url.clone(),
            page_extractor,
        ));

        Ok(Self::new(
            primary,
            secondary,
            config.fetch.max_retries,
            Duration::from_millis(config.fetch.retry_delay_ms),
        ))
    }
}

#[async_trait]
impl FetchLatest for FetchOrchestrator {
    async fn fetch_latest(&self) -> Option<Item> {
        let total = self.max_retries + 1;

        for attempt in 1..=total {
            match self.primary.retrieve().await {
                Ok(item) => return Some(item),
                Err(e) => {
                    log::warn!(
                        "{} channel attempt {}/{} failed: {}",
                        self.primary.name(),
                        attempt,
                        total,
                        e
                    );
                    // Linear backoff, tuned against the source's rate
                    // limiting. No delay after the final attempt.
                    if attempt < total {
                        tokio::time::sleep(self.retry_delay * attempt).await;
                    }
                }
            }
        }

        log::warn!(
            "{} channel exhausted after {} attempts, trying {} channel",
            self.primary.name(),
            total,
            self.secondary.name()
        );

        match self.secondary.retrieve().await {
            Ok(item) => Some(item),
            Err(e) => {
                log::warn!("{} channel failed: {}", self.secondary.name(), e);
                None
            }
        }
    }
}

/// Create a configured HTTP client. Every request it issues is bounded by
/// the per-call timeout; expiry counts as an ordinary fetch failure.
///
/// Also used for the notification dispatcher, so a hung mail API cannot
/// stall a cycle past the timeout either.
pub fn create_client(config: &Config) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.source.user_agent)
        .timeout(Duration::from_secs(config.fetch.timeout_secs))
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StubChannel {
        name: &'static str,
        calls: AtomicU32,
        results: Mutex<Vec<Result<Item>>>,
    }

    impl StubChannel {
        /// Results are popped front-to-back; when empty, retrieval fails.
        fn new(name: &'static str, results: Vec<Result<Item>>) -> Self {
            Self {
                name,
                calls: AtomicU32::new(0),
                results: Mutex::new(results),
            }
        }

        fn failing(name: &'static str) -> Self {
            Self::new(name, Vec::new())
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SourceChannel for &StubChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn retrieve(&self) -> Result<Item> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut results = self.results.lock().unwrap();
            if results.is_empty() {
                Err(AppError::fetch(self.name, "stub failure"))
            } else {
                results.remove(0)
            }
        }
    }

    fn item(title: &str) -> Item {
        Item::new(title, "https://example.org/pubs/1", "1 May 2025").unwrap()
    }

    fn orchestrator(
        primary: &'static StubChannel,
        secondary: &'static StubChannel,
    ) -> FetchOrchestrator {
        FetchOrchestrator::new(Box::new(primary), Box::new(secondary), 2, Duration::ZERO)
    }

    #[tokio::test]
    async fn primary_success_skips_secondary() {
        let primary = Box::leak(Box::new(StubChannel::new("api", vec![Ok(item("fresh"))])));
        let secondary = Box::leak(Box::new(StubChannel::failing("page")));

        let found = orchestrator(primary, secondary).fetch_latest().await;

        assert_eq!(found.unwrap().title, "fresh");
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn exhausted_primary_tries_secondary_exactly_once() {
        let primary = Box::leak(Box::new(StubChannel::failing("api")));
        let secondary = Box::leak(Box::new(StubChannel::failing("page")));

        let found = orchestrator(primary, secondary).fetch_latest().await;

        assert!(found.is_none());
        // max_retries = 2 means three primary attempts in total.
        assert_eq!(primary.calls(), 3);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn secondary_success_masks_primary_failure() {
        let primary = Box::leak(Box::new(StubChannel::failing("api")));
        let secondary = Box::leak(Box::new(StubChannel::new(
            "page",
            vec![Ok(item("from-page"))],
        )));

        let found = orchestrator(primary, secondary).fetch_latest().await;

        assert_eq!(found.unwrap().title, "from-page");
    }

    #[tokio::test]
    async fn channel_failures_carry_channel_context() {
        use crate::models::{ApiFields, PageSelectors};

        // A malformed URL fails at request building, before any network I/O.
        let page = PageExtractor::new(&PageSelectors::default(), "https://example.org").unwrap();
        let channel = ApiChannel::new(
            Client::new(),
            "not a url".to_string(),
            ApiExtractor::new(ApiFields::default(), page),
        );

        let err = channel.retrieve().await.unwrap_err();
        assert!(matches!(err, AppError::Fetch { ref context, .. } if context == "api"));
    }

    #[tokio::test]
    async fn primary_recovers_within_retry_budget() {
        let primary = Box::leak(Box::new(StubChannel::new(
            "api",
            vec![
                Err(AppError::fetch("api", "transient")),
                Ok(item("second-try")),
            ],
        )));
        let secondary = Box::leak(Box::new(StubChannel::failing("page")));

        let found = orchestrator(primary, secondary).fetch_latest().await;

        assert_eq!(found.unwrap().title, "second-try");
        assert_eq!(primary.calls(), 2);
        assert_eq!(secondary.calls(), 0);
    }
}
